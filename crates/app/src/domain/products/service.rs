//! Products service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use storefront::{
    categories::{CategoryTree, CategoryUuid},
    pricing::PricedProduct,
    products::{Product, ProductUuid},
};
use tracing::{Span, info};

use crate::{
    domain::{
        categories::repository::CategoriesRepository,
        pricing::PricingSnapshot,
        products::{
            data::{NewProduct, ProductUpdate},
            errors::ProductsServiceError,
            records::ProductRecord,
            repository::ProductsRepository,
        },
    },
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone)]
pub struct StoreProductsService<S> {
    store: S,
    currency: &'static Currency,
}

impl<S: Store> StoreProductsService<S> {
    #[must_use]
    pub fn new(store: S, currency: &'static Currency) -> Self {
        Self { store, currency }
    }
}

fn check_prices(record: &ProductRecord) -> Result<(), ProductsServiceError> {
    if record.price < Decimal::ZERO {
        return Err(ProductsServiceError::InvalidInput(
            "price cannot be negative".to_string(),
        ));
    }

    if record.discount_price.is_some_and(|price| price < Decimal::ZERO) {
        return Err(ProductsServiceError::InvalidInput(
            "discount price cannot be negative".to_string(),
        ));
    }

    Ok(())
}

#[async_trait]
impl<S: Store> ProductsService for StoreProductsService<S> {
    #[tracing::instrument(
        name = "products.service.get_product",
        skip(self),
        fields(product_uuid = %product),
        err
    )]
    async fn get_product(&self, product: ProductUuid) -> Result<Product<'static>, ProductsServiceError> {
        let mut tx = self.store.begin().await?;

        let record = tx.get_product(product).await?;

        tx.commit().await?;

        Ok(record.into_product(self.currency))
    }

    #[tracing::instrument(
        name = "products.service.create_product",
        skip(self, product),
        fields(product_uuid = %product.uuid),
        err
    )]
    async fn create_product(&self, product: NewProduct) -> Result<Product<'static>, ProductsServiceError> {
        let record = ProductRecord::from(product);

        check_prices(&record)?;

        let mut tx = self.store.begin().await?;

        tx.create_product(&record).await?;

        tx.commit().await?;

        info!(product_uuid = %record.uuid, is_archived = record.is_archived, "created product");

        Ok(record.into_product(self.currency))
    }

    #[tracing::instrument(
        name = "products.service.update_product",
        skip(self, update),
        fields(product_uuid = %product, is_archived = tracing::field::Empty),
        err
    )]
    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product<'static>, ProductsServiceError> {
        let mut tx = self.store.begin().await?;

        let current = tx.get_product(product).await?;

        let record = update.apply(current);

        check_prices(&record)?;

        if tx.update_product(&record).await? == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        Span::current().record("is_archived", record.is_archived);

        info!(product_uuid = %record.uuid, "updated product");

        Ok(record.into_product(self.currency))
    }

    #[tracing::instrument(
        name = "products.service.list_in_category",
        skip(self),
        fields(category_uuid = %category, product_count = tracing::field::Empty),
        err
    )]
    async fn list_in_category(
        &self,
        category: CategoryUuid,
        point_in_time: Timestamp,
    ) -> Result<Vec<PricedProduct<'static>>, ProductsServiceError> {
        let mut tx = self.store.begin().await?;

        let tree = CategoryTree::from_categories(tx.list_categories().await?);

        let subtree: Vec<CategoryUuid> = tree.subtree_ids(category)?.into_iter().collect();

        let products: Vec<Product<'static>> = tx
            .list_products_in_categories(&subtree)
            .await?
            .into_iter()
            .map(|record| record.into_product(self.currency))
            .collect();

        let snapshot = PricingSnapshot::with_tree(&mut tx, tree, &products, point_in_time).await?;

        tx.commit().await?;

        Span::current().record("product_count", products.len());

        let resolver = snapshot.resolver();

        let priced = products
            .iter()
            .map(|product| resolver.resolve(product))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(priced)
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// One product.
    async fn get_product(&self, product: ProductUuid) -> Result<Product<'static>, ProductsServiceError>;

    /// Create a product; zero stock archives it.
    async fn create_product(&self, product: NewProduct) -> Result<Product<'static>, ProductsServiceError>;

    /// Update a product, re-deriving archival from its stock.
    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product<'static>, ProductsServiceError>;

    /// Published products anywhere under `category`, priced at `point_in_time`.
    async fn list_in_category(
        &self,
        category: CategoryUuid,
        point_in_time: Timestamp,
    ) -> Result<Vec<PricedProduct<'static>>, ProductsServiceError>;
}
