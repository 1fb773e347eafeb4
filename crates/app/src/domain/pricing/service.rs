//! Pricing service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rusty_money::iso::Currency;
use storefront::{pricing::PricedProduct, products::ProductUuid};
use tracing::Span;

use crate::{
    domain::{
        pricing::{PricingServiceError, PricingSnapshot},
        products::repository::ProductsRepository,
    },
    store::{Store, StoreTransaction},
};

#[derive(Debug, Clone)]
pub struct StorePricingService<S> {
    store: S,
    currency: &'static Currency,
}

impl<S: Store> StorePricingService<S> {
    #[must_use]
    pub fn new(store: S, currency: &'static Currency) -> Self {
        Self { store, currency }
    }
}

#[async_trait]
impl<S: Store> PricingService for StorePricingService<S> {
    #[tracing::instrument(
        name = "pricing.service.resolve",
        skip(self),
        fields(
            product_uuid = %product,
            discount_uuid = tracing::field::Empty,
            candidate_count = tracing::field::Empty
        ),
        err
    )]
    async fn resolve(
        &self,
        product: ProductUuid,
        point_in_time: Timestamp,
    ) -> Result<PricedProduct<'static>, PricingServiceError> {
        let mut tx = self.store.begin().await?;

        let product = tx.get_product(product).await?.into_product(self.currency);

        let snapshot = PricingSnapshot::load(&mut tx, std::slice::from_ref(&product), point_in_time).await?;

        tx.commit().await?;

        let resolver = snapshot.resolver();

        Span::current().record("candidate_count", resolver.candidates(&product).len());

        let priced = resolver.resolve(&product)?;

        if let Some(applied) = &priced.applied {
            Span::current().record("discount_uuid", tracing::field::display(applied.discount));
        }

        Ok(priced)
    }

    #[tracing::instrument(
        name = "pricing.service.resolve_many",
        skip(self, products),
        fields(product_count = products.len()),
        err
    )]
    async fn resolve_many(
        &self,
        products: Vec<ProductUuid>,
        point_in_time: Timestamp,
    ) -> Result<Vec<PricedProduct<'static>>, PricingServiceError> {
        let mut tx = self.store.begin().await?;

        let records = tx.list_products(&products).await?;

        let resolved = products
            .iter()
            .map(|uuid| {
                records
                    .iter()
                    .find(|record| record.uuid == *uuid)
                    .cloned()
                    .map(|record| record.into_product(self.currency))
                    .ok_or(PricingServiceError::NotFound)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let snapshot = PricingSnapshot::load(&mut tx, &resolved, point_in_time).await?;

        tx.commit().await?;

        let resolver = snapshot.resolver();

        let priced = resolved
            .iter()
            .map(|product| resolver.resolve(product))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(priced)
    }
}

#[automock]
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Effective price of one product at `point_in_time`.
    async fn resolve(
        &self,
        product: ProductUuid,
        point_in_time: Timestamp,
    ) -> Result<PricedProduct<'static>, PricingServiceError>;

    /// Effective prices of several products, in the order requested.
    async fn resolve_many(
        &self,
        products: Vec<ProductUuid>,
        point_in_time: Timestamp,
    ) -> Result<Vec<PricedProduct<'static>>, PricingServiceError>;
}
