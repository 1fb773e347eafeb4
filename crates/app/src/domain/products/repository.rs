//! Products Repository

use async_trait::async_trait;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as};
use storefront::{categories::CategoryUuid, products::ProductUuid};
use uuid::Uuid;

use crate::{
    database::PgTransaction, domain::products::records::ProductRecord, store::StoreError,
};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const LIST_PRODUCTS_IN_CATEGORIES_SQL: &str = include_str!("sql/list_products_in_categories.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");

/// Product persistence.
#[async_trait]
pub trait ProductsRepository: Send {
    /// One product.
    async fn get_product(&mut self, product: ProductUuid) -> Result<ProductRecord, StoreError>;

    /// The listed products that exist, in no particular order.
    async fn list_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError>;

    /// Published products listed under any of the given categories.
    async fn list_products_in_categories(
        &mut self,
        categories: &[CategoryUuid],
    ) -> Result<Vec<ProductRecord>, StoreError>;

    /// Insert a product.
    async fn create_product(&mut self, product: &ProductRecord) -> Result<(), StoreError>;

    /// Overwrite a product, returning the number of rows changed.
    async fn update_product(&mut self, product: &ProductRecord) -> Result<u64, StoreError>;
}

pub(crate) struct ProductRow(pub(crate) ProductRecord);

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let count = row
            .try_get::<Option<i64>, _>("count")?
            .map(|count| {
                u32::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "count".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()?;

        Ok(Self(ProductRecord {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            category: row
                .try_get::<Option<Uuid>, _>("category_uuid")?
                .map(CategoryUuid::from_uuid),
            price: row.try_get("price")?,
            discount_price: row.try_get("discount_price")?,
            count,
            is_archived: row.try_get("is_archived")?,
            is_published: row.try_get("is_published")?,
        }))
    }
}

#[async_trait]
impl ProductsRepository for PgTransaction {
    async fn get_product(&mut self, product: ProductUuid) -> Result<ProductRecord, StoreError> {
        let ProductRow(product) = query_as::<Postgres, ProductRow>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(product)
    }

    async fn list_products(
        &mut self,
        products: &[ProductUuid],
    ) -> Result<Vec<ProductRecord>, StoreError> {
        let uuids: Vec<Uuid> = products.iter().copied().map(ProductUuid::into_uuid).collect();

        let rows = query_as::<Postgres, ProductRow>(LIST_PRODUCTS_SQL)
            .bind(uuids)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|ProductRow(product)| product).collect())
    }

    async fn list_products_in_categories(
        &mut self,
        categories: &[CategoryUuid],
    ) -> Result<Vec<ProductRecord>, StoreError> {
        let uuids: Vec<Uuid> = categories
            .iter()
            .copied()
            .map(CategoryUuid::into_uuid)
            .collect();

        let rows = query_as::<Postgres, ProductRow>(LIST_PRODUCTS_IN_CATEGORIES_SQL)
            .bind(uuids)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|ProductRow(product)| product).collect())
    }

    async fn create_product(&mut self, product: &ProductRecord) -> Result<(), StoreError> {
        query(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(product.category.map(CategoryUuid::into_uuid))
            .bind(product.price)
            .bind(product.discount_price)
            .bind(product.count.map(i64::from))
            .bind(product.is_archived)
            .bind(product.is_published)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_product(&mut self, product: &ProductRecord) -> Result<u64, StoreError> {
        let rows_affected = query(UPDATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(product.category.map(CategoryUuid::into_uuid))
            .bind(product.price)
            .bind(product.discount_price)
            .bind(product.count.map(i64::from))
            .bind(product.is_archived)
            .bind(product.is_published)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
