//! Categories Repository

use async_trait::async_trait;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as};
use storefront::categories::{Category, CategoryUuid};

use crate::{database::PgTransaction, store::StoreError};

const LIST_CATEGORIES_SQL: &str = include_str!("sql/list_categories.sql");
const GET_CATEGORY_SQL: &str = include_str!("sql/get_category.sql");
const CREATE_CATEGORY_SQL: &str = include_str!("sql/create_category.sql");
const UPDATE_CATEGORY_SQL: &str = include_str!("sql/update_category.sql");
const DELETE_CATEGORY_SQL: &str = include_str!("sql/delete_category.sql");

/// Category persistence.
#[async_trait]
pub trait CategoriesRepository: Send {
    /// Every category, in insertion order.
    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError>;

    /// One category.
    async fn get_category(&mut self, category: CategoryUuid) -> Result<Category, StoreError>;

    /// Insert a category.
    async fn create_category(&mut self, category: &Category) -> Result<(), StoreError>;

    /// Overwrite a category, returning the number of rows changed.
    async fn update_category(&mut self, category: &Category) -> Result<u64, StoreError>;

    /// Delete a category, returning the number of rows removed.
    async fn delete_category(&mut self, category: CategoryUuid) -> Result<u64, StoreError>;
}

struct CategoryRow(Category);

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(Category {
            uuid: CategoryUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            parent: row
                .try_get::<Option<uuid::Uuid>, _>("parent_uuid")?
                .map(CategoryUuid::from_uuid),
            sort_order: row.try_get("sort_order")?,
        }))
    }
}

#[async_trait]
impl CategoriesRepository for PgTransaction {
    async fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let rows = query_as::<Postgres, CategoryRow>(LIST_CATEGORIES_SQL)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|CategoryRow(category)| category).collect())
    }

    async fn get_category(&mut self, category: CategoryUuid) -> Result<Category, StoreError> {
        let CategoryRow(category) = query_as::<Postgres, CategoryRow>(GET_CATEGORY_SQL)
            .bind(category.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(category)
    }

    async fn create_category(&mut self, category: &Category) -> Result<(), StoreError> {
        query(CREATE_CATEGORY_SQL)
            .bind(category.uuid.into_uuid())
            .bind(&category.name)
            .bind(category.parent.map(CategoryUuid::into_uuid))
            .bind(category.sort_order)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_category(&mut self, category: &Category) -> Result<u64, StoreError> {
        let rows_affected = query(UPDATE_CATEGORY_SQL)
            .bind(category.uuid.into_uuid())
            .bind(&category.name)
            .bind(category.parent.map(CategoryUuid::into_uuid))
            .bind(category.sort_order)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn delete_category(&mut self, category: CategoryUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_CATEGORY_SQL)
            .bind(category.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
