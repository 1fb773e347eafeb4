//! Discounts Repository

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{Connection, FromRow, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};
use storefront::{
    categories::CategoryUuid,
    discounts::{
        Discount, DiscountKind, DiscountTarget, DiscountTargetUuid, DiscountUuid,
        NewDiscountTarget, TargetScope, TargetUpdate, TargetedDiscount,
    },
    products::ProductUuid,
};
use uuid::Uuid;

use crate::{database::PgTransaction, store::StoreError};

const GET_DISCOUNT_SQL: &str = include_str!("sql/get_discount.sql");
const LIST_DISCOUNTS_SQL: &str = include_str!("sql/list_discounts.sql");
const COUNT_DISCOUNTS_SQL: &str = include_str!("sql/count_discounts.sql");
const CREATE_DISCOUNT_SQL: &str = include_str!("sql/create_discount.sql");
const UPDATE_DISCOUNT_SQL: &str = include_str!("sql/update_discount.sql");
const ARCHIVE_DISCOUNT_SQL: &str = include_str!("sql/archive_discount.sql");
const LIST_TARGETS_SQL: &str = include_str!("sql/list_targets.sql");
const CREATE_TARGET_SQL: &str = include_str!("sql/create_target.sql");
const UPDATE_TARGET_SQL: &str = include_str!("sql/update_target.sql");
const DELETE_TARGET_SQL: &str = include_str!("sql/delete_target.sql");
const ACTIVE_FOR_PRODUCTS_SQL: &str = include_str!("sql/active_for_products.sql");
const ACTIVE_FOR_CATEGORIES_SQL: &str = include_str!("sql/active_for_categories.sql");

/// Discount and discount target persistence.
#[async_trait]
pub trait DiscountsRepository: Send {
    /// One discount, archived or not.
    async fn get_discount(&mut self, discount: DiscountUuid) -> Result<Discount, StoreError>;

    /// A page of discounts ordered by amount descending, then id. With
    /// `active_at` set only discounts active at that instant are listed.
    async fn list_discounts(
        &mut self,
        take: u32,
        skip: u32,
        active_at: Option<Timestamp>,
    ) -> Result<Vec<Discount>, StoreError>;

    /// Number of discounts matching the same filter as
    /// [`DiscountsRepository::list_discounts`].
    async fn count_discounts(&mut self, active_at: Option<Timestamp>) -> Result<u64, StoreError>;

    /// Insert a discount.
    async fn create_discount(&mut self, discount: &Discount) -> Result<(), StoreError>;

    /// Overwrite a discount, returning the number of rows changed.
    async fn update_discount(&mut self, discount: &Discount) -> Result<u64, StoreError>;

    /// Soft-delete a discount, returning the number of rows changed.
    async fn archive_discount(&mut self, discount: DiscountUuid) -> Result<u64, StoreError>;

    /// Targets of one discount, in creation order.
    async fn list_targets(&mut self, discount: DiscountUuid) -> Result<Vec<DiscountTarget>, StoreError>;

    /// Insert a target. A failure leaves the rest of the transaction usable.
    async fn create_target(
        &mut self,
        discount: DiscountUuid,
        target: &NewDiscountTarget,
    ) -> Result<(), StoreError>;

    /// Rewrite a target. A failure leaves the rest of the transaction usable.
    async fn update_target(&mut self, target: &TargetUpdate) -> Result<u64, StoreError>;

    /// Delete a target. A failure leaves the rest of the transaction usable.
    async fn delete_target(&mut self, target: DiscountTargetUuid) -> Result<u64, StoreError>;

    /// Active product targets joined with their discounts, by priority.
    async fn active_for_products(
        &mut self,
        products: &[ProductUuid],
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, StoreError>;

    /// Active category targets joined with their discounts, by priority.
    async fn active_for_categories(
        &mut self,
        categories: &[CategoryUuid],
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, StoreError>;
}

fn decode_kind(row: &PgRow) -> sqlx::Result<DiscountKind> {
    row.try_get::<String, _>("kind")?
        .parse()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: Box::new(e),
        })
}

fn decode_discount(
    row: &PgRow,
    uuid_column: &str,
    priority_column: &str,
) -> sqlx::Result<Discount> {
    Ok(Discount {
        uuid: DiscountUuid::from_uuid(row.try_get(uuid_column)?),
        name: row.try_get("name")?,
        kind: decode_kind(row)?,
        amount: row.try_get("amount")?,
        started_at: row.try_get::<SqlxTimestamp, _>("started_at")?.to_jiff(),
        expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
        is_archived: row.try_get("is_archived")?,
        priority: row.try_get(priority_column)?,
    })
}

fn decode_target(row: &PgRow, uuid_column: &str) -> sqlx::Result<DiscountTarget> {
    let product = row.try_get::<Option<Uuid>, _>("product_uuid")?;
    let category = row.try_get::<Option<Uuid>, _>("category_uuid")?;

    let scope = match (product, category) {
        (Some(product), None) => TargetScope::Product(ProductUuid::from_uuid(product)),
        (None, Some(category)) => TargetScope::Category(CategoryUuid::from_uuid(category)),
        _ => {
            return Err(sqlx::Error::ColumnDecode {
                index: "product_uuid".to_string(),
                source: "target must reference exactly one product or category".into(),
            });
        }
    };

    Ok(DiscountTarget {
        uuid: DiscountTargetUuid::from_uuid(row.try_get(uuid_column)?),
        discount: DiscountUuid::from_uuid(row.try_get("discount_uuid")?),
        scope,
        priority: row.try_get("priority")?,
    })
}

struct DiscountRow(Discount);

impl<'r> FromRow<'r, PgRow> for DiscountRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        decode_discount(row, "uuid", "priority").map(Self)
    }
}

struct TargetRow(DiscountTarget);

impl<'r> FromRow<'r, PgRow> for TargetRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        decode_target(row, "uuid").map(Self)
    }
}

struct TargetedRow(TargetedDiscount);

impl<'r> FromRow<'r, PgRow> for TargetedRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(TargetedDiscount {
            target: decode_target(row, "target_uuid")?,
            discount: decode_discount(row, "discount_uuid", "discount_priority")?,
        }))
    }
}

fn scope_columns(scope: TargetScope) -> (&'static str, Option<Uuid>, Option<Uuid>) {
    (
        scope.kind_str(),
        scope.product().map(ProductUuid::into_uuid),
        scope.category().map(CategoryUuid::into_uuid),
    )
}

#[async_trait]
impl DiscountsRepository for PgTransaction {
    async fn get_discount(&mut self, discount: DiscountUuid) -> Result<Discount, StoreError> {
        let DiscountRow(discount) = query_as::<Postgres, DiscountRow>(GET_DISCOUNT_SQL)
            .bind(discount.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(discount)
    }

    async fn list_discounts(
        &mut self,
        take: u32,
        skip: u32,
        active_at: Option<Timestamp>,
    ) -> Result<Vec<Discount>, StoreError> {
        let rows = query_as::<Postgres, DiscountRow>(LIST_DISCOUNTS_SQL)
            .bind(active_at.map(SqlxTimestamp::from))
            .bind(i64::from(take))
            .bind(i64::from(skip))
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|DiscountRow(discount)| discount).collect())
    }

    async fn count_discounts(&mut self, active_at: Option<Timestamp>) -> Result<u64, StoreError> {
        let count: i64 = query_scalar(COUNT_DISCOUNTS_SQL)
            .bind(active_at.map(SqlxTimestamp::from))
            .fetch_one(&mut *self.tx)
            .await?;

        u64::try_from(count).map_err(|_| StoreError::InvalidData)
    }

    async fn create_discount(&mut self, discount: &Discount) -> Result<(), StoreError> {
        query(CREATE_DISCOUNT_SQL)
            .bind(discount.uuid.into_uuid())
            .bind(&discount.name)
            .bind(discount.kind.as_str())
            .bind(discount.amount)
            .bind(SqlxTimestamp::from(discount.started_at))
            .bind(SqlxTimestamp::from(discount.expires_at))
            .bind(discount.is_archived)
            .bind(discount.priority)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_discount(&mut self, discount: &Discount) -> Result<u64, StoreError> {
        let rows_affected = query(UPDATE_DISCOUNT_SQL)
            .bind(discount.uuid.into_uuid())
            .bind(&discount.name)
            .bind(discount.kind.as_str())
            .bind(discount.amount)
            .bind(SqlxTimestamp::from(discount.started_at))
            .bind(SqlxTimestamp::from(discount.expires_at))
            .bind(discount.is_archived)
            .bind(discount.priority)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn archive_discount(&mut self, discount: DiscountUuid) -> Result<u64, StoreError> {
        let rows_affected = query(ARCHIVE_DISCOUNT_SQL)
            .bind(discount.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn list_targets(&mut self, discount: DiscountUuid) -> Result<Vec<DiscountTarget>, StoreError> {
        let rows = query_as::<Postgres, TargetRow>(LIST_TARGETS_SQL)
            .bind(discount.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|TargetRow(target)| target).collect())
    }

    async fn create_target(
        &mut self,
        discount: DiscountUuid,
        target: &NewDiscountTarget,
    ) -> Result<(), StoreError> {
        let (kind, product, category) = scope_columns(target.scope);

        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        query(CREATE_TARGET_SQL)
            .bind(target.uuid.into_uuid())
            .bind(discount.into_uuid())
            .bind(kind)
            .bind(product)
            .bind(category)
            .bind(target.priority)
            .execute(&mut *savepoint)
            .await?;

        savepoint.commit().await?;

        Ok(())
    }

    async fn update_target(&mut self, target: &TargetUpdate) -> Result<u64, StoreError> {
        let (kind, product, category) = scope_columns(target.scope);

        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        let rows_affected = query(UPDATE_TARGET_SQL)
            .bind(target.uuid.into_uuid())
            .bind(kind)
            .bind(product)
            .bind(category)
            .bind(target.priority)
            .execute(&mut *savepoint)
            .await?
            .rows_affected();

        savepoint.commit().await?;

        Ok(rows_affected)
    }

    async fn delete_target(&mut self, target: DiscountTargetUuid) -> Result<u64, StoreError> {
        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        let rows_affected = query(DELETE_TARGET_SQL)
            .bind(target.into_uuid())
            .execute(&mut *savepoint)
            .await?
            .rows_affected();

        savepoint.commit().await?;

        Ok(rows_affected)
    }

    async fn active_for_products(
        &mut self,
        products: &[ProductUuid],
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, StoreError> {
        let uuids: Vec<Uuid> = products.iter().copied().map(ProductUuid::into_uuid).collect();

        let rows = query_as::<Postgres, TargetedRow>(ACTIVE_FOR_PRODUCTS_SQL)
            .bind(uuids)
            .bind(SqlxTimestamp::from(point_in_time))
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|TargetedRow(targeted)| targeted).collect())
    }

    async fn active_for_categories(
        &mut self,
        categories: &[CategoryUuid],
        point_in_time: Timestamp,
    ) -> Result<Vec<TargetedDiscount>, StoreError> {
        let uuids: Vec<Uuid> = categories
            .iter()
            .copied()
            .map(CategoryUuid::into_uuid)
            .collect();

        let rows = query_as::<Postgres, TargetedRow>(ACTIVE_FOR_CATEGORIES_SQL)
            .bind(uuids)
            .bind(SqlxTimestamp::from(point_in_time))
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|TargetedRow(targeted)| targeted).collect())
    }
}
