//! Database connection management

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, migrate::MigrateError};

use crate::store::{Store, StoreError, StoreTransaction};

/// The PostgreSQL store.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// An open PostgreSQL transaction; every domain repository is implemented on it.
#[derive(Debug)]
pub struct PgTransaction {
    pub(crate) tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for Db {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await?;

        Ok(PgTransaction { tx })
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;

        Ok(())
    }
}

/// Connect to `PostgreSQL`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Apply pending schema migrations.
///
/// # Errors
///
/// Returns an error when a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use storefront::{
        carts::{Cart, CartItem, CartItemUuid, CartUuid, UserUuid},
        categories::{Category, CategoryUuid},
        products::ProductUuid,
    };
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::repository::CartsRepository, categories::repository::CategoriesRepository,
            products::{records::ProductRecord, repository::ProductsRepository},
        },
        test::db::TestDb,
    };

    use super::*;

    fn category(name: &str) -> Category {
        Category {
            uuid: CategoryUuid::new(),
            name: name.to_string(),
            parent: None,
            sort_order: 0,
        }
    }

    fn product(count: Option<u32>) -> ProductRecord {
        ProductRecord {
            uuid: ProductUuid::new(),
            category: None,
            price: Decimal::new(1999, 2),
            discount_price: Some(Decimal::new(1500, 2)),
            count,
            is_archived: false,
            is_published: true,
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible() -> TestResult {
        let test_db = TestDb::new().await?;
        let db = Db::new(test_db.pool().clone());

        let mut tx = db.begin().await?;
        tx.create_category(&category("Kept")).await?;
        tx.commit().await?;

        let mut tx = db.begin().await?;

        assert_eq!(tx.list_categories().await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() -> TestResult {
        let test_db = TestDb::new().await?;
        let db = Db::new(test_db.pool().clone());

        {
            let mut tx = db.begin().await?;
            tx.create_category(&category("Discarded")).await?;
        }

        let mut tx = db.begin().await?;

        assert!(tx.list_categories().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn referenced_category_cannot_be_deleted() -> TestResult {
        let test_db = TestDb::new().await?;
        let db = Db::new(test_db.pool().clone());

        let parent = category("Parent");
        let child = Category {
            parent: Some(parent.uuid),
            ..category("Child")
        };

        let mut tx = db.begin().await?;
        tx.create_category(&parent).await?;
        tx.create_category(&child).await?;
        tx.commit().await?;

        {
            let mut tx = db.begin().await?;

            assert!(matches!(
                tx.delete_category(parent.uuid).await,
                Err(StoreError::InvalidReference)
            ));
        }

        let mut tx = db.begin().await?;

        assert_eq!(tx.delete_category(child.uuid).await?, 1);
        assert_eq!(tx.delete_category(parent.uuid).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn product_rows_decode_optional_columns() -> TestResult {
        let test_db = TestDb::new().await?;
        let db = Db::new(test_db.pool().clone());

        let limited = product(Some(7));
        let unlimited = ProductRecord {
            discount_price: None,
            ..product(None)
        };

        let mut tx = db.begin().await?;
        tx.create_product(&limited).await?;
        tx.create_product(&unlimited).await?;

        assert_eq!(tx.get_product(limited.uuid).await?, limited);
        assert_eq!(tx.get_product(unlimited.uuid).await?, unlimited);

        Ok(())
    }

    #[tokio::test]
    async fn cart_lines_upsert_and_cascade() -> TestResult {
        let test_db = TestDb::new().await?;
        let db = Db::new(test_db.pool().clone());

        let user = UserUuid::new();
        let stocked = product(Some(3));
        let cart = Cart {
            uuid: CartUuid::new(),
            user: Some(user),
            token: None,
            total: Decimal::ZERO,
        };
        let line = CartItem {
            uuid: CartItemUuid::new(),
            cart: cart.uuid,
            product: stocked.uuid,
            count: 2,
        };

        let mut tx = db.begin().await?;
        tx.create_product(&stocked).await?;
        tx.create_cart(&cart).await?;

        tx.add_cart_item(&line).await?;

        let summed = tx
            .add_cart_item(&CartItem {
                uuid: CartItemUuid::new(),
                count: 5,
                ..line
            })
            .await?;

        assert_eq!(summed.uuid, line.uuid, "the existing line is kept");
        assert_eq!(summed.count, 7);

        let lines = tx.list_cart_lines(cart.uuid).await?;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product, stocked);

        assert_eq!(
            tx.find_user_cart(user).await?.map(|found| found.uuid),
            Some(cart.uuid)
        );

        assert_eq!(tx.delete_cart(cart.uuid).await?, 1);
        assert!(tx.list_cart_items(cart.uuid).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn second_cart_for_user_leaves_transaction_usable() -> TestResult {
        let test_db = TestDb::new().await?;
        let db = Db::new(test_db.pool().clone());

        let user = UserUuid::new();
        let owned = || Cart {
            uuid: CartUuid::new(),
            user: Some(user),
            token: None,
            total: Decimal::ZERO,
        };

        let mut tx = db.begin().await?;
        tx.create_cart(&owned()).await?;

        assert!(matches!(
            tx.create_cart(&owned()).await,
            Err(StoreError::AlreadyExists)
        ));

        assert!(tx.find_user_cart(user).await?.is_some());

        tx.commit().await?;

        Ok(())
    }
}
