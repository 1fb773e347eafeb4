//! Carts Repository

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, Postgres, Row, postgres::PgRow, query, query_as};
use storefront::{
    carts::{Cart, CartItem, CartItemUuid, CartUuid, GuestToken, UserUuid},
    products::ProductUuid,
};
use uuid::Uuid;

use crate::{
    database::PgTransaction,
    domain::{carts::records::CartLineRecord, products::repository::ProductRow},
    store::StoreError,
};

const FIND_USER_CART_SQL: &str = include_str!("sql/find_user_cart.sql");
const FIND_GUEST_CART_SQL: &str = include_str!("sql/find_guest_cart.sql");
const CREATE_CART_SQL: &str = include_str!("sql/create_cart.sql");
const ADOPT_CART_SQL: &str = include_str!("sql/adopt_cart.sql");
const DELETE_CART_SQL: &str = include_str!("sql/delete_cart.sql");
const SET_CART_TOTAL_SQL: &str = include_str!("sql/set_cart_total.sql");
const LIST_CART_ITEMS_SQL: &str = include_str!("sql/list_cart_items.sql");
const LIST_CART_LINES_SQL: &str = include_str!("sql/list_cart_lines.sql");
const ADD_CART_ITEM_SQL: &str = include_str!("sql/add_cart_item.sql");
const SET_CART_ITEM_COUNT_SQL: &str = include_str!("sql/set_cart_item_count.sql");
const DELETE_CART_ITEM_SQL: &str = include_str!("sql/delete_cart_item.sql");
const CLEAR_CART_ITEMS_SQL: &str = include_str!("sql/clear_cart_items.sql");

/// Cart and cart line persistence.
///
/// Cart lookups lock the row for the rest of the transaction. A guest cart
/// that another transaction adopted or merged while this one waited for the
/// lock is not returned.
#[async_trait]
pub trait CartsRepository: Send {
    /// The cart owned by `user`.
    async fn find_user_cart(&mut self, user: UserUuid) -> Result<Option<Cart>, StoreError>;

    /// The cart created under `token` that no user owns yet.
    async fn find_guest_cart(&mut self, token: GuestToken) -> Result<Option<Cart>, StoreError>;

    /// Insert a cart. Fails with [`StoreError::AlreadyExists`] when the user
    /// already owns a cart or the token already has an unowned one; the rest
    /// of the transaction stays usable.
    async fn create_cart(&mut self, cart: &Cart) -> Result<(), StoreError>;

    /// Give an unowned cart to `user`; a cart that already has an owner is
    /// left alone and `0` is returned. Fails with
    /// [`StoreError::AlreadyExists`] when the user already owns a cart; the
    /// rest of the transaction stays usable.
    async fn adopt_cart(&mut self, cart: CartUuid, user: UserUuid) -> Result<u64, StoreError>;

    /// Delete a cart and its lines.
    async fn delete_cart(&mut self, cart: CartUuid) -> Result<u64, StoreError>;

    /// Persist a recomputed total.
    async fn set_cart_total(&mut self, cart: CartUuid, total: Decimal) -> Result<u64, StoreError>;

    /// Lines of a cart, newest first.
    async fn list_cart_items(&mut self, cart: CartUuid) -> Result<Vec<CartItem>, StoreError>;

    /// Lines of a cart joined with their products, newest first.
    async fn list_cart_lines(&mut self, cart: CartUuid) -> Result<Vec<CartLineRecord>, StoreError>;

    /// Insert a line, or add `item.count` to the existing line for the same
    /// product. Returns the stored line.
    async fn add_cart_item(&mut self, item: &CartItem) -> Result<CartItem, StoreError>;

    /// Overwrite a line's count.
    async fn set_cart_item_count(&mut self, item: CartItemUuid, count: u32) -> Result<u64, StoreError>;

    /// Delete one line of `cart`.
    async fn delete_cart_item(&mut self, cart: CartUuid, item: CartItemUuid) -> Result<u64, StoreError>;

    /// Delete every line of `cart`.
    async fn clear_cart_items(&mut self, cart: CartUuid) -> Result<u64, StoreError>;
}

fn decode_count(row: &PgRow, column: &str) -> sqlx::Result<u32> {
    u32::try_from(row.try_get::<i64, _>(column)?).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

struct CartRow(Cart);

impl<'r> FromRow<'r, PgRow> for CartRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(Cart {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user: row
                .try_get::<Option<Uuid>, _>("user_uuid")?
                .map(UserUuid::from_uuid),
            token: row
                .try_get::<Option<Uuid>, _>("token")?
                .map(GuestToken::from_uuid),
            total: row.try_get("total")?,
        }))
    }
}

struct CartItemRow(CartItem);

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(CartItem {
            uuid: CartItemUuid::from_uuid(row.try_get("uuid")?),
            cart: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            product: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            count: decode_count(row, "count")?,
        }))
    }
}

struct CartLineRow(CartLineRecord);

impl<'r> FromRow<'r, PgRow> for CartLineRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let ProductRow(product) = ProductRow::from_row(row)?;

        Ok(Self(CartLineRecord {
            item: CartItem {
                uuid: CartItemUuid::from_uuid(row.try_get("item_uuid")?),
                cart: CartUuid::from_uuid(row.try_get("cart_uuid")?),
                product: product.uuid,
                count: decode_count(row, "item_count")?,
            },
            product,
        }))
    }
}

#[async_trait]
impl CartsRepository for PgTransaction {
    async fn find_user_cart(&mut self, user: UserUuid) -> Result<Option<Cart>, StoreError> {
        let row = query_as::<Postgres, CartRow>(FIND_USER_CART_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|CartRow(cart)| cart))
    }

    async fn find_guest_cart(&mut self, token: GuestToken) -> Result<Option<Cart>, StoreError> {
        let row = query_as::<Postgres, CartRow>(FIND_GUEST_CART_SQL)
            .bind(token.into_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|CartRow(cart)| cart))
    }

    async fn create_cart(&mut self, cart: &Cart) -> Result<(), StoreError> {
        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        query(CREATE_CART_SQL)
            .bind(cart.uuid.into_uuid())
            .bind(cart.user.map(UserUuid::into_uuid))
            .bind(cart.token.map(GuestToken::into_uuid))
            .bind(cart.total)
            .execute(&mut *savepoint)
            .await?;

        savepoint.commit().await?;

        Ok(())
    }

    async fn adopt_cart(&mut self, cart: CartUuid, user: UserUuid) -> Result<u64, StoreError> {
        let mut savepoint = Connection::begin(&mut *self.tx).await?;

        let rows_affected = query(ADOPT_CART_SQL)
            .bind(cart.into_uuid())
            .bind(user.into_uuid())
            .execute(&mut *savepoint)
            .await?
            .rows_affected();

        savepoint.commit().await?;

        Ok(rows_affected)
    }

    async fn delete_cart(&mut self, cart: CartUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_CART_SQL)
            .bind(cart.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn set_cart_total(&mut self, cart: CartUuid, total: Decimal) -> Result<u64, StoreError> {
        let rows_affected = query(SET_CART_TOTAL_SQL)
            .bind(cart.into_uuid())
            .bind(total)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn list_cart_items(&mut self, cart: CartUuid) -> Result<Vec<CartItem>, StoreError> {
        let rows = query_as::<Postgres, CartItemRow>(LIST_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|CartItemRow(item)| item).collect())
    }

    async fn list_cart_lines(&mut self, cart: CartUuid) -> Result<Vec<CartLineRecord>, StoreError> {
        let rows = query_as::<Postgres, CartLineRow>(LIST_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows.into_iter().map(|CartLineRow(line)| line).collect())
    }

    async fn add_cart_item(&mut self, item: &CartItem) -> Result<CartItem, StoreError> {
        let CartItemRow(item) = query_as::<Postgres, CartItemRow>(ADD_CART_ITEM_SQL)
            .bind(item.uuid.into_uuid())
            .bind(item.cart.into_uuid())
            .bind(item.product.into_uuid())
            .bind(i64::from(item.count))
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(item)
    }

    async fn set_cart_item_count(&mut self, item: CartItemUuid, count: u32) -> Result<u64, StoreError> {
        let rows_affected = query(SET_CART_ITEM_COUNT_SQL)
            .bind(item.into_uuid())
            .bind(i64::from(count))
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn delete_cart_item(&mut self, cart: CartUuid, item: CartItemUuid) -> Result<u64, StoreError> {
        let rows_affected = query(DELETE_CART_ITEM_SQL)
            .bind(cart.into_uuid())
            .bind(item.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    async fn clear_cart_items(&mut self, cart: CartUuid) -> Result<u64, StoreError> {
        let rows_affected = query(CLEAR_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}
