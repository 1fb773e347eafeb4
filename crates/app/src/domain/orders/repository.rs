//! Orders Repository

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rustc_hash::FxHashMap;
use sqlx::{FromRow, Postgres, Row, postgres::PgRow, query, query_as};
use storefront::{
    carts::UserUuid,
    discounts::DiscountUuid,
    orders::{CustomerDetails, Order, OrderItemUuid, OrderLine, OrderStatus, OrderUuid},
    products::ProductUuid,
};
use uuid::Uuid;

use crate::{database::PgTransaction, store::StoreError};

const CREATE_ORDER_SQL: &str = include_str!("sql/create_order.sql");
const CREATE_ORDER_ITEM_SQL: &str = include_str!("sql/create_order_item.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const LIST_ORDER_ITEMS_SQL: &str = include_str!("sql/list_order_items.sql");

/// Order persistence.
#[async_trait]
pub trait OrdersRepository: Send {
    /// Insert an order with its lines.
    async fn create_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// One order with its lines.
    async fn get_order(&mut self, order: OrderUuid) -> Result<Order, StoreError>;

    /// A page of a user's orders, newest first.
    async fn list_orders(
        &mut self,
        user: UserUuid,
        take: u32,
        skip: u32,
    ) -> Result<Vec<Order>, StoreError>;
}

struct OrderRow(Order);

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let status = row
            .try_get::<String, _>("status")?
            .parse::<OrderStatus>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self(Order {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            user: row
                .try_get::<Option<Uuid>, _>("user_uuid")?
                .map(UserUuid::from_uuid),
            customer: CustomerDetails {
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                middle_name: row.try_get("middle_name")?,
                email: row.try_get("email")?,
                phone: row.try_get("phone")?,
                address: row.try_get("address")?,
                comment: row.try_get("comment")?,
            },
            total: row.try_get("total")?,
            status,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            items: Vec::new(),
        }))
    }
}

struct OrderItemRow(OrderUuid, OrderLine);

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let count = u32::try_from(row.try_get::<i64, _>("count")?).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "count".to_string(),
                source: Box::new(e),
            }
        })?;

        Ok(Self(
            OrderUuid::from_uuid(row.try_get("order_uuid")?),
            OrderLine {
                uuid: OrderItemUuid::from_uuid(row.try_get("uuid")?),
                product: ProductUuid::from_uuid(row.try_get("product_uuid")?),
                count,
                unit_price: row.try_get("unit_price")?,
                discount: row
                    .try_get::<Option<Uuid>, _>("discount_uuid")?
                    .map(DiscountUuid::from_uuid),
            },
        ))
    }
}

impl PgTransaction {
    async fn attach_items(&mut self, orders: &mut [Order]) -> Result<(), StoreError> {
        let uuids: Vec<Uuid> = orders.iter().map(|order| order.uuid.into_uuid()).collect();

        let rows = query_as::<Postgres, OrderItemRow>(LIST_ORDER_ITEMS_SQL)
            .bind(uuids)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut by_order: FxHashMap<OrderUuid, Vec<OrderLine>> = FxHashMap::default();

        for OrderItemRow(order, line) in rows {
            by_order.entry(order).or_default().push(line);
        }

        for order in orders {
            order.items = by_order.remove(&order.uuid).unwrap_or_default();
        }

        Ok(())
    }
}

#[async_trait]
impl OrdersRepository for PgTransaction {
    async fn create_order(&mut self, order: &Order) -> Result<(), StoreError> {
        query(CREATE_ORDER_SQL)
            .bind(order.uuid.into_uuid())
            .bind(order.user.map(UserUuid::into_uuid))
            .bind(&order.customer.first_name)
            .bind(&order.customer.last_name)
            .bind(order.customer.middle_name.as_deref())
            .bind(&order.customer.email)
            .bind(&order.customer.phone)
            .bind(order.customer.address.as_deref())
            .bind(order.customer.comment.as_deref())
            .bind(order.total)
            .bind(order.status.as_str())
            .bind(SqlxTimestamp::from(order.created_at))
            .execute(&mut *self.tx)
            .await?;

        for (position, line) in (0_i32..).zip(&order.items) {
            query(CREATE_ORDER_ITEM_SQL)
                .bind(line.uuid.into_uuid())
                .bind(order.uuid.into_uuid())
                .bind(line.product.into_uuid())
                .bind(i64::from(line.count))
                .bind(line.unit_price)
                .bind(line.discount.map(DiscountUuid::into_uuid))
                .bind(position)
                .execute(&mut *self.tx)
                .await?;
        }

        Ok(())
    }

    async fn get_order(&mut self, order: OrderUuid) -> Result<Order, StoreError> {
        let OrderRow(order) = query_as::<Postgres, OrderRow>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut *self.tx)
            .await?;

        let mut orders = [order];

        self.attach_items(&mut orders).await?;

        let [order] = orders;

        Ok(order)
    }

    async fn list_orders(
        &mut self,
        user: UserUuid,
        take: u32,
        skip: u32,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = query_as::<Postgres, OrderRow>(LIST_ORDERS_SQL)
            .bind(user.into_uuid())
            .bind(i64::from(take))
            .bind(i64::from(skip))
            .fetch_all(&mut *self.tx)
            .await?;

        let mut orders: Vec<Order> = rows.into_iter().map(|OrderRow(order)| order).collect();

        self.attach_items(&mut orders).await?;

        Ok(orders)
    }
}
