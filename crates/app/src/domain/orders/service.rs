//! Orders service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::{Timestamp, Unit};
use mockall::automock;
use storefront::{
    carts::{CartIdentity, UserUuid},
    orders::{CustomerDetails, Order, OrderUuid, assemble_order},
};
use tracing::{Span, info, warn};

use crate::{
    domain::{
        carts::CartsService,
        orders::{data::OrderQuery, errors::OrdersServiceError, repository::OrdersRepository},
    },
    store::{Store, StoreTransaction},
};

#[derive(Clone)]
pub struct StoreOrdersService<S> {
    store: S,
    carts: Arc<dyn CartsService>,
}

impl<S: Store> StoreOrdersService<S> {
    #[must_use]
    pub fn new(store: S, carts: Arc<dyn CartsService>) -> Self {
        Self { store, carts }
    }
}

#[async_trait]
impl<S: Store> OrdersService for StoreOrdersService<S> {
    #[tracing::instrument(
        name = "orders.service.place_order",
        skip(self, identity, customer),
        fields(order_uuid = tracing::field::Empty, line_count = tracing::field::Empty),
        err
    )]
    async fn place_order(
        &self,
        identity: CartIdentity,
        customer: CustomerDetails,
        point_in_time: Timestamp,
    ) -> Result<Order, OrdersServiceError> {
        let view = self.carts.get_all(identity, point_in_time).await?;

        // Orders keep their timestamp at the store's microsecond precision.
        let created_at = point_in_time
            .round(Unit::Microsecond)
            .map_err(|e| OrdersServiceError::InvalidInput(e.to_string()))?;

        let order = assemble_order(&view, identity.user, customer, created_at)?;

        let ordered = view
            .available
            .iter()
            .map(|line| (line.item.uuid, line.item.count))
            .collect();

        Span::current().record("order_uuid", tracing::field::display(order.uuid));
        Span::current().record("line_count", order.items.len());

        let mut tx = self.store.begin().await?;

        tx.create_order(&order).await?;

        tx.commit().await?;

        info!(order_uuid = %order.uuid, total = %order.total, "placed order");

        if let Err(error) = self
            .carts
            .remove_ordered(identity, ordered, point_in_time)
            .await
        {
            warn!(order_uuid = %order.uuid, %error, "failed to remove ordered lines from cart");
        }

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.get_order",
        skip(self),
        fields(order_uuid = %order),
        err
    )]
    async fn get_order(&self, order: OrderUuid) -> Result<Order, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let order = tx.get_order(order).await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.list_orders",
        skip(self),
        fields(user_uuid = %user, order_count = tracing::field::Empty),
        err
    )]
    async fn list_orders(
        &self,
        user: UserUuid,
        query: OrderQuery,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.store.begin().await?;

        let orders = tx.list_orders(user, query.take, query.skip).await?;

        tx.commit().await?;

        Span::current().record("order_count", orders.len());

        Ok(orders)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Turn the identity's available cart lines into an order and take the
    /// ordered quantities off the cart.
    async fn place_order(
        &self,
        identity: CartIdentity,
        customer: CustomerDetails,
        point_in_time: Timestamp,
    ) -> Result<Order, OrdersServiceError>;

    /// One order with its lines.
    async fn get_order(&self, order: OrderUuid) -> Result<Order, OrdersServiceError>;

    /// A page of the user's orders, newest first.
    async fn list_orders(
        &self,
        user: UserUuid,
        query: OrderQuery,
    ) -> Result<Vec<Order>, OrdersServiceError>;
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};
    use rust_decimal::Decimal;
    use rusty_money::{
        Money,
        iso::{Currency, RUB},
    };
    use storefront::{
        carts::{Cart, CartItem, CartItemUuid, CartLine, CartUuid, CartView},
        categories::CategoryTree,
        orders::OrderStatus,
        pricing::{DiscountIndex, PriceResolver},
        products::{Product, ProductUuid},
    };
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::{CartsServiceError, MockCartsService},
            products::ProductsService,
        },
        test::{TestContext, helpers::new_product},
    };

    use super::*;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
            email: "anna@example.com".to_string(),
            phone: "+79990001122".to_string(),
            comment: Some("Ring twice".to_string()),
            ..CustomerDetails::default()
        }
    }

    fn view(lines: &[(i64, u32)]) -> Result<CartView<'static>, storefront::pricing::PricingError> {
        let cart = Cart {
            uuid: CartUuid::new(),
            user: None,
            token: None,
            total: Decimal::ZERO,
        };

        let lines = lines
            .iter()
            .map(|(price, count)| CartLine {
                item: CartItem {
                    uuid: CartItemUuid::new(),
                    cart: cart.uuid,
                    product: ProductUuid::new(),
                    count: *count,
                },
                product: Product {
                    uuid: ProductUuid::new(),
                    category: None,
                    price: Money::from_decimal(Decimal::new(*price, 0), RUB),
                    discount_price: None,
                    count: None,
                    is_archived: false,
                    is_published: true,
                },
            })
            .collect();

        let tree = CategoryTree::default();
        let discounts = DiscountIndex::default();

        CartView::build(&cart, lines, &PriceResolver::new(&tree, &discounts), RUB)
    }

    fn empty_view(currency: &'static Currency) -> CartView<'static> {
        CartView::empty(currency)
    }

    #[tokio::test]
    async fn places_order_and_removes_ordered_lines() -> TestResult {
        let ctx = TestContext::new().await?;
        let user = UserUuid::new();
        let identity = CartIdentity::user(user);
        let cart = view(&[(100, 2), (15, 1)])?;

        let ordered: Vec<(CartItemUuid, u32)> = cart
            .available
            .iter()
            .map(|line| (line.item.uuid, line.item.count))
            .collect();

        let mut carts = MockCartsService::new();

        carts
            .expect_get_all()
            .with(eq(identity), always())
            .times(1)
            .return_once(move |_, _| Ok(cart));

        carts
            .expect_remove_ordered()
            .with(eq(identity), eq(ordered), always())
            .times(1)
            .returning(|_, _, _| Ok(empty_view(RUB)));

        carts.expect_clear().never();

        let orders = StoreOrdersService::new(ctx.store(), Arc::new(carts));

        let order = orders.place_order(identity, customer(), Timestamp::now()).await?;

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total, Decimal::new(215, 0));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.user, Some(user));

        let stored = orders.get_order(order.uuid).await?;

        assert_eq!(stored, order);

        let listed = orders.list_orders(user, OrderQuery::default()).await?;

        assert_eq!(listed, vec![order]);

        Ok(())
    }

    #[tokio::test]
    async fn placing_order_empties_real_cart() -> TestResult {
        let ctx = TestContext::new().await?;
        let now = Timestamp::now();
        let user = UserUuid::new();
        let identity = CartIdentity::user(user);

        let a = ctx.products.create_product(new_product(None, Decimal::TEN)).await?;
        let b = ctx.products.create_product(new_product(None, Decimal::new(35, 0))).await?;

        ctx.carts.add_item(identity, a.uuid, Some(3), now).await?;
        ctx.carts.add_item(identity, b.uuid, None, now).await?;

        let order = ctx.orders.place_order(identity, customer(), now).await?;

        assert_eq!(order.total, Decimal::new(65, 0));

        let mut lines: Vec<_> = order
            .items
            .iter()
            .map(|line| (line.product, line.count, line.unit_price))
            .collect();
        lines.sort();

        let mut expected = vec![(a.uuid, 3, Decimal::TEN), (b.uuid, 1, Decimal::new(35, 0))];
        expected.sort();

        assert_eq!(lines, expected);

        let cart = ctx.carts.get_all(identity, now).await?;

        assert!(cart.is_empty(), "ordered lines leave the cart");
        assert_eq!(ctx.orders.get_order(order.uuid).await?, order);

        Ok(())
    }

    #[tokio::test]
    async fn orders_are_listed_newest_first_in_pages() -> TestResult {
        let ctx = TestContext::new().await?;
        let user = UserUuid::new();
        let identity = CartIdentity::user(user);
        let start = Timestamp::now();

        let product = ctx.products.create_product(new_product(None, Decimal::ONE)).await?;

        let mut placed = Vec::new();

        for minutes in 0..3 {
            let at = start + jiff::SignedDuration::from_mins(minutes);

            ctx.carts.add_item(identity, product.uuid, None, at).await?;
            placed.push(ctx.orders.place_order(identity, customer(), at).await?.uuid);
        }

        placed.reverse();

        let first_page = ctx
            .orders
            .list_orders(user, OrderQuery { take: 2, skip: 0 })
            .await?;
        let second_page = ctx
            .orders
            .list_orders(user, OrderQuery { take: 2, skip: 2 })
            .await?;

        assert_eq!(
            first_page
                .iter()
                .chain(&second_page)
                .map(|order| order.uuid)
                .collect::<Vec<_>>(),
            placed
        );
        assert_eq!(second_page.len(), 1);
        assert!(
            ctx.orders
                .list_orders(UserUuid::new(), OrderQuery::default())
                .await?
                .is_empty()
        );

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_is_invalid_input_and_keeps_cart() -> TestResult {
        let ctx = TestContext::new().await?;
        let mut carts = MockCartsService::new();

        carts
            .expect_get_all()
            .returning(|_, _| Ok(empty_view(RUB)));

        carts.expect_remove_ordered().never();

        let orders = StoreOrdersService::new(ctx.store(), Arc::new(carts));

        let result = orders
            .place_order(CartIdentity::user(UserUuid::new()), customer(), Timestamp::now())
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::InvalidInput(_))),
            "expected InvalidInput, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn bad_customer_details_are_rejected() -> TestResult {
        let ctx = TestContext::new().await?;
        let cart = view(&[(10, 1)])?;

        let mut carts = MockCartsService::new();

        carts.expect_get_all().return_once(move |_, _| Ok(cart));
        carts.expect_remove_ordered().never();

        let orders = StoreOrdersService::new(ctx.store(), Arc::new(carts));

        let result = orders
            .place_order(
                CartIdentity::user(UserUuid::new()),
                CustomerDetails {
                    email: "not-an-email".to_string(),
                    ..customer()
                },
                Timestamp::now(),
            )
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::InvalidInput(_))),
            "expected InvalidInput, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn failed_line_removal_still_returns_order() -> TestResult {
        let ctx = TestContext::new().await?;
        let cart = view(&[(10, 3)])?;

        let mut carts = MockCartsService::new();

        carts.expect_get_all().return_once(move |_, _| Ok(cart));
        carts
            .expect_remove_ordered()
            .returning(|_, _, _| Err(CartsServiceError::NotFound));

        let orders = StoreOrdersService::new(ctx.store(), Arc::new(carts));

        let order = orders
            .place_order(CartIdentity::user(UserUuid::new()), customer(), Timestamp::now())
            .await?;

        assert_eq!(order.total, Decimal::new(30, 0));
        assert_eq!(orders.get_order(order.uuid).await?, order);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() -> TestResult {
        let ctx = TestContext::new().await?;
        let orders = StoreOrdersService::new(ctx.store(), Arc::new(MockCartsService::new()));

        let result = orders.get_order(OrderUuid::new()).await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }
}
