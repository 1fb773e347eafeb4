//! Carts service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rusty_money::iso::Currency;
use storefront::{
    carts::{
        Cart, CartContents, CartIdentity, CartItem, CartItemUuid, CartLine, CartUuid, CartView,
        GuestToken, MergePlan, OwnershipPlan, reconcile_ownership, recompute_total,
        requested_count,
    },
    products::{Product, ProductUuid},
};
use tracing::{Span, debug, info, warn};

use crate::{
    domain::{
        carts::{errors::CartsServiceError, repository::CartsRepository},
        pricing::PricingSnapshot,
        products::repository::ProductsRepository,
    },
    store::{Store, StoreError, StoreTransaction},
};

/// How often cart resolution is retried after losing a race to claim a user
/// or guest token.
const RESOLVE_ATTEMPTS: usize = 3;

/// Outcome of one attempt at resolving a cart.
enum Resolution {
    Resolved(Option<Cart>),

    /// A concurrent transaction created or adopted the cart first.
    Contended,
}

/// `None` when a concurrent transaction already claimed the same user or
/// guest token.
fn claim<T>(result: Result<T, StoreError>) -> Result<Option<T>, CartsServiceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::AlreadyExists) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

#[derive(Debug, Clone)]
pub struct StoreCartsService<S> {
    store: S,
    currency: &'static Currency,
    max_items: usize,
}

impl<S: Store> StoreCartsService<S> {
    #[must_use]
    pub fn new(store: S, currency: &'static Currency, max_items: usize) -> Self {
        Self {
            store,
            currency,
            max_items,
        }
    }

    /// Find the identity's cart, folding a guest cart into the user's on the
    /// way, and create one when asked to.
    ///
    /// Two requests for the same user or token can race to claim it; the
    /// loser sees a unique violation and looks the cart up again.
    async fn resolve_cart(
        &self,
        tx: &mut S::Tx,
        identity: CartIdentity,
        create: bool,
        point_in_time: Timestamp,
    ) -> Result<Option<Cart>, CartsServiceError> {
        for attempt in 1..=RESOLVE_ATTEMPTS {
            match self.try_resolve_cart(tx, identity, create, point_in_time).await? {
                Resolution::Resolved(cart) => return Ok(cart),
                Resolution::Contended => {
                    debug!(attempt, "cart claimed concurrently, resolving again");
                }
            }
        }

        Err(CartsServiceError::AlreadyExists)
    }

    async fn try_resolve_cart(
        &self,
        tx: &mut S::Tx,
        identity: CartIdentity,
        create: bool,
        point_in_time: Timestamp,
    ) -> Result<Resolution, CartsServiceError> {
        // Lock the guest cart before reading the user's. A concurrent login
        // with the same token waits on that lock and then finds the guest
        // cart gone and the user cart committed.
        let guest_cart = match identity.token {
            Some(token) => tx.find_guest_cart(token).await?,
            None => None,
        };

        let user_cart = match identity.user {
            Some(user) => tx.find_user_cart(user).await?,
            None => None,
        };

        // Lines only matter when two carts have to be merged.
        let (user_cart, guest_cart) = match (user_cart, guest_cart) {
            (Some(user_cart), Some(guest_cart)) => {
                let user_items = tx.list_cart_items(user_cart.uuid).await?;
                let guest_items = tx.list_cart_items(guest_cart.uuid).await?;

                (
                    Some(CartContents {
                        cart: user_cart,
                        items: user_items,
                    }),
                    Some(CartContents {
                        cart: guest_cart,
                        items: guest_items,
                    }),
                )
            }
            (user_cart, guest_cart) => (
                user_cart.map(|cart| CartContents {
                    cart,
                    items: Vec::new(),
                }),
                guest_cart.map(|cart| CartContents {
                    cart,
                    items: Vec::new(),
                }),
            ),
        };

        let plan = reconcile_ownership(
            user_cart.as_ref(),
            guest_cart.as_ref(),
            identity,
            self.max_items,
        );

        let cart = match plan {
            OwnershipPlan::Keep => user_cart.or(guest_cart).map(|contents| contents.cart),
            OwnershipPlan::Adopt { cart, user } => {
                if claim(tx.adopt_cart(cart, user).await)?.is_none() {
                    return Ok(Resolution::Contended);
                }

                info!(cart_uuid = %cart, user_uuid = %user, "adopted guest cart");

                guest_cart.map(|contents| Cart {
                    user: Some(user),
                    ..contents.cart
                })
            }
            OwnershipPlan::Merge(plan) => {
                self.merge(tx, &plan).await?;
                self.recompute(tx, plan.into, point_in_time).await?;

                user_cart.map(|contents| contents.cart)
            }
        };

        if cart.is_some() || !create {
            return Ok(Resolution::Resolved(cart));
        }

        let cart = Cart {
            uuid: CartUuid::new(),
            user: identity.user,
            token: match identity.user {
                Some(_) => None,
                None => Some(identity.token.unwrap_or_else(GuestToken::new_random)),
            },
            total: rust_decimal::Decimal::ZERO,
        };

        if claim(tx.create_cart(&cart).await)?.is_none() {
            return Ok(Resolution::Contended);
        }

        info!(cart_uuid = %cart.uuid, is_guest = cart.user.is_none(), "created cart");

        Ok(Resolution::Resolved(Some(cart)))
    }

    async fn merge(&self, tx: &mut S::Tx, plan: &MergePlan) -> Result<(), CartsServiceError> {
        for (item, count) in &plan.increments {
            tx.set_cart_item_count(*item, *count).await?;
        }

        for (product, count) in &plan.additions {
            tx.add_cart_item(&CartItem {
                uuid: CartItemUuid::new(),
                cart: plan.into,
                product: *product,
                count: *count,
            })
            .await?;
        }

        if !plan.dropped.is_empty() {
            warn!(
                cart_uuid = %plan.into,
                dropped_lines = plan.dropped.len(),
                max_items = self.max_items,
                "user cart is full, guest lines dropped"
            );
        }

        tx.delete_cart(plan.from).await?;

        info!(cart_uuid = %plan.into, guest_cart_uuid = %plan.from, "merged guest cart");

        Ok(())
    }

    async fn lines(&self, tx: &mut S::Tx, cart: CartUuid) -> Result<Vec<CartLine<'static>>, CartsServiceError> {
        Ok(tx
            .list_cart_lines(cart)
            .await?
            .into_iter()
            .map(|line| line.into_line(self.currency))
            .collect())
    }

    /// Clamp stored counts to stock and persist the total.
    async fn recompute(
        &self,
        tx: &mut S::Tx,
        cart: CartUuid,
        point_in_time: Timestamp,
    ) -> Result<(), CartsServiceError> {
        let mut lines = self.lines(tx, cart).await?;

        let products: Vec<Product<'static>> = lines.iter().map(|line| line.product.clone()).collect();

        let snapshot = PricingSnapshot::load(tx, &products, point_in_time).await?;

        let (clamps, total) = recompute_total(&snapshot.resolver(), self.currency, &mut lines)?;

        for clamp in &clamps {
            tx.set_cart_item_count(clamp.item, clamp.to).await?;

            warn!(
                cart_uuid = %cart,
                item_uuid = %clamp.item,
                from = clamp.from,
                to = clamp.to,
                "clamped cart line to stock"
            );
        }

        tx.set_cart_total(cart, *total.amount()).await?;

        Ok(())
    }

    async fn view(
        &self,
        tx: &mut S::Tx,
        cart: &Cart,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        let lines = self.lines(tx, cart.uuid).await?;

        let products: Vec<Product<'static>> = lines.iter().map(|line| line.product.clone()).collect();

        let snapshot = PricingSnapshot::load(tx, &products, point_in_time).await?;

        let view = CartView::build(cart, lines, &snapshot.resolver(), self.currency)?;

        Span::current().record("line_count", view.available.len() + view.archived.len());

        Ok(view)
    }

    async fn owned_cart(
        &self,
        tx: &mut S::Tx,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<Cart, CartsServiceError> {
        self.resolve_cart(tx, identity, false, point_in_time)
            .await?
            .ok_or(CartsServiceError::NotFound)
    }
}

#[async_trait]
impl<S: Store> CartsService for StoreCartsService<S> {
    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self, identity),
        fields(product_uuid = %product, line_count = tracing::field::Empty),
        err
    )]
    async fn add_item(
        &self,
        identity: CartIdentity,
        product: ProductUuid,
        count: Option<u32>,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        tx.get_product(product).await?;

        let cart = self
            .resolve_cart(&mut tx, identity, true, point_in_time)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let items = tx.list_cart_items(cart.uuid).await?;

        if !items.iter().any(|item| item.product == product) && items.len() >= self.max_items {
            return Err(CartsServiceError::CapacityExceeded {
                max: self.max_items,
            });
        }

        let item = tx
            .add_cart_item(&CartItem {
                uuid: CartItemUuid::new(),
                cart: cart.uuid,
                product,
                count: requested_count(count),
            })
            .await?;

        self.recompute(&mut tx, cart.uuid, point_in_time).await?;

        let view = self.view(&mut tx, &cart, point_in_time).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, item_uuid = %item.uuid, count = item.count, "added cart item");

        Ok(view)
    }

    #[tracing::instrument(
        name = "carts.service.get_all",
        skip(self, identity),
        fields(line_count = tracing::field::Empty),
        err
    )]
    async fn get_all(
        &self,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        if identity.is_anonymous() {
            return Ok(CartView::empty(self.currency));
        }

        let mut tx = self.store.begin().await?;

        let Some(cart) = self.resolve_cart(&mut tx, identity, false, point_in_time).await? else {
            tx.commit().await?;

            return Ok(CartView::empty(self.currency));
        };

        let view = self.view(&mut tx, &cart, point_in_time).await?;

        tx.commit().await?;

        Ok(view)
    }

    #[tracing::instrument(
        name = "carts.service.get_item",
        skip(self, identity),
        fields(item_uuid = %item),
        err
    )]
    async fn get_item(
        &self,
        item: CartItemUuid,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartItem, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        let cart = self.owned_cart(&mut tx, identity, point_in_time).await?;

        let found = tx
            .list_cart_items(cart.uuid)
            .await?
            .into_iter()
            .find(|line| line.uuid == item)
            .ok_or(CartsServiceError::NotFound)?;

        tx.commit().await?;

        Ok(found)
    }

    #[tracing::instrument(
        name = "carts.service.update_item",
        skip(self, identity),
        fields(item_uuid = %item, line_count = tracing::field::Empty),
        err
    )]
    async fn update_item(
        &self,
        item: CartItemUuid,
        identity: CartIdentity,
        count: i32,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        let Ok(count) = u32::try_from(count) else {
            return self.remove_item(item, identity, point_in_time).await;
        };

        if count == 0 {
            return self.remove_item(item, identity, point_in_time).await;
        }

        let mut tx = self.store.begin().await?;

        let cart = self.owned_cart(&mut tx, identity, point_in_time).await?;

        if !tx
            .list_cart_items(cart.uuid)
            .await?
            .iter()
            .any(|line| line.uuid == item)
        {
            return Err(CartsServiceError::NotFound);
        }

        tx.set_cart_item_count(item, count).await?;

        self.recompute(&mut tx, cart.uuid, point_in_time).await?;

        let view = self.view(&mut tx, &cart, point_in_time).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, item_uuid = %item, count, "updated cart item");

        Ok(view)
    }

    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self, identity),
        fields(item_uuid = %item, line_count = tracing::field::Empty),
        err
    )]
    async fn remove_item(
        &self,
        item: CartItemUuid,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        let cart = self.owned_cart(&mut tx, identity, point_in_time).await?;

        if tx.delete_cart_item(cart.uuid, item).await? == 0 {
            return Err(CartsServiceError::NotFound);
        }

        self.recompute(&mut tx, cart.uuid, point_in_time).await?;

        let view = self.view(&mut tx, &cart, point_in_time).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, item_uuid = %item, "removed cart item");

        Ok(view)
    }

    #[tracing::instrument(
        name = "carts.service.clear",
        skip(self, identity),
        fields(line_count = tracing::field::Empty),
        err
    )]
    async fn clear(
        &self,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        if identity.is_anonymous() {
            return Ok(CartView::empty(self.currency));
        }

        let mut tx = self.store.begin().await?;

        let Some(cart) = self.resolve_cart(&mut tx, identity, false, point_in_time).await? else {
            tx.commit().await?;

            return Ok(CartView::empty(self.currency));
        };

        let cleared = tx.clear_cart_items(cart.uuid).await?;

        self.recompute(&mut tx, cart.uuid, point_in_time).await?;

        let view = self.view(&mut tx, &cart, point_in_time).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, cleared, "cleared cart");

        Ok(view)
    }

    #[tracing::instrument(
        name = "carts.service.remove_ordered",
        skip(self, identity, ordered),
        fields(line_count = tracing::field::Empty),
        err
    )]
    async fn remove_ordered(
        &self,
        identity: CartIdentity,
        ordered: Vec<(CartItemUuid, u32)>,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError> {
        let mut tx = self.store.begin().await?;

        let cart = self.owned_cart(&mut tx, identity, point_in_time).await?;

        let items = tx.list_cart_items(cart.uuid).await?;

        let mut removed = 0_usize;
        let mut reduced = 0_usize;

        for (item, count) in &ordered {
            let Some(current) = items.iter().find(|line| line.uuid == *item) else {
                continue;
            };

            if current.count > *count {
                tx.set_cart_item_count(current.uuid, current.count - count).await?;
                reduced += 1;
            } else {
                tx.delete_cart_item(cart.uuid, current.uuid).await?;
                removed += 1;
            }
        }

        self.recompute(&mut tx, cart.uuid, point_in_time).await?;

        let view = self.view(&mut tx, &cart, point_in_time).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, removed, reduced, "removed ordered lines");

        Ok(view)
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Add `count` (default one) of a product, creating the cart if needed.
    async fn add_item(
        &self,
        identity: CartIdentity,
        product: ProductUuid,
        count: Option<u32>,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError>;

    /// The identity's cart; empty when there is none.
    async fn get_all(
        &self,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError>;

    /// One line of the identity's cart.
    async fn get_item(
        &self,
        item: CartItemUuid,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartItem, CartsServiceError>;

    /// Set a line's count; zero or less removes the line.
    async fn update_item(
        &self,
        item: CartItemUuid,
        identity: CartIdentity,
        count: i32,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError>;

    /// Remove one line.
    async fn remove_item(
        &self,
        item: CartItemUuid,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError>;

    /// Remove every line.
    async fn clear(
        &self,
        identity: CartIdentity,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError>;

    /// Take ordered quantities off the identity's cart.
    ///
    /// Each listed line loses the ordered count and is deleted once nothing
    /// is left. Lines that are not listed, such as ones added after the
    /// order was read, are kept.
    async fn remove_ordered(
        &self,
        identity: CartIdentity,
        ordered: Vec<(CartItemUuid, u32)>,
        point_in_time: Timestamp,
    ) -> Result<CartView<'static>, CartsServiceError>;
}
