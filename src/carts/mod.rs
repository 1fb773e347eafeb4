//! Carts
//!
//! A cart belongs to a user, a guest token, or (transiently, after login) is
//! being handed from one to the other. Each product appears at most once per
//! cart; repeated adds increment the existing line.

use rust_decimal::Decimal;

use crate::{products::ProductUuid, uuids::TypedUuid};

pub mod identity;
pub mod lines;
pub mod ownership;

pub use identity::{CartIdentity, GuestToken, UserUuid};
pub use lines::{
    CartLine, CartView, PricedLine, StockClamp, clamp_to_stock, lines_total, partition_lines,
    price_lines, recompute_total,
};
pub use ownership::{CartContents, MergePlan, OwnershipPlan, reconcile_ownership};

/// Cart UUID
pub type CartUuid = TypedUuid<CartMarker>;

/// Marker type for [`CartUuid`].
#[derive(Debug)]
pub struct CartMarker;

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItemMarker>;

/// Marker type for [`CartItemUuid`].
#[derive(Debug)]
pub struct CartItemMarker;

/// Default ceiling on distinct lines per cart.
pub const DEFAULT_MAX_ITEMS: usize = 30;

/// A cart row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    /// Cart id
    pub uuid: CartUuid,

    /// Owning user, once known
    pub user: Option<UserUuid>,

    /// Guest token the cart was created under
    pub token: Option<GuestToken>,

    /// Last persisted total
    pub total: Decimal,
}

/// A cart line row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    /// Line id
    pub uuid: CartItemUuid,

    /// Owning cart
    pub cart: CartUuid,

    /// Product on the line
    pub product: ProductUuid,

    /// Requested quantity
    pub count: u32,
}

/// Quantity requested by an add; missing or zero means one.
pub const fn requested_count(count: Option<u32>) -> u32 {
    match count {
        None | Some(0) => 1,
        Some(count) => count,
    }
}
