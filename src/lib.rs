//! Storefront
//!
//! Pricing and cart engine for a small storefront: a category forest with
//! inherited discounts, priority-based price resolution, cart totals with
//! stock clamping and guest-to-user cart reconciliation, and order snapshots.
//!
//! The crate does no I/O. Callers load snapshots (categories, active
//! discounts, cart lines) and apply the plans returned here.

pub mod carts;
pub mod categories;
pub mod discounts;
pub mod money;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod uuids;
