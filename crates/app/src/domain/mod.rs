//! Storefront Domain Concerns

pub mod carts;
pub mod categories;
pub mod discounts;
pub mod orders;
pub mod pricing;
pub mod products;
