//! Products

use rusty_money::{Money, iso::Currency};

use crate::{categories::CategoryUuid, uuids::TypedUuid};

/// Product UUID
pub type ProductUuid = TypedUuid<ProductMarker>;

/// Marker type for [`ProductUuid`].
#[derive(Debug)]
pub struct ProductMarker;

/// The pricing and stock view of a product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product<'a> {
    /// Product id
    pub uuid: ProductUuid,

    /// Category the product is listed under
    pub category: Option<CategoryUuid>,

    /// List price
    pub price: Money<'a, Currency>,

    /// Manual override, only honoured when no discount applies
    pub discount_price: Option<Money<'a, Currency>>,

    /// Units in stock; `None` means stock is not tracked
    pub count: Option<u32>,

    /// Out of stock; see [`derive_archived`]
    pub is_archived: bool,

    /// Visible in the storefront
    pub is_published: bool,
}

impl Product<'_> {
    /// Whether the product can currently be bought.
    pub fn is_available(&self) -> bool {
        self.is_published && !self.is_archived
    }

    /// Clamp a requested quantity to the units in stock.
    pub fn clamp_to_stock(&self, requested: u32) -> u32 {
        self.count.map_or(requested, |stock| requested.min(stock))
    }
}

/// Whether a product with the given stock level is archived.
///
/// Every write that changes `count` must recompute `is_archived` through this
/// function.
pub const fn derive_archived(count: Option<u32>) -> bool {
    matches!(count, Some(0))
}
