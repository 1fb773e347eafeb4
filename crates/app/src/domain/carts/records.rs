//! Cart Records

use rusty_money::iso::Currency;
use storefront::carts::{CartItem, CartLine};

use crate::domain::products::records::ProductRecord;

/// A stored cart line joined with its product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineRecord {
    pub item: CartItem,
    pub product: ProductRecord,
}

impl CartLineRecord {
    /// Attach the store currency.
    pub fn into_line(self, currency: &'static Currency) -> CartLine<'static> {
        CartLine {
            item: self.item,
            product: self.product.into_product(currency),
        }
    }
}
