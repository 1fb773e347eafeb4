//! Product Records

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use storefront::{
    categories::CategoryUuid,
    products::{Product, ProductUuid},
};

/// Product Record
///
/// The stored form of a product: prices are plain decimals in the store's
/// currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub uuid: ProductUuid,
    pub category: Option<CategoryUuid>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub count: Option<u32>,
    pub is_archived: bool,
    pub is_published: bool,
}

impl ProductRecord {
    /// Attach the store currency.
    pub fn into_product(self, currency: &'static Currency) -> Product<'static> {
        Product {
            uuid: self.uuid,
            category: self.category,
            price: Money::from_decimal(self.price, currency),
            discount_price: self
                .discount_price
                .map(|amount| Money::from_decimal(amount, currency)),
            count: self.count,
            is_archived: self.is_archived,
            is_published: self.is_published,
        }
    }
}
