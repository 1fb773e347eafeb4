//! Products Data

use rust_decimal::Decimal;
use storefront::{
    categories::CategoryUuid,
    products::{ProductUuid, derive_archived},
};

use crate::domain::products::records::ProductRecord;

/// New Product Data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub category: Option<CategoryUuid>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub count: Option<u32>,
    pub is_published: bool,
}

impl From<NewProduct> for ProductRecord {
    fn from(product: NewProduct) -> Self {
        Self {
            uuid: product.uuid,
            category: product.category,
            price: product.price,
            discount_price: product.discount_price,
            count: product.count,
            is_archived: derive_archived(product.count),
            is_published: product.is_published,
        }
    }
}

/// Product Update Data
///
/// `None` leaves a field unchanged. Archival is never set directly; it
/// follows `count`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub category: Option<Option<CategoryUuid>>,
    pub price: Option<Decimal>,
    pub discount_price: Option<Option<Decimal>>,
    pub count: Option<Option<u32>>,
    pub is_published: Option<bool>,
}

impl ProductUpdate {
    /// Apply the update to the stored row.
    pub fn apply(self, current: ProductRecord) -> ProductRecord {
        let count = self.count.unwrap_or(current.count);

        ProductRecord {
            uuid: current.uuid,
            category: self.category.unwrap_or(current.category),
            price: self.price.unwrap_or(current.price),
            discount_price: self.discount_price.unwrap_or(current.discount_price),
            count,
            is_archived: derive_archived(count),
            is_published: self.is_published.unwrap_or(current.is_published),
        }
    }
}
