//! Test Helpers

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use storefront::{
    categories::CategoryUuid,
    discounts::{DiscountKind, DiscountUuid},
    products::ProductUuid,
};

use crate::domain::{
    categories::data::NewCategory, discounts::data::NewDiscount, products::data::NewProduct,
};

pub(crate) fn new_category(name: &str, parent: Option<CategoryUuid>) -> NewCategory {
    NewCategory {
        uuid: CategoryUuid::new(),
        name: name.to_string(),
        parent,
        sort_order: 0,
    }
}

/// A published product with unlimited stock.
pub(crate) fn new_product(category: Option<CategoryUuid>, price: Decimal) -> NewProduct {
    NewProduct {
        uuid: ProductUuid::new(),
        category,
        price,
        discount_price: None,
        count: None,
        is_published: true,
    }
}

fn promo(kind: DiscountKind, amount: Decimal, priority: i32) -> NewDiscount {
    let now = Timestamp::now();

    NewDiscount {
        uuid: DiscountUuid::new(),
        name: "Promo".to_string(),
        kind,
        amount,
        started_at: now - SignedDuration::from_hours(1),
        expires_at: now + SignedDuration::from_hours(24),
        category: None,
        products: Vec::new(),
        priority,
    }
}

/// A discount running from an hour ago until tomorrow over one category.
pub(crate) fn category_discount(
    category: CategoryUuid,
    kind: DiscountKind,
    amount: Decimal,
    priority: i32,
) -> NewDiscount {
    NewDiscount {
        category: Some(category),
        ..promo(kind, amount, priority)
    }
}

/// A discount running from an hour ago until tomorrow over a product set.
pub(crate) fn product_discount(
    products: Vec<ProductUuid>,
    kind: DiscountKind,
    amount: Decimal,
    priority: i32,
) -> NewDiscount {
    NewDiscount {
        products,
        ..promo(kind, amount, priority)
    }
}
