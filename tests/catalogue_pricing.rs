//! Integration test pricing a small catalogue end to end.
//!
//! Catalogue:
//!
//! ```text
//! Electronics            10% off (priority 5, stored as 4)
//! └── Audio
//!     └── Headphones     FIXED 2500.00 on one product (priority 4)
//! Garden                 (disjoint tree, 50% off, priority 0)
//! ```
//!
//! - Studio headphones (3000.00): product FIXED and inherited category PERCENT
//!   both at stored priority 4; the product target was gathered first and
//!   wins the tie -> 2500.00.
//! - Earbuds (1999.90): only the inherited 10% -> 1799.91.
//! - Cable (100.00, manual discount price 90.00) in Audio with the category
//!   discount archived -> 90.00.

use jiff::{SignedDuration, Timestamp};
use rust_decimal::Decimal;
use rusty_money::iso::RUB;
use testresult::TestResult;

use storefront::{
    carts::{Cart, CartItem, CartItemUuid, CartLine, CartUuid, CartView, GuestToken},
    categories::{Category, CategoryTree, CategoryUuid},
    discounts::{
        Discount, DiscountKind, DiscountScope, DiscountTarget, DiscountTargetUuid, DiscountUuid,
        TargetedDiscount, plan_targets,
    },
    money::money,
    pricing::{DiscountIndex, PriceResolver},
    products::{Product, ProductUuid},
};

fn category(name: &str, parent: Option<CategoryUuid>) -> Category {
    Category {
        uuid: CategoryUuid::new(),
        name: name.to_string(),
        parent,
        sort_order: 0,
    }
}

fn product(category: CategoryUuid, price: Decimal) -> Product<'static> {
    Product {
        uuid: ProductUuid::new(),
        category: Some(category),
        price: money(price, RUB),
        discount_price: None,
        count: Some(5),
        is_archived: false,
        is_published: true,
    }
}

fn discount(kind: DiscountKind, amount: Decimal) -> Discount {
    let now = Timestamp::now();

    Discount {
        uuid: DiscountUuid::new(),
        name: format!("{kind} {amount}"),
        kind,
        amount,
        started_at: now - SignedDuration::from_hours(24),
        expires_at: now + SignedDuration::from_hours(24),
        is_archived: false,
        priority: 0,
    }
}

fn targets_for(discount: &Discount, scope: &DiscountScope, priority: i32) -> Vec<TargetedDiscount> {
    plan_targets(scope, priority)
        .into_iter()
        .map(|planned| TargetedDiscount {
            target: DiscountTarget {
                uuid: DiscountTargetUuid::new(),
                discount: discount.uuid,
                scope: planned.scope,
                priority: planned.priority,
            },
            discount: discount.clone(),
        })
        .collect()
}

#[test]
fn test_catalogue_resolution() -> TestResult {
    let electronics = category("Electronics", None);
    let audio = category("Audio", Some(electronics.uuid));
    let headphones = category("Headphones", Some(audio.uuid));
    let garden = category("Garden", None);

    let tree = CategoryTree::from_categories([
        electronics.clone(),
        audio.clone(),
        headphones.clone(),
        garden.clone(),
    ]);

    let studio = product(headphones.uuid, Decimal::new(3000, 0));
    let earbuds = product(headphones.uuid, Decimal::new(199_990, 2));
    let mut cable = product(audio.uuid, Decimal::new(100, 0));
    cable.discount_price = Some(money(Decimal::new(90, 0), RUB));

    let category_wide = discount(DiscountKind::Percent, Decimal::TEN);
    let studio_fixed = discount(DiscountKind::Fixed, Decimal::new(2500, 0));
    let garden_sale = discount(DiscountKind::Percent, Decimal::new(50, 0));

    let mut all = Vec::new();
    all.extend(targets_for(&category_wide, &DiscountScope::Category(electronics.uuid), 5));
    all.extend(targets_for(&studio_fixed, &DiscountScope::Products(vec![studio.uuid]), 4));
    all.extend(targets_for(&garden_sale, &DiscountScope::Category(garden.uuid), 0));

    let index = DiscountIndex::new(all.clone(), Timestamp::now());
    let resolver = PriceResolver::new(&tree, &index);

    let studio_price = resolver.resolve(&studio)?;
    assert_eq!(studio_price.effective_price, money(Decimal::new(2500, 0), RUB));
    assert_eq!(
        studio_price.applied.map(|applied| applied.discount),
        Some(studio_fixed.uuid)
    );

    let earbuds_price = resolver.resolve(&earbuds)?;
    assert_eq!(earbuds_price.effective_price, money(Decimal::new(179_991, 2), RUB));

    // Archive the category-wide discount; the cable falls back to its manual price.
    let without_category: Vec<_> = all
        .into_iter()
        .map(|mut targeted| {
            if targeted.discount.uuid == category_wide.uuid {
                targeted.discount.is_archived = true;
            }

            targeted
        })
        .collect();

    let index = DiscountIndex::new(without_category, Timestamp::now());
    let resolver = PriceResolver::new(&tree, &index);

    let cable_price = resolver.resolve(&cable)?;
    assert_eq!(cable_price.effective_price, money(Decimal::new(90, 0), RUB));
    assert_eq!(cable_price.applied, None);

    Ok(())
}

#[test]
fn test_subtree_excludes_disjoint_trees() -> TestResult {
    let electronics = category("Electronics", None);
    let audio = category("Audio", Some(electronics.uuid));
    let headphones = category("Headphones", Some(audio.uuid));
    let garden = category("Garden", None);
    let tools = category("Tools", Some(garden.uuid));

    let tree = CategoryTree::from_categories([
        electronics.clone(),
        audio.clone(),
        headphones.clone(),
        garden.clone(),
        tools.clone(),
    ]);

    let ids = tree.subtree_ids(electronics.uuid)?;

    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&electronics.uuid), "subtree must contain its root");
    assert!(ids.contains(&headphones.uuid), "subtree must contain grandchildren");
    assert!(!ids.contains(&garden.uuid), "subtree must not leak into other trees");
    assert!(!ids.contains(&tools.uuid), "subtree must not leak into other trees");

    Ok(())
}

#[test]
fn test_cart_view_over_catalogue() -> TestResult {
    let audio = category("Audio", None);
    let tree = CategoryTree::from_categories([audio.clone()]);

    let mut scarce = product(audio.uuid, Decimal::new(100, 0));
    scarce.count = Some(1);

    let plentiful = product(audio.uuid, Decimal::new(40, 0));

    let sale = discount(DiscountKind::Percent, Decimal::new(25, 0));
    let index = DiscountIndex::new(
        targets_for(&sale, &DiscountScope::Category(audio.uuid), 1),
        Timestamp::now(),
    );

    let cart = Cart {
        uuid: CartUuid::new(),
        user: None,
        token: Some(GuestToken::new_random()),
        total: Decimal::ZERO,
    };

    let line = |product: &Product<'static>, count| CartLine {
        item: CartItem {
            uuid: CartItemUuid::new(),
            cart: cart.uuid,
            product: product.uuid,
            count,
        },
        product: product.clone(),
    };

    let view = CartView::build(
        &cart,
        vec![line(&scarce, 5), line(&plentiful, 2)],
        &PriceResolver::new(&tree, &index),
        RUB,
    )?;

    // 1 x 75.00 (clamped from 5) + 2 x 30.00
    assert_eq!(view.total, money(Decimal::new(135, 0), RUB));
    assert_eq!(
        view.available.iter().map(|line| line.item.count).collect::<Vec<_>>(),
        vec![1, 2]
    );

    Ok(())
}
