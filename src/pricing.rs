//! Pricing
//!
//! Resolves the effective price of a product at one instant. Candidates are
//! the active product-level discounts plus the active category-level discounts
//! of the product's category and every ancestor; the lowest priority wins.

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::{
    categories::{CategoryTree, CategoryUuid},
    discounts::{DiscountKind, DiscountUuid, TargetScope, TargetedDiscount},
    money::{MoneyMathError, money, percent_off},
    products::Product,
};

/// Errors raised while pricing a product.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Price arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyMathError),
}

/// The discount that won resolution, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDiscount {
    /// Discount id
    pub discount: DiscountUuid,

    /// Discount name
    pub name: String,

    /// Percent off or fixed price
    pub kind: DiscountKind,

    /// Raw discount amount
    pub amount: rust_decimal::Decimal,

    /// The target the discount was found through
    pub target: TargetScope,

    /// Stored target priority
    pub priority: i32,

    /// Start of the validity window
    pub started_at: Timestamp,

    /// End of the validity window
    pub expires_at: Timestamp,
}

impl From<&TargetedDiscount> for AppliedDiscount {
    fn from(winner: &TargetedDiscount) -> Self {
        Self {
            discount: winner.discount.uuid,
            name: winner.discount.name.clone(),
            kind: winner.discount.kind,
            amount: winner.discount.amount,
            target: winner.target.scope,
            priority: winner.target.priority,
            started_at: winner.discount.started_at,
            expires_at: winner.discount.expires_at,
        }
    }
}

/// A product with its resolved price.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedProduct<'a> {
    /// The product that was priced
    pub product: Product<'a>,

    /// Price charged for one unit
    pub effective_price: Money<'a, Currency>,

    /// Winning discount, if any applied
    pub applied: Option<AppliedDiscount>,
}

/// Active discount targets grouped by what they point at, each group ordered
/// by priority.
#[derive(Debug, Clone, Default)]
pub struct DiscountIndex {
    by_scope: FxHashMap<TargetScope, SmallVec<[TargetedDiscount; 2]>>,
}

impl DiscountIndex {
    /// Index the discounts that are active at `point_in_time`; the rest are
    /// dropped.
    pub fn new(discounts: impl IntoIterator<Item = TargetedDiscount>, point_in_time: Timestamp) -> Self {
        let mut by_scope: FxHashMap<TargetScope, SmallVec<[TargetedDiscount; 2]>> = FxHashMap::default();

        for discount in discounts {
            if discount.is_active(point_in_time) {
                by_scope.entry(discount.target.scope).or_default().push(discount);
            }
        }

        for group in by_scope.values_mut() {
            group.sort_by_key(TargetedDiscount::priority);
        }

        Self { by_scope }
    }

    /// Active discounts for one scope, by priority.
    pub fn for_scope(&self, scope: TargetScope) -> &[TargetedDiscount] {
        self.by_scope.get(&scope).map_or(&[], |group| group.as_slice())
    }

    /// Number of indexed discount targets.
    pub fn len(&self) -> usize {
        self.by_scope.values().map(SmallVec::len).sum()
    }

    /// Whether no discount is active.
    pub fn is_empty(&self) -> bool {
        self.by_scope.is_empty()
    }
}

/// Prices products against a category snapshot and a discount index.
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver<'t> {
    categories: &'t CategoryTree,
    discounts: &'t DiscountIndex,
}

impl<'t> PriceResolver<'t> {
    /// Create a resolver over the given snapshots.
    pub const fn new(categories: &'t CategoryTree, discounts: &'t DiscountIndex) -> Self {
        Self { categories, discounts }
    }

    /// Every candidate discount for `product`, best first.
    ///
    /// Product-level discounts are gathered before category-level ones, and
    /// categories nearest the product before their ancestors; the final sort
    /// by priority is stable so that order breaks ties.
    pub fn candidates(&self, product: &Product<'_>) -> Vec<&'t TargetedDiscount> {
        let mut candidates: Vec<&'t TargetedDiscount> = self
            .discounts
            .for_scope(TargetScope::Product(product.uuid))
            .iter()
            .collect();

        if let Some(category) = product.category {
            for uuid in self.lineage(category) {
                candidates.extend(self.discounts.for_scope(TargetScope::Category(uuid)));
            }
        }

        candidates.sort_by_key(|candidate| candidate.priority());

        candidates
    }

    /// Resolve the effective price of one product.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Money`] if the price arithmetic overflows.
    pub fn resolve<'a>(&self, product: &Product<'a>) -> Result<PricedProduct<'a>, PricingError> {
        let candidates = self.candidates(product);

        resolve_price(product, candidates.first().copied())
    }

    // A category missing from the snapshot still matches its own targets.
    fn lineage(&self, category: CategoryUuid) -> SmallVec<[CategoryUuid; 8]> {
        self.categories
            .lineage(category)
            .unwrap_or_else(|_| smallvec![category])
    }
}

/// Apply a winning discount, or fall back to the product's own prices.
///
/// Without a winner the manual `discount_price` is honoured, else the list
/// price. A percentage winner takes `amount` percent off the list price; a
/// fixed winner replaces it.
///
/// # Errors
///
/// Returns [`PricingError::Money`] if the price arithmetic overflows.
pub fn resolve_price<'a>(
    product: &Product<'a>,
    winner: Option<&TargetedDiscount>,
) -> Result<PricedProduct<'a>, PricingError> {
    let Some(winner) = winner else {
        return Ok(PricedProduct {
            product: product.clone(),
            effective_price: product.discount_price.unwrap_or(product.price),
            applied: None,
        });
    };

    let effective_price = match winner.discount.kind {
        DiscountKind::Percent => percent_off(&product.price, winner.discount.amount)?,
        DiscountKind::Fixed => money(winner.discount.amount, product.price.currency()),
    };

    Ok(PricedProduct {
        product: product.clone(),
        effective_price,
        applied: Some(AppliedDiscount::from(winner)),
    })
}
