//! Discounts Data

use jiff::Timestamp;
use rust_decimal::Decimal;
use storefront::{
    categories::CategoryUuid,
    discounts::{
        Discount, DiscountKind, DiscountScope, DiscountTarget, DiscountUuid,
        DiscountValidationError,
    },
    products::ProductUuid,
};

/// Page size used when the caller does not give one.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// New Discount Data
///
/// Exactly one of `category` and `products` must be given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDiscount {
    pub uuid: DiscountUuid,
    pub name: String,
    pub kind: DiscountKind,
    pub amount: Decimal,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub category: Option<CategoryUuid>,
    pub products: Vec<ProductUuid>,
    pub priority: i32,
}

impl NewDiscount {
    /// The discount row, not yet archived.
    pub fn discount(&self) -> Discount {
        Discount {
            uuid: self.uuid,
            name: self.name.clone(),
            kind: self.kind,
            amount: self.amount,
            started_at: self.started_at,
            expires_at: self.expires_at,
            is_archived: false,
            priority: self.priority,
        }
    }
}

/// Discount Update Data
///
/// `None` leaves a field unchanged. Targets are only touched when a scope
/// (`category` or `products`) or a `priority` is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscountUpdate {
    pub name: Option<String>,
    pub kind: Option<DiscountKind>,
    pub amount: Option<Decimal>,
    pub started_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
    pub is_archived: Option<bool>,
    pub category: Option<CategoryUuid>,
    pub products: Option<Vec<ProductUuid>>,
    pub priority: Option<i32>,
}

impl DiscountUpdate {
    /// Apply the field changes to the stored discount.
    pub fn apply(&self, current: &Discount) -> Discount {
        Discount {
            uuid: current.uuid,
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            kind: self.kind.unwrap_or(current.kind),
            amount: self.amount.unwrap_or(current.amount),
            started_at: self.started_at.unwrap_or(current.started_at),
            expires_at: self.expires_at.unwrap_or(current.expires_at),
            is_archived: self.is_archived.unwrap_or(current.is_archived),
            priority: self.priority.unwrap_or(current.priority),
        }
    }

    /// Whether the targets need to be diffed at all.
    pub const fn touches_targets(&self) -> bool {
        self.category.is_some() || self.products.is_some() || self.priority.is_some()
    }

    /// The requested scope, if one was given.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountValidationError`] for an empty, ambiguous or
    /// duplicated scope.
    pub fn scope(&self) -> Result<Option<DiscountScope>, DiscountValidationError> {
        if self.category.is_none() && self.products.is_none() {
            return Ok(None);
        }

        DiscountScope::from_parts(self.category, self.products.clone().unwrap_or_default()).map(Some)
    }
}

/// The scope the existing targets describe, used when an update only
/// changes priority.
pub fn existing_scope(targets: &[DiscountTarget]) -> Option<DiscountScope> {
    if let Some(category) = targets.iter().find_map(|target| target.scope.category()) {
        return Some(DiscountScope::Category(category));
    }

    let products: Vec<ProductUuid> = targets
        .iter()
        .filter_map(|target| target.scope.product())
        .collect();

    (!products.is_empty()).then_some(DiscountScope::Products(products))
}

/// A discount with its targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountDetails {
    pub discount: Discount,
    pub targets: Vec<DiscountTarget>,
}

/// Paging and filtering for discount listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountQuery {
    pub take: u32,
    pub skip: u32,

    /// Only discounts that are active at the listing instant
    pub active_only: bool,
}

impl Default for DiscountQuery {
    fn default() -> Self {
        Self {
            take: DEFAULT_PAGE_SIZE,
            skip: 0,
            active_only: false,
        }
    }
}

/// One page of discounts, with the number matching the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountPage {
    pub items: Vec<DiscountDetails>,
    pub count: u64,
}
