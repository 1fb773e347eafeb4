//! Discount validation

use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use thiserror::Error;

use super::DiscountKind;
use crate::{categories::CategoryUuid, products::ProductUuid};

/// Reasons a discount definition is rejected before anything is written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountValidationError {
    /// `expires_at` is not after `started_at`.
    #[error("discount must expire after it starts ({started_at} >= {expires_at})")]
    InvalidWindow {
        /// Requested start
        started_at: Timestamp,

        /// Requested expiry
        expires_at: Timestamp,
    },

    /// Neither a category nor any products were given.
    #[error("discount must target a category or at least one product")]
    EmptyScope,

    /// Both a category and products were given.
    #[error("discount cannot target a category and products at the same time")]
    AmbiguousScope,

    /// The same product was listed twice.
    #[error("product {0} is targeted more than once")]
    DuplicateTarget(ProductUuid),

    /// Percentage outside `0..=100` or negative fixed price.
    #[error("{kind} amount {amount} is out of range")]
    AmountOutOfRange {
        /// Discount kind
        kind: DiscountKind,

        /// Rejected amount
        amount: Decimal,
    },
}

/// What a discount applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountScope {
    /// One category target covering the whole subtree
    Category(CategoryUuid),

    /// One target per product
    Products(Vec<ProductUuid>),
}

impl DiscountScope {
    /// Build a scope from the optional category and product list a caller
    /// supplies.
    ///
    /// # Errors
    ///
    /// - [`DiscountValidationError::AmbiguousScope`] if both are given.
    /// - [`DiscountValidationError::EmptyScope`] if neither is given.
    /// - [`DiscountValidationError::DuplicateTarget`] for repeated products.
    pub fn from_parts(
        category: Option<CategoryUuid>,
        products: Vec<ProductUuid>,
    ) -> Result<Self, DiscountValidationError> {
        match (category, products.is_empty()) {
            (Some(_), false) => Err(DiscountValidationError::AmbiguousScope),
            (Some(category), true) => Ok(Self::Category(category)),
            (None, true) => Err(DiscountValidationError::EmptyScope),
            (None, false) => {
                let mut seen = FxHashSet::default();

                if let Some(duplicate) = products.iter().find(|product| !seen.insert(**product)) {
                    return Err(DiscountValidationError::DuplicateTarget(*duplicate));
                }

                Ok(Self::Products(products))
            }
        }
    }
}

/// Check that a discount window is non-empty.
///
/// # Errors
///
/// Returns [`DiscountValidationError::InvalidWindow`] when `expires_at <= started_at`.
pub fn validate_window(
    started_at: Timestamp,
    expires_at: Timestamp,
) -> Result<(), DiscountValidationError> {
    if expires_at <= started_at {
        return Err(DiscountValidationError::InvalidWindow {
            started_at,
            expires_at,
        });
    }

    Ok(())
}

/// Check that `amount` makes sense for `kind`.
///
/// # Errors
///
/// Returns [`DiscountValidationError::AmountOutOfRange`] for percentages
/// outside `0..=100` and for negative fixed prices.
pub fn validate_amount(kind: DiscountKind, amount: Decimal) -> Result<(), DiscountValidationError> {
    let in_range = match kind {
        DiscountKind::Percent => (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&amount),
        DiscountKind::Fixed => amount >= Decimal::ZERO,
    };

    if in_range {
        Ok(())
    } else {
        Err(DiscountValidationError::AmountOutOfRange { kind, amount })
    }
}
