//! Discounts
//!
//! A [`Discount`] says *how much* is taken off; its [`DiscountTarget`]s say
//! *what* it applies to and with which priority. Lower priority values win.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{categories::CategoryUuid, products::ProductUuid, uuids::TypedUuid};

pub mod targets;
pub mod validation;

pub use targets::{NewDiscountTarget, TargetChanges, TargetUpdate, diff_targets, plan_targets};
pub use validation::{DiscountScope, DiscountValidationError, validate_amount, validate_window};

/// Discount UUID
pub type DiscountUuid = TypedUuid<DiscountMarker>;

/// Marker type for [`DiscountUuid`].
#[derive(Debug)]
pub struct DiscountMarker;

/// Discount Target UUID
pub type DiscountTargetUuid = TypedUuid<DiscountTargetMarker>;

/// Marker type for [`DiscountTargetUuid`].
#[derive(Debug)]
pub struct DiscountTargetMarker;

/// How a discount changes the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscountKind {
    /// `amount` percent off the list price.
    Percent,

    /// `amount` replaces the list price.
    Fixed,
}

impl DiscountKind {
    /// Stable string form, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percent => "PERCENT",
            Self::Fixed => "FIXED",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown discount or target kind.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for DiscountKind {
    type Err = UnknownKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PERCENT" => Ok(Self::Percent),
            "FIXED" => Ok(Self::Fixed),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A discount definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    /// Discount id
    pub uuid: DiscountUuid,

    /// Display name
    pub name: String,

    /// Percent off or fixed price
    pub kind: DiscountKind,

    /// Percentage (for [`DiscountKind::Percent`]) or price (for [`DiscountKind::Fixed`])
    pub amount: Decimal,

    /// Start of the validity window
    pub started_at: Timestamp,

    /// End of the validity window, exclusive
    pub expires_at: Timestamp,

    /// Soft-deleted
    pub is_archived: bool,

    /// Priority the targets were requested with, before any category offset
    pub priority: i32,
}

impl Discount {
    /// Whether the discount applies at `point_in_time`.
    ///
    /// Only archival and expiry are checked; a discount whose window has not
    /// started yet is still considered active.
    pub fn is_active(&self, point_in_time: Timestamp) -> bool {
        !self.is_archived && self.expires_at > point_in_time
    }
}

/// What a discount target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetScope {
    /// A single product
    Product(ProductUuid),

    /// A category and, through inheritance, everything below it
    Category(CategoryUuid),
}

impl TargetScope {
    /// Stable string form of the scope kind, as stored.
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Product(_) => "PRODUCT",
            Self::Category(_) => "CATEGORY",
        }
    }

    /// The product, for product targets.
    pub const fn product(&self) -> Option<ProductUuid> {
        match self {
            Self::Product(product) => Some(*product),
            Self::Category(_) => None,
        }
    }

    /// The category, for category targets.
    pub const fn category(&self) -> Option<CategoryUuid> {
        match self {
            Self::Category(category) => Some(*category),
            Self::Product(_) => None,
        }
    }
}

/// A (discount, scope) pairing with its priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountTarget {
    /// Target id
    pub uuid: DiscountTargetUuid,

    /// Owning discount
    pub discount: DiscountUuid,

    /// What the discount applies to
    pub scope: TargetScope,

    /// Lower wins
    pub priority: i32,
}

/// A target joined with its discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedDiscount {
    /// The target row
    pub target: DiscountTarget,

    /// The discount it belongs to
    pub discount: Discount,
}

impl TargetedDiscount {
    /// Priority of the target.
    pub const fn priority(&self) -> i32 {
        self.target.priority
    }

    /// Whether the discount applies at `point_in_time`.
    pub fn is_active(&self, point_in_time: Timestamp) -> bool {
        self.discount.is_active(point_in_time)
    }
}

/// Keep only discounts active at `point_in_time`, ordered by priority ascending.
///
/// The sort is stable, so equal priorities keep their incoming order.
pub fn active_by_priority(
    discounts: impl IntoIterator<Item = TargetedDiscount>,
    point_in_time: Timestamp,
) -> Vec<TargetedDiscount> {
    let mut active: Vec<TargetedDiscount> = discounts
        .into_iter()
        .filter(|discount| discount.is_active(point_in_time))
        .collect();

    active.sort_by_key(TargetedDiscount::priority);

    active
}

/// Priority stored for category targets.
///
/// Category targets are stored one step ahead of the requested priority (when
/// positive) so that they beat product targets created with the same value.
pub const fn category_priority(priority: i32) -> i32 {
    if priority > 0 { priority - 1 } else { priority }
}
