//! Discounts service errors.

use storefront::discounts::DiscountValidationError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DiscountsServiceError {
    #[error("discount not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("discount already exists")]
    AlreadyExists,

    #[error("discount target references a missing product or category")]
    InvalidReference,

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for DiscountsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::AlreadyExists => Self::AlreadyExists,
            StoreError::InvalidReference => Self::InvalidReference,
            other => Self::Storage(other),
        }
    }
}

impl From<DiscountValidationError> for DiscountsServiceError {
    fn from(error: DiscountValidationError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}
