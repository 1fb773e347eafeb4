//! Carts service errors.

use storefront::pricing::PricingError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("cart, line or product not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cart already holds the maximum of {max} lines")]
    CapacityExceeded { max: usize },

    #[error("cart already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("failed to price cart")]
    Pricing(#[from] PricingError),

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for CartsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::AlreadyExists => Self::AlreadyExists,
            StoreError::InvalidReference => Self::InvalidReference,
            other => Self::Storage(other),
        }
    }
}
