//! Products service errors.

use storefront::{categories::CategoryTreeError, pricing::PricingError};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ProductsServiceError {
    #[error("product not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("product already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("failed to price product")]
    Pricing(#[from] PricingError),

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for ProductsServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::AlreadyExists => Self::AlreadyExists,
            StoreError::InvalidReference => Self::InvalidReference,
            other => Self::Storage(other),
        }
    }
}

impl From<CategoryTreeError> for ProductsServiceError {
    fn from(error: CategoryTreeError) -> Self {
        match error {
            CategoryTreeError::NotFound(_) => Self::NotFound,
        }
    }
}
