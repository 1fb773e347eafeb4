//! Pricing service errors.

use storefront::pricing::PricingError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PricingServiceError {
    #[error("product not found")]
    NotFound,

    #[error("failed to price product")]
    Pricing(#[from] PricingError),

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for PricingServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}
