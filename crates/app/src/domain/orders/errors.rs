//! Orders service errors.

use storefront::{orders::OrderAssemblyError, pricing::PricingError};
use thiserror::Error;

use crate::{domain::carts::CartsServiceError, store::StoreError};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("order not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("order already exists")]
    AlreadyExists,

    #[error("order references a missing product")]
    InvalidReference,

    #[error("failed to price order")]
    Pricing(#[from] PricingError),

    #[error("failed to read cart")]
    Cart(#[source] CartsServiceError),

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for OrdersServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::AlreadyExists => Self::AlreadyExists,
            StoreError::InvalidReference => Self::InvalidReference,
            other => Self::Storage(other),
        }
    }
}

impl From<OrderAssemblyError> for OrdersServiceError {
    fn from(error: OrderAssemblyError) -> Self {
        match error {
            OrderAssemblyError::Pricing(error) => Self::Pricing(error),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<CartsServiceError> for OrdersServiceError {
    fn from(error: CartsServiceError) -> Self {
        match error {
            CartsServiceError::InvalidInput(reason) => Self::InvalidInput(reason),
            other => Self::Cart(other),
        }
    }
}
