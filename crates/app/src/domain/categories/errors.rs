//! Categories service errors.

use storefront::categories::{CategoryTreeError, HierarchyError};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CategoriesServiceError {
    #[error("category not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("category already exists")]
    AlreadyExists,

    #[error("category is referenced or references a missing category")]
    InvalidReference,

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for CategoriesServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::AlreadyExists => Self::AlreadyExists,
            StoreError::InvalidReference => Self::InvalidReference,
            other => Self::Storage(other),
        }
    }
}

impl From<HierarchyError> for CategoriesServiceError {
    fn from(error: HierarchyError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

impl From<CategoryTreeError> for CategoriesServiceError {
    fn from(error: CategoryTreeError) -> Self {
        match error {
            CategoryTreeError::NotFound(_) => Self::NotFound,
        }
    }
}
