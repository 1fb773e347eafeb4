//! Stores
//!
//! Services talk to persistence through a [`Store`], which hands out
//! transactions implementing every domain repository. [`crate::database::Db`]
//! is the PostgreSQL store.

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

use crate::domain::{
    carts::repository::CartsRepository, categories::repository::CategoriesRepository,
    discounts::repository::DiscountsRepository, orders::repository::OrdersRepository,
    products::repository::ProductsRepository,
};

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("record not found")]
    NotFound,

    /// A row with the same key already exists.
    #[error("record already exists")]
    AlreadyExists,

    /// A referenced row does not exist, or the row is still referenced.
    #[error("related record not found or still referenced")]
    InvalidReference,

    /// A required column was left empty.
    #[error("missing required data")]
    MissingRequiredData,

    /// A value violates a constraint.
    #[error("invalid data")]
    InvalidData,

    /// Any other database failure.
    #[error("storage error")]
    Sql(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

/// A source of transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Transaction type handed out by this store.
    type Tx: StoreTransaction;

    /// Start a transaction. Nothing it writes is visible until it commits;
    /// dropping it without committing discards every write.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// A transaction spanning every domain repository.
#[async_trait]
pub trait StoreTransaction:
    CategoriesRepository
    + ProductsRepository
    + DiscountsRepository
    + CartsRepository
    + OrdersRepository
    + Send
    + Sized
{
    /// Make the transaction's writes visible.
    async fn commit(self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn other_errors_are_wrapped() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Sql(sqlx::Error::PoolTimedOut)
        ));
    }
}
