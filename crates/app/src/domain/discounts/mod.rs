//! Discounts

pub mod data;
pub mod errors;
pub mod repository;
pub mod service;

pub use errors::DiscountsServiceError;
pub use service::*;
