//! Categories

pub mod data;
pub mod errors;
pub mod repository;
pub mod service;

pub use errors::CategoriesServiceError;
pub use service::*;
