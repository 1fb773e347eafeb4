//! Pricing

pub mod errors;
pub mod service;
pub mod snapshot;

pub use errors::PricingServiceError;
pub use service::*;
pub use snapshot::PricingSnapshot;
