//! Persistence-backed storefront services over the pricing engine.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod logging;
pub mod store;

#[cfg(test)]
mod test;
