//! App Context

use std::sync::Arc;

use rusty_money::iso::Currency;
use thiserror::Error;

use crate::{
    config::{ConfigError, StoreConfig},
    database::{self, Db},
    domain::{
        carts::{CartsService, StoreCartsService},
        categories::{CategoriesService, StoreCategoriesService},
        discounts::{DiscountsService, StoreDiscountsService},
        orders::{OrdersService, StoreOrdersService},
        pricing::{PricingService, StorePricingService},
        products::{ProductsService, StoreProductsService},
    },
    store::Store,
};

/// Errors raised while building the [`AppContext`].
#[derive(Debug, Error)]
pub enum AppInitError {
    /// A setting failed validation.
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    /// The database could not be reached.
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// Every service, wired to one store.
#[derive(Clone)]
pub struct AppContext {
    pub categories: Arc<dyn CategoriesService>,
    pub products: Arc<dyn ProductsService>,
    pub pricing: Arc<dyn PricingService>,
    pub discounts: Arc<dyn DiscountsService>,
    pub carts: Arc<dyn CartsService>,
    pub orders: Arc<dyn OrdersService>,
}

impl AppContext {
    /// Wire every service to `store`.
    pub fn from_store<S: Store + Clone>(
        store: &S,
        currency: &'static Currency,
        cart_max_items: usize,
    ) -> Self {
        let carts: Arc<dyn CartsService> = Arc::new(StoreCartsService::new(
            store.clone(),
            currency,
            cart_max_items,
        ));

        Self {
            categories: Arc::new(StoreCategoriesService::new(store.clone())),
            products: Arc::new(StoreProductsService::new(store.clone(), currency)),
            pricing: Arc::new(StorePricingService::new(store.clone(), currency)),
            discounts: Arc::new(StoreDiscountsService::new(store.clone())),
            orders: Arc::new(StoreOrdersService::new(store.clone(), Arc::clone(&carts))),
            carts,
        }
    }

    /// Build application context from store configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or establishing a
    /// database connection fails.
    pub async fn from_config(config: &StoreConfig) -> Result<Self, AppInitError> {
        let currency = config.currency()?;
        let cart_max_items = config.cart_max_items()?;

        let pool = database::connect(&config.database_url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_store(&Db::new(pool), currency, cart_max_items))
    }
}
