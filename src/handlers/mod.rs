pub mod common;
pub mod forecasts;
pub mod products;
pub mod sales;
pub mod users;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::products::ProductService>,
    pub sales: Arc<crate::services::sales::SaleService>,
    pub users: Arc<crate::services::users::UserService>,
    pub forecasting: Arc<crate::services::forecasting::ForecastingService>,
}

impl AppServices {
    /// Build the service container shared by all handlers.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &AppConfig) -> Self {
        let products = Arc::new(crate::services::products::ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let sales = Arc::new(crate::services::sales::SaleService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let users = Arc::new(crate::services::users::UserService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let forecasting = Arc::new(crate::services::forecasting::ForecastingService::new(
            db_pool,
            event_sender,
            config.forecast_trees,
        ));

        Self {
            products,
            sales,
            users,
            forecasting,
        }
    }
}
