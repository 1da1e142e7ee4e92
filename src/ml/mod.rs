pub mod forecasting;

pub use forecasting::{ForestConfig, RandomForestRegressor};
