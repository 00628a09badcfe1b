//! Domain types for shelfcast

pub mod forecast;
pub mod frame;
pub mod row;

pub use forecast::{ForecastPoint, ForecastResult};
pub use frame::{SalesFrame, TrainingFrame, ValidationFrame};
pub use row::{Category, TimeSeriesRow};
