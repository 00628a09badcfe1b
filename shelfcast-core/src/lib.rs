//! Shelfcast Core — domain types, holiday calendars, forecasting models.
//!
//! This crate holds everything that is independent of orchestration:
//! - Domain types (sales rows, frames, forecast results)
//! - Holiday calendars and providers (static, CSV, built-in regional sets)
//! - The `Forecaster` / `FittedModel` seam and the default decomposition model

pub mod domain;
pub mod holidays;
pub mod model;
