//! Core library for the `wind` CLI.
//!
//! This crate defines:
//! - Vertical wind-profile math (power law, logarithmic law)
//! - Abstraction over historical data sources (NASA POWER, Open-Meteo)
//! - Normalization of provider-native records into canonical observations
//! - Height extrapolation on top of normalized observations
//!
//! It is used by `wind-cli`, but can also be reused by other binaries or services.

pub mod availability;
pub mod config;
pub mod error;
pub mod extrapolate;
pub mod model;
pub mod normalize;
pub mod profile;
pub mod source;

pub use config::Config;
pub use error::WindError;
pub use model::{FetchRequest, FetchResult, Observation};
pub use source::{HistoricalSource, SourceKey};
