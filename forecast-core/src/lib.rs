//! Core library for the `forecast` CLI.
//!
//! This crate defines:
//! - Single-shot location resolution over a platform capability
//! - The Open-Meteo hourly temperature client with failure classification
//! - Conversion of the raw hourly arrays into a chartable series
//! - The acquisition pipeline tying the three together
//!
//! It is used by `forecast-cli`, but any front end that can render a
//! [`ForecastSeries`] or present an [`AcquisitionFailure`] can drive it.

pub mod acquisition;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod location;
pub mod model;
pub mod series;

pub use acquisition::Acquisition;
pub use client::{FetchOptions, ForecastApi, OpenMeteoClient};
pub use config::Config;
pub use error::{AcquisitionFailure, FetchFailure, LocationFailure, Recovery, TransportCause};
pub use location::{FixedPosition, LocationPlatform, LocationResolver};
pub use model::{Coordinate, ForecastPoint, ForecastSeries, RawForecastResponse, RawHourly};
pub use series::to_series;
