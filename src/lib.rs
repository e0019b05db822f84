//! Telco Churn - Customer churn prediction pipeline
//!
//! End-to-end workflow for the Telco customer churn dataset: preprocessing
//! raw tables into a fixed feature schema, sweeping a small model grid with
//! local experiment tracking, promoting the best candidate to a model
//! registry, and serving it over HTTP.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`preprocessing`] - Charges coercion, forward fill, one-hot encoding, scaling
//! - [`training`] - Model grid, train/validation split, selection, promotion
//! - [`schema`] - Declarative feature schema and single-record encoding
//!
//! ## Infrastructure
//! - [`data`] - Revisioned dataset snapshots (CSV, Parquet)
//! - [`tracking`] - Local file-based experiment tracking
//! - [`registry`] - Local model registry with aliases
//!
//! ## Services
//! - [`server`] - HTTP prediction API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod preprocessing;
pub mod schema;
pub mod training;

pub mod data;
pub mod registry;
pub mod tracking;

pub mod cli;
pub mod server;

pub mod config;

pub use config::PipelineConfig;
pub use error::{ChurnError, Result};
