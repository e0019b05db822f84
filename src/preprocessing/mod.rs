//! Data preprocessing module
//!
//! Turns the raw Telco churn table into the encoded, training-ready
//! representation: numeric coercion, forward-fill imputation, one-hot
//! encoding with a dropped reference level, and standardization. The
//! pipeline also emits the `FeatureSchema` that serving must reproduce.

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use pipeline::{sample_fraction, ChurnPreprocessor, PreprocessOutput};
pub use scaler::StandardScaler;
