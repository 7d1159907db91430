//! A small feedforward neural network library with online backpropagation,
//! plus the MNIST CSV ingestion and model persistence around it.

pub mod core;
pub mod dataset;
pub mod error;
pub mod prelude;
pub mod storage;

// Re-export types
pub use crate::core::{
    Activator, ErrorMetric, FFLayer, FFNetwork, FFNetworkBuilder, FunctionRegistry,
};
pub use error::{FFNError, Result};
