// src/core.rs
pub mod functions;
pub mod layers;
pub mod matrices;
pub mod network;

// Re-export commonly used items
pub use functions::{Activator, ErrorMetric, FunctionRegistry, HalfSquaredError, Sigmoid};
pub use layers::FFLayer;
pub use network::{FFNetwork, FFNetworkBuilder};
