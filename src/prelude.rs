pub use std::sync::Arc;

pub use ndarray::{array, Array2};

pub use crate::error::*;

// Internal re-exports
pub use crate::core::{
    functions::{
        Activator, ErrorMetric, FunctionRegistry, HalfSquaredError, Linear, Relu, Sigmoid, Tanh,
    },
    layers::FFLayer,
    matrices,
    network::{FFNetwork, FFNetworkBuilder},
};
pub use crate::dataset::{MnistReader, MnistRecord};
pub use crate::storage;
