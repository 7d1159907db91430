//! Activation and error-metric strategies, addressable by name.
//!
//! Strategies are stateless and shared as `Arc<dyn ...>`, so a single instance
//! can back any number of layers and networks. They compute into
//! caller-provided buffers, which is what lets the training loop reuse its
//! scratch state instead of allocating per step.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{Array2, Zip};

/// A simple mathematical function and its derivative. Both operate
/// element-wise, so `z` and `output` always have matching dimensions.
pub trait Activator: Send + Sync {
    /// Function name (registry key).
    fn name(&self) -> &'static str;

    /// The base function over the weighted sums, computed into `output`.
    fn base(&self, z: &Array2<f64>, output: &mut Array2<f64>);

    /// The element-wise derivative at the given pre-activation values,
    /// computed into `output`.
    fn derivative(&self, z: &Array2<f64>, output: &mut Array2<f64>);
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[derive(Debug, Clone, Copy)]
pub struct Sigmoid;

impl Activator for Sigmoid {
    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn base(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        Zip::from(output).and(z).for_each(|output, &z| *output = sigmoid(z));
    }

    fn derivative(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        // Closed form s * (1 - s) over the re-evaluated base.
        Zip::from(output).and(z).for_each(|output, &z| {
            let s = sigmoid(z);
            *output = s * (1.0 - s);
        });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Relu;

impl Activator for Relu {
    fn name(&self) -> &'static str {
        "Relu"
    }

    fn base(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        Zip::from(output)
            .and(z)
            .for_each(|output, &z| *output = if z >= 0.0 { z } else { 0.0 });
    }

    fn derivative(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        Zip::from(output)
            .and(z)
            .for_each(|output, &z| *output = if z >= 0.0 { 1.0 } else { 0.0 });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tanh;

impl Activator for Tanh {
    fn name(&self) -> &'static str {
        "Tanh"
    }

    fn base(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        Zip::from(output).and(z).for_each(|output, &z| *output = z.tanh());
    }

    fn derivative(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        Zip::from(output).and(z).for_each(|output, &z| {
            let t = z.tanh();
            *output = 1.0 - t * t;
        });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Linear;

impl Activator for Linear {
    fn name(&self) -> &'static str {
        "Linear"
    }

    fn base(&self, z: &Array2<f64>, output: &mut Array2<f64>) {
        output.assign(z);
    }

    fn derivative(&self, _z: &Array2<f64>, output: &mut Array2<f64>) {
        output.fill(1.0);
    }
}

/// Cost function for a single training example: a scalar cost plus its
/// gradient with respect to the output activations.
///
/// `base` is intentionally not batch-averaged. For batches of N examples the
/// caller must sum the per-example values and divide by N.
pub trait ErrorMetric: Send + Sync {
    /// Function name (registry key).
    fn name(&self) -> &'static str;

    /// The scalar cost for one example.
    fn base(&self, actual: &Array2<f64>, expected: &Array2<f64>) -> f64;

    /// The element-wise gradient of the cost with respect to `actual`,
    /// computed into `output`.
    fn gradient(&self, actual: &Array2<f64>, expected: &Array2<f64>, output: &mut Array2<f64>);
}

/// `1/2 * SUM((actual - expected)^2)`, whose gradient with respect to the
/// actual values is the plain difference. The `actual - expected` orientation
/// matters: combined with the subtractive update rule it descends the cost
/// surface.
#[derive(Debug, Clone, Copy)]
pub struct HalfSquaredError;

impl ErrorMetric for HalfSquaredError {
    fn name(&self) -> &'static str {
        "HalfSquaredError"
    }

    fn base(&self, actual: &Array2<f64>, expected: &Array2<f64>) -> f64 {
        Zip::from(actual).and(expected).fold(0.0, |sum, &a, &e| {
            let difference = a - e;
            sum + difference * difference
        }) / 2.0
    }

    fn gradient(&self, actual: &Array2<f64>, expected: &Array2<f64>, output: &mut Array2<f64>) {
        Zip::from(output)
            .and(actual)
            .and(expected)
            .for_each(|output, &a, &e| *output = a - e);
    }
}

/// Constructed-once lookup tables for activators and error metrics.
///
/// Lookups by unknown name fall back to the per-table default instead of
/// failing; persisted models therefore always resolve to a usable function.
pub struct FunctionRegistry {
    activators: HashMap<&'static str, Arc<dyn Activator>>,
    error_metrics: HashMap<&'static str, Arc<dyn ErrorMetric>>,
    default_activator: Arc<dyn Activator>,
    default_error_metric: Arc<dyn ErrorMetric>,
}

impl FunctionRegistry {
    /// The standard table: `Sigmoid` (default), `Relu`, `Tanh`, `Linear`, and
    /// `HalfSquaredError` (default).
    pub fn standard() -> Self {
        let mut registry = Self {
            activators: HashMap::new(),
            error_metrics: HashMap::new(),
            default_activator: Arc::new(Sigmoid),
            default_error_metric: Arc::new(HalfSquaredError),
        };
        registry.register_activator(Arc::new(Sigmoid));
        registry.register_activator(Arc::new(Relu));
        registry.register_activator(Arc::new(Tanh));
        registry.register_activator(Arc::new(Linear));
        registry.register_error_metric(Arc::new(HalfSquaredError));
        registry
    }

    /// Adds an activator under its own name. Returns false (and keeps the
    /// existing entry) when the name is already taken.
    pub fn register_activator(&mut self, activator: Arc<dyn Activator>) -> bool {
        let name = activator.name();
        if self.activators.contains_key(name) {
            return false;
        }
        self.activators.insert(name, activator);
        true
    }

    pub fn register_error_metric(&mut self, error_metric: Arc<dyn ErrorMetric>) -> bool {
        let name = error_metric.name();
        if self.error_metrics.contains_key(name) {
            return false;
        }
        self.error_metrics.insert(name, error_metric);
        true
    }

    pub fn activator(&self, name: &str) -> Arc<dyn Activator> {
        self.activators
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default_activator.clone())
    }

    pub fn error_metric(&self, name: &str) -> Arc<dyn ErrorMetric> {
        self.error_metrics
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default_error_metric.clone())
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
