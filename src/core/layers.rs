//! A single fully-connected layer.

use std::sync::Arc;

use ndarray::linalg::general_mat_mul;
use ndarray::Array2;

use crate::core::functions::Activator;
use crate::core::matrices;
use crate::error::{FFNError, Result};

/// One dense layer: weights, bias, the activator, and the scratch state
/// written by the most recent forward call.
///
/// The scratch buffers (`input`, `weighted_sum`, `output`) are undefined until
/// the first forward call and are overwritten by every subsequent one. The
/// backward pass reads them for the example that was just forwarded.
pub struct FFLayer {
    input_size: usize,
    output_size: usize,
    activator: Arc<dyn Activator>,

    /// Current weights, output_size x input_size.
    weights: Array2<f64>,
    /// Current biases, output_size x 1.
    bias: Array2<f64>,

    /// Last forwarded input, input_size x 1.
    input: Array2<f64>,
    /// weights * input + bias, output_size x 1.
    weighted_sum: Array2<f64>,
    /// activator(weighted_sum), output_size x 1.
    output: Array2<f64>,
}

impl FFLayer {
    /// A fresh layer with weights and bias drawn from uniform noise capped at
    /// `1 / sqrt(input_size)`, keeping early weighted sums at a sane variance.
    pub fn new(
        input_size: usize,
        output_size: usize,
        activator: Arc<dyn Activator>,
    ) -> Result<Self> {
        Self::check_sizes(input_size, output_size)?;
        let bound = 1.0 / (input_size as f64).sqrt();
        let weights = matrices::noise(output_size, input_size, bound);
        let bias = matrices::noise_column(output_size, bound);
        Ok(Self::assemble(input_size, output_size, activator, weights, bias))
    }

    /// Restores a layer from already-known parameters, verifying that they
    /// have exactly the declared shapes.
    pub fn from_parts(
        input_size: usize,
        output_size: usize,
        activator: Arc<dyn Activator>,
        weights: Array2<f64>,
        bias: Array2<f64>,
    ) -> Result<Self> {
        Self::check_sizes(input_size, output_size)?;
        if weights.dim() != (output_size, input_size) {
            return Err(FFNError::InvalidWeightShape(format!(
                "expected {}x{}, got {}x{}",
                output_size,
                input_size,
                weights.nrows(),
                weights.ncols()
            )));
        }
        if bias.dim() != (output_size, 1) {
            return Err(FFNError::InvalidBiasShape(format!(
                "expected {}x1, got {}x{}",
                output_size,
                bias.nrows(),
                bias.ncols()
            )));
        }
        Ok(Self::assemble(input_size, output_size, activator, weights, bias))
    }

    fn check_sizes(input_size: usize, output_size: usize) -> Result<()> {
        if input_size == 0 || output_size == 0 {
            return Err(FFNError::InvalidLayerConfiguration(format!(
                "layer dimensions must be greater than 0, got {}x{}",
                output_size, input_size
            )));
        }
        Ok(())
    }

    fn assemble(
        input_size: usize,
        output_size: usize,
        activator: Arc<dyn Activator>,
        weights: Array2<f64>,
        bias: Array2<f64>,
    ) -> Self {
        Self {
            input_size,
            output_size,
            activator,
            weights,
            bias,
            input: Array2::zeros((input_size, 1)),
            weighted_sum: Array2::zeros((output_size, 1)),
            output: Array2::zeros((output_size, 1)),
        }
    }

    /// Runs the layer over one column vector: caches the input, computes the
    /// weighted sum and the activations, and exposes the activations.
    pub fn forward(&mut self, input: &Array2<f64>) -> Result<&Array2<f64>> {
        if input.dim() != (self.input_size, 1) {
            return Err(FFNError::InvalidInputShape(format!(
                "layer expects {}x1 input, got {}x{}",
                self.input_size,
                input.nrows(),
                input.ncols()
            )));
        }
        self.input.assign(input);
        // weighted_sum = weights * input + bias, computed into the scratch
        // slot so no buffer is reallocated per call.
        self.weighted_sum.assign(&self.bias);
        general_mat_mul(1.0, &self.weights, &self.input, 1.0, &mut self.weighted_sum);
        self.activator.base(&self.weighted_sum, &mut self.output);
        Ok(&self.output)
    }

    /// Subtracts the scaled error term from the parameters in place, using
    /// the input cached by the forward call for this example.
    pub(crate) fn adjust(&mut self, error_term: &Array2<f64>, learning_rate: f64) {
        // weights -= rate * (error * input^T), the cartesian product of
        // errors and inputs.
        general_mat_mul(
            -learning_rate,
            error_term,
            &self.input.t(),
            1.0,
            &mut self.weights,
        );
        self.bias.scaled_add(-learning_rate, error_term);
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn activator(&self) -> &Arc<dyn Activator> {
        &self.activator
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }

    /// The input cached by the most recent forward call.
    pub fn input(&self) -> &Array2<f64> {
        &self.input
    }

    /// The weighted sum computed by the most recent forward call.
    pub fn weighted_sum(&self) -> &Array2<f64> {
        &self.weighted_sum
    }

    /// The activations computed by the most recent forward call.
    pub fn output(&self) -> &Array2<f64> {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::{Linear, Sigmoid};
    use ndarray::array;

    #[test]
    fn new_layer_has_bounded_noise() {
        let layer = FFLayer::new(16, 4, Arc::new(Sigmoid)).unwrap();
        let bound = 1.0 / (16.0f64).sqrt();

        assert_eq!(layer.weights().dim(), (4, 16));
        assert_eq!(layer.bias().dim(), (4, 1));
        assert!(layer.weights().iter().all(|&w| w.abs() <= bound));
        assert!(layer.bias().iter().all(|&b| b.abs() <= bound));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(FFLayer::new(0, 3, Arc::new(Sigmoid)).is_err());
        assert!(FFLayer::new(3, 0, Arc::new(Sigmoid)).is_err());
    }

    #[test]
    fn from_parts_validates_shapes() {
        let weights = array![[1.0, 2.0], [3.0, 4.0]];
        let bias = array![[0.5], [-0.5]];
        let ok = FFLayer::from_parts(2, 2, Arc::new(Sigmoid), weights.clone(), bias.clone());
        assert!(ok.is_ok());

        // Transposed weights do not fit a 3-input layer.
        let result = FFLayer::from_parts(3, 2, Arc::new(Sigmoid), weights.clone(), bias.clone());
        assert!(matches!(result, Err(FFNError::InvalidWeightShape(_))));

        let wide_bias = array![[0.5, 1.0], [-0.5, 1.0]];
        let result = FFLayer::from_parts(2, 2, Arc::new(Sigmoid), weights, wide_bias);
        assert!(matches!(result, Err(FFNError::InvalidBiasShape(_))));
    }

    #[test]
    fn forward_computes_weighted_sum_and_activations() {
        let weights = array![[1.0, 2.0], [3.0, 4.0]];
        let bias = array![[0.5], [-0.5]];
        let mut layer = FFLayer::from_parts(2, 2, Arc::new(Linear), weights, bias).unwrap();

        let input = array![[1.0], [1.0]];
        let output = layer.forward(&input).unwrap().clone();

        assert_eq!(output, array![[3.5], [6.5]]);
        assert_eq!(layer.input(), &input);
        assert_eq!(layer.weighted_sum(), &array![[3.5], [6.5]]);
        assert_eq!(layer.output(), &output);
    }

    #[test]
    fn forward_is_deterministic() {
        let mut layer = FFLayer::new(5, 3, Arc::new(Sigmoid)).unwrap();
        let input = array![[0.1], [0.2], [0.3], [0.4], [0.5]];

        let first = layer.forward(&input).unwrap().clone();
        let second = layer.forward(&input).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn forward_rejects_mismatched_input() {
        let mut layer = FFLayer::new(4, 2, Arc::new(Sigmoid)).unwrap();

        let too_short = array![[1.0], [2.0]];
        assert!(matches!(
            layer.forward(&too_short),
            Err(FFNError::InvalidInputShape(_))
        ));

        let row_vector = array![[1.0, 2.0, 3.0, 4.0]];
        assert!(matches!(
            layer.forward(&row_vector),
            Err(FFNError::InvalidInputShape(_))
        ));
    }
}
