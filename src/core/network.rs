//! The feedforward network: chained layers, forward inference, and online
//! gradient-descent training.

use std::sync::Arc;

use ndarray::linalg::general_mat_mul;
use ndarray::Array2;

use crate::core::functions::{Activator, ErrorMetric};
use crate::core::layers::FFLayer;
use crate::core::matrices;
use crate::error::{FFNError, Result};

/// An ordered chain of layers plus the per-layer scratch buffers used by
/// backpropagation.
///
/// The scratch buffers are allocated once per network and overwritten on every
/// training step, so a single instance must not be shared between concurrent
/// forward/test/train calls. Parallel training needs one network per worker or
/// external exclusion.
pub struct FFNetwork {
    /// The layers, in strict order; layer k's output feeds layer k+1.
    layers: Vec<FFLayer>,
    /// Used by `train` when no explicit rate is given.
    default_learning_rate: f64,
    /// The cost function driving the training.
    error_metric: Arc<dyn ErrorMetric>,

    // One entry per layer, each sized (layer output x 1).
    /// dCost/dWeightedSum per layer.
    error_terms: Vec<Array2<f64>>,
    /// Activator derivative over the layer's weighted sums.
    activator_derivatives: Vec<Array2<f64>>,
    /// Loss gradient at the output layer, propagated gradient elsewhere.
    cost_gradients: Vec<Array2<f64>>,
}

impl FFNetwork {
    /// Assembles a network from already-built layers, verifying that they
    /// chain by size. `storage::load` and the builder both end up here.
    pub fn from_parts(
        layers: Vec<FFLayer>,
        default_learning_rate: f64,
        error_metric: Arc<dyn ErrorMetric>,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(FFNError::EmptyNetwork);
        }
        if default_learning_rate <= 0.0 {
            return Err(FFNError::InvalidLearningRate(default_learning_rate));
        }
        for pair in layers.windows(2) {
            if pair[1].input_size() != pair[0].output_size() {
                return Err(FFNError::InvalidNetworkConfiguration(format!(
                    "layer input size {} does not match previous output size {}",
                    pair[1].input_size(),
                    pair[0].output_size()
                )));
            }
        }

        let error_terms = layers
            .iter()
            .map(|layer| Array2::zeros((layer.output_size(), 1)))
            .collect::<Vec<_>>();
        let activator_derivatives = error_terms.clone();
        let cost_gradients = error_terms.clone();

        Ok(Self {
            layers,
            default_learning_rate,
            error_metric,
            error_terms,
            activator_derivatives,
            cost_gradients,
        })
    }

    pub fn layer(&self, index: usize) -> &FFLayer {
        &self.layers[index]
    }

    pub fn layers_count(&self) -> usize {
        self.layers.len()
    }

    pub fn default_learning_rate(&self) -> f64 {
        self.default_learning_rate
    }

    pub fn error_metric(&self) -> &Arc<dyn ErrorMetric> {
        &self.error_metric
    }

    /// Chains the layers' forward calls and returns the final activations.
    /// Mutates only scratch state, never weights.
    pub fn forward(&mut self, input: &Array2<f64>) -> Result<Array2<f64>> {
        for index in 0..self.layers.len() {
            if index == 0 {
                self.layers[0].forward(input)?;
            } else {
                // Each layer reads the previous layer's cached activations.
                let (before, rest) = self.layers.split_at_mut(index);
                rest[0].forward(before[index - 1].output())?;
            }
        }
        Ok(self.layers[self.layers.len() - 1].output().clone())
    }

    /// Forward plus cost, without touching the weights.
    pub fn test(
        &mut self,
        input: &Array2<f64>,
        expected: &Array2<f64>,
    ) -> Result<(Array2<f64>, f64)> {
        let output = self.forward(input)?;
        let cost = self.error_metric.base(&output, expected);
        Ok((output, cost))
    }

    /// One online gradient-descent step at the default learning rate.
    pub fn train(
        &mut self,
        input: &Array2<f64>,
        expected: &Array2<f64>,
    ) -> Result<(Array2<f64>, f64)> {
        self.train_with_rate(input, expected, self.default_learning_rate)
    }

    /// One online gradient-descent step: forward, backward error recursion,
    /// then the per-layer parameter update.
    ///
    /// Every error term is computed before any weight is mutated; the backward
    /// step for layer i reads the (transposed) weights of layer i+1, which
    /// must still hold their pre-update values at that point.
    pub fn train_with_rate(
        &mut self,
        input: &Array2<f64>,
        expected: &Array2<f64>,
        learning_rate: f64,
    ) -> Result<(Array2<f64>, f64)> {
        let (output, cost) = self.test(input, expected)?;

        let last = self.layers.len() - 1;
        self.output_error_term(last, expected);
        for index in (0..last).rev() {
            self.propagated_error_term(index);
        }

        for index in 0..self.layers.len() {
            let error_term = &self.error_terms[index];
            self.layers[index].adjust(error_term, learning_rate);
        }

        Ok((output, cost))
    }

    /// Error term of the output layer:
    /// `errorMetric.gradient(output, expected) (*) activator'(weighted sum)`.
    ///
    /// Every step below writes into the preallocated scratch slot for this
    /// layer; nothing is reallocated.
    fn output_error_term(&mut self, index: usize, expected: &Array2<f64>) {
        let layer = &self.layers[index];
        self.error_metric
            .gradient(layer.output(), expected, &mut self.cost_gradients[index]);
        layer
            .activator()
            .derivative(layer.weighted_sum(), &mut self.activator_derivatives[index]);
        matrices::hadamard_into(
            &self.cost_gradients[index],
            &self.activator_derivatives[index],
            &mut self.error_terms[index],
        );
    }

    /// Error term of an interior layer, recursing on the following layer:
    /// `(W[i+1]^T * error[i+1]) (*) activator'(weighted sum[i])`.
    fn propagated_error_term(&mut self, index: usize) {
        {
            let next = &self.layers[index + 1];
            general_mat_mul(
                1.0,
                &next.weights().t(),
                &self.error_terms[index + 1],
                0.0,
                &mut self.cost_gradients[index],
            );
        }

        let layer = &self.layers[index];
        layer
            .activator()
            .derivative(layer.weighted_sum(), &mut self.activator_derivatives[index]);
        matrices::hadamard_into(
            &self.cost_gradients[index],
            &self.activator_derivatives[index],
            &mut self.error_terms[index],
        );
    }
}

/// Accumulates `(output size, activator)` pairs on top of a declared input
/// size; each layer's input size is the previous layer's output size.
pub struct FFNetworkBuilder {
    default_learning_rate: f64,
    input_size: usize,
    error_metric: Arc<dyn ErrorMetric>,
    layers: Vec<(usize, Arc<dyn Activator>)>,
}

impl FFNetworkBuilder {
    pub fn new(
        default_learning_rate: f64,
        input_size: usize,
        error_metric: Arc<dyn ErrorMetric>,
    ) -> Self {
        Self {
            default_learning_rate,
            input_size,
            error_metric,
            layers: Vec::new(),
        }
    }

    pub fn add_layer(mut self, output_size: usize, activator: Arc<dyn Activator>) -> Self {
        self.layers.push((output_size, activator));
        self
    }

    pub fn build(self) -> Result<FFNetwork> {
        if self.input_size == 0 {
            return Err(FFNError::InvalidNetworkConfiguration(
                "input size must be greater than 0".to_string(),
            ));
        }
        if self.layers.is_empty() {
            return Err(FFNError::EmptyNetwork);
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut input_size = self.input_size;
        for (output_size, activator) in self.layers {
            layers.push(FFLayer::new(input_size, output_size, activator)?);
            input_size = output_size;
        }
        FFNetwork::from_parts(layers, self.default_learning_rate, self.error_metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::{HalfSquaredError, Linear, Sigmoid};
    use ndarray::array;

    fn builder(input_size: usize) -> FFNetworkBuilder {
        FFNetworkBuilder::new(0.1, input_size, Arc::new(HalfSquaredError))
    }

    #[test]
    fn build_requires_at_least_one_layer() {
        assert!(matches!(builder(4).build(), Err(FFNError::EmptyNetwork)));
    }

    #[test]
    fn build_rejects_zero_input_size() {
        let result = builder(0).add_layer(3, Arc::new(Sigmoid)).build();
        assert!(matches!(
            result,
            Err(FFNError::InvalidNetworkConfiguration(_))
        ));
    }

    #[test]
    fn build_rejects_nonpositive_learning_rate() {
        let result = FFNetworkBuilder::new(0.0, 4, Arc::new(HalfSquaredError))
            .add_layer(3, Arc::new(Sigmoid))
            .build();
        assert!(matches!(result, Err(FFNError::InvalidLearningRate(_))));
    }

    #[test]
    fn layers_are_chained_by_size() {
        let network = builder(4)
            .add_layer(6, Arc::new(Sigmoid))
            .add_layer(2, Arc::new(Sigmoid))
            .build()
            .unwrap();

        assert_eq!(network.layers_count(), 2);
        assert_eq!(network.layer(0).input_size(), 4);
        assert_eq!(network.layer(0).output_size(), 6);
        assert_eq!(network.layer(1).input_size(), 6);
        assert_eq!(network.layer(1).output_size(), 2);
    }

    #[test]
    fn from_parts_rejects_broken_chain() {
        let first = FFLayer::new(4, 6, Arc::new(Sigmoid)).unwrap();
        let second = FFLayer::new(5, 2, Arc::new(Sigmoid)).unwrap();
        let result = FFNetwork::from_parts(vec![first, second], 0.1, Arc::new(HalfSquaredError));
        assert!(matches!(
            result,
            Err(FFNError::InvalidNetworkConfiguration(_))
        ));
    }

    #[test]
    fn forward_chains_layers() {
        // Two linear layers with known parameters give a hand-checkable
        // composition.
        let first = FFLayer::from_parts(
            2,
            2,
            Arc::new(Linear),
            array![[1.0, 0.0], [0.0, 1.0]],
            array![[1.0], [1.0]],
        )
        .unwrap();
        let second = FFLayer::from_parts(
            2,
            1,
            Arc::new(Linear),
            array![[2.0, 3.0]],
            array![[-1.0]],
        )
        .unwrap();
        let mut network =
            FFNetwork::from_parts(vec![first, second], 0.1, Arc::new(HalfSquaredError)).unwrap();

        // (1+1)*2 + (2+1)*3 - 1 = 12
        let output = network.forward(&array![[1.0], [2.0]]).unwrap();
        assert_eq!(output, array![[12.0]]);
    }

    #[test]
    fn test_reports_cost_without_changing_weights() {
        let mut network = builder(3)
            .add_layer(4, Arc::new(Sigmoid))
            .add_layer(2, Arc::new(Sigmoid))
            .build()
            .unwrap();
        let weights_before: Vec<Array2<f64>> = (0..network.layers_count())
            .map(|i| network.layer(i).weights().clone())
            .collect();

        let input = array![[0.2], [0.4], [0.6]];
        let expected = array![[0.99], [0.01]];
        let (output, cost) = network.test(&input, &expected).unwrap();

        assert_eq!(output.dim(), (2, 1));
        assert!(cost >= 0.0);
        for (index, before) in weights_before.iter().enumerate() {
            assert_eq!(network.layer(index).weights(), before);
        }
    }

    #[test]
    fn single_linear_layer_update_is_exact() {
        // One 1x1 linear layer makes the whole update rule hand-computable:
        // output = 2, gradient = 2, derivative = 1, so error = 2 and with
        // rate 0.1 the weight moves 2 * 1 * 0.1 and the bias 2 * 0.1.
        let layer =
            FFLayer::from_parts(1, 1, Arc::new(Linear), array![[2.0]], array![[0.0]]).unwrap();
        let mut network =
            FFNetwork::from_parts(vec![layer], 0.1, Arc::new(HalfSquaredError)).unwrap();

        let (output, cost) = network.train(&array![[1.0]], &array![[0.0]]).unwrap();

        assert_eq!(output, array![[2.0]]);
        assert!((cost - 2.0).abs() < 1e-12);
        assert!((network.layer(0).weights()[[0, 0]] - 1.8).abs() < 1e-12);
        assert!((network.layer(0).bias()[[0, 0]] - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn backward_pass_reads_pre_update_weights() {
        // Two 1x1 linear layers with known parameters. The interior error term
        // must be propagated through the second layer's original weight (2.0),
        // not the already-adjusted one (1.8), so every post-update parameter
        // is exact:
        //   forward: 1 -> 1 -> 2, expected 0
        //   error[1] = 2, error[0] = 2.0 * 2 = 4
        //   w1 = 2 - 0.1*2*1 = 1.8, b1 = -0.2
        //   w0 = 1 - 0.1*4*1 = 0.6, b0 = -0.4
        // An interleaved update would instead give error[0] = 3.6 and
        // w0 = 0.64.
        let first =
            FFLayer::from_parts(1, 1, Arc::new(Linear), array![[1.0]], array![[0.0]]).unwrap();
        let second =
            FFLayer::from_parts(1, 1, Arc::new(Linear), array![[2.0]], array![[0.0]]).unwrap();
        let mut network =
            FFNetwork::from_parts(vec![first, second], 0.1, Arc::new(HalfSquaredError)).unwrap();

        let (output, _) = network.train(&array![[1.0]], &array![[0.0]]).unwrap();

        assert_eq!(output, array![[2.0]]);
        assert!((network.layer(1).weights()[[0, 0]] - 1.8).abs() < 1e-12);
        assert!((network.layer(1).bias()[[0, 0]] - (-0.2)).abs() < 1e-12);
        assert!((network.layer(0).weights()[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((network.layer(0).bias()[[0, 0]] - (-0.4)).abs() < 1e-12);
    }

    #[test]
    fn training_returns_pre_update_output() {
        let mut network = builder(2)
            .add_layer(3, Arc::new(Sigmoid))
            .add_layer(1, Arc::new(Sigmoid))
            .build()
            .unwrap();

        let input = array![[0.5], [0.25]];
        let expected = array![[0.9]];

        let (before, _) = network.test(&input, &expected).unwrap();
        let (reported, _) = network.train(&input, &expected).unwrap();
        assert_eq!(before, reported);
    }

    #[test]
    fn repeated_training_decreases_cost() {
        let mut network = builder(2)
            .add_layer(2, Arc::new(Sigmoid))
            .add_layer(1, Arc::new(Sigmoid))
            .build()
            .unwrap();

        let input = array![[0.05], [0.95]];
        let expected = array![[0.75]];

        let (_, initial_cost) = network.test(&input, &expected).unwrap();
        let mut final_cost = initial_cost;
        for _ in 0..200 {
            let (_, cost) = network.train(&input, &expected).unwrap();
            final_cost = cost;
        }

        assert!(
            final_cost < initial_cost,
            "cost did not decrease: {} -> {}",
            initial_cost,
            final_cost
        );
    }
}
