//! Model persistence: a JSON envelope describing the network topology, with
//! each parameter tensor carried as an opaque bincode blob.
//!
//! Loading validates the envelope and every blob before any network is
//! assembled; a failed load never yields a half-initialized network.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::core::functions::FunctionRegistry;
use crate::core::layers::FFLayer;
use crate::core::network::FFNetwork;
use crate::error::{FFNError, Result};

pub const MODEL_EXTENSION: &str = "ffnet";

#[derive(Serialize, Deserialize)]
struct SerializedLayer {
    activator: String,
    output_size: usize,
    weights: Vec<u8>,
    bias: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct SerializedNetwork {
    error_metric: String,
    default_learning_rate: f64,
    input_size: usize,
    layers: Vec<SerializedLayer>,
}

fn with_model_extension(path: &Path) -> PathBuf {
    if path
        .extension()
        .map_or(false, |extension| extension == MODEL_EXTENSION)
    {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(MODEL_EXTENSION);
        PathBuf::from(name)
    }
}

fn encode_matrix(matrix: &Array2<f64>) -> Result<Vec<u8>> {
    let (rows, columns) = matrix.dim();
    let elements: Vec<f64> = matrix.iter().copied().collect();
    Ok(bincode::serialize(&(rows, columns, elements))?)
}

fn decode_matrix(
    expected_rows: usize,
    expected_columns: usize,
    data: &[u8],
    element: &str,
) -> Result<Array2<f64>> {
    let (rows, columns, elements): (usize, usize, Vec<f64>) = bincode::deserialize(data)?;
    if rows != expected_rows || columns != expected_columns || elements.len() != rows * columns {
        return Err(FFNError::ModelLoadError(format!(
            "layer {} size mismatch between declared and unmarshaled",
            element
        )));
    }
    Array2::from_shape_vec((rows, columns), elements)
        .map_err(|err| FFNError::ModelLoadError(err.to_string()))
}

fn serialize(network: &FFNetwork) -> Result<SerializedNetwork> {
    let mut layers = Vec::with_capacity(network.layers_count());
    for index in 0..network.layers_count() {
        let layer = network.layer(index);
        layers.push(SerializedLayer {
            activator: layer.activator().name().to_string(),
            output_size: layer.output_size(),
            weights: encode_matrix(layer.weights())?,
            bias: encode_matrix(layer.bias())?,
        });
    }
    Ok(SerializedNetwork {
        error_metric: network.error_metric().name().to_string(),
        default_learning_rate: network.default_learning_rate(),
        input_size: network.layer(0).input_size(),
        layers,
    })
}

fn restore(serialized: SerializedNetwork, registry: &FunctionRegistry) -> Result<FFNetwork> {
    if serialized.input_size < 1 {
        return Err(FFNError::ModelLoadError(
            "input size must be >= 1".to_string(),
        ));
    }
    if serialized.layers.is_empty() {
        return Err(FFNError::ModelLoadError(
            "at least one layer must be present".to_string(),
        ));
    }
    if serialized.default_learning_rate <= 0.0 {
        return Err(FFNError::InvalidLearningRate(
            serialized.default_learning_rate,
        ));
    }

    let mut layers = Vec::with_capacity(serialized.layers.len());
    let mut input_size = serialized.input_size;
    for (index, layer) in serialized.layers.iter().enumerate() {
        if layer.output_size < 1 {
            return Err(FFNError::ModelLoadError(format!(
                "layer {}: output size must be >= 1",
                index
            )));
        }
        let weights = decode_matrix(layer.output_size, input_size, &layer.weights, "weights")?;
        let bias = decode_matrix(layer.output_size, 1, &layer.bias, "biases")?;
        let activator = registry.activator(&layer.activator);
        layers.push(FFLayer::from_parts(
            input_size,
            layer.output_size,
            activator,
            weights,
            bias,
        )?);
        // Output size is the new input size.
        input_size = layer.output_size;
    }

    FFNetwork::from_parts(
        layers,
        serialized.default_learning_rate,
        registry.error_metric(&serialized.error_metric),
    )
}

/// Writes the network to `path` (the `.ffnet` extension is appended when
/// missing), one descriptor per layer in forward order.
pub fn save<P: AsRef<Path>>(network: &FFNetwork, path: P) -> Result<()> {
    let serialized = serialize(network)?;
    let file = File::create(with_model_extension(path.as_ref()))?;
    serde_json::to_writer(BufWriter::new(file), &serialized)?;
    Ok(())
}

/// Reads a network back, resolving function names through `registry`.
pub fn load<P: AsRef<Path>>(path: P, registry: &FunctionRegistry) -> Result<FFNetwork> {
    let file = File::open(with_model_extension(path.as_ref()))?;
    let serialized: SerializedNetwork = serde_json::from_reader(BufReader::new(file))?;
    restore(serialized, registry)
}
