use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum FFNError {
    // Construction related errors
    InvalidLayerConfiguration(String),
    InvalidNetworkConfiguration(String),
    InvalidLearningRate(f64),
    EmptyNetwork,

    // Shape errors surfaced during forward/restore
    InvalidInputShape(String),
    InvalidWeightShape(String),
    InvalidBiasShape(String),

    // Load-time validation
    ModelLoadError(String),

    // Dataset ingestion
    DatasetError(String),

    // Collaborator failures, propagated unchanged
    IoError(std::io::Error),
    SerializationError(Box<bincode::ErrorKind>),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
}

impl fmt::Display for FFNError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FFNError::InvalidLayerConfiguration(msg) => {
                write!(f, "Invalid layer configuration: {}", msg)
            }
            FFNError::InvalidNetworkConfiguration(msg) => {
                write!(f, "Invalid network configuration: {}", msg)
            }
            FFNError::InvalidLearningRate(rate) => {
                write!(f, "Learning rate must be positive, got {}", rate)
            }
            FFNError::EmptyNetwork => write!(f, "Network must have at least one layer"),
            FFNError::InvalidInputShape(msg) => write!(f, "Invalid input shape: {}", msg),
            FFNError::InvalidWeightShape(msg) => write!(f, "Invalid weight shape: {}", msg),
            FFNError::InvalidBiasShape(msg) => write!(f, "Invalid bias shape: {}", msg),
            FFNError::ModelLoadError(msg) => write!(f, "Failed to load model: {}", msg),
            FFNError::DatasetError(msg) => write!(f, "Dataset error: {}", msg),
            FFNError::IoError(err) => write!(f, "I/O error: {}", err),
            FFNError::SerializationError(err) => write!(f, "Serialization error: {}", err),
            FFNError::JsonError(err) => write!(f, "JSON error: {}", err),
            FFNError::CsvError(err) => write!(f, "CSV error: {}", err),
        }
    }
}

impl From<std::io::Error> for FFNError {
    fn from(err: std::io::Error) -> FFNError {
        FFNError::IoError(err)
    }
}

impl From<Box<bincode::ErrorKind>> for FFNError {
    fn from(err: Box<bincode::ErrorKind>) -> FFNError {
        FFNError::SerializationError(err)
    }
}

impl From<serde_json::Error> for FFNError {
    fn from(err: serde_json::Error) -> FFNError {
        FFNError::JsonError(err)
    }
}

impl From<csv::Error> for FFNError {
    fn from(err: csv::Error) -> FFNError {
        FFNError::CsvError(err)
    }
}

impl Error for FFNError {}

pub type Result<T> = std::result::Result<T, FFNError>;
