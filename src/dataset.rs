//! MNIST CSV ingestion.
//!
//! Each row is `label, p0, p1, ..., p783` with pixels in 0..=255. Records are
//! produced lazily; reopening the file restarts the sequence.

use std::fs::File;
use std::path::Path;

use ndarray::Array2;

use crate::core::matrices;
use crate::error::{FFNError, Result};

pub const INPUT_SIZE: usize = 784;
pub const CLASSES: usize = 10;

/// One labelled example, already normalized for the network: pixels scaled
/// into [0.01, 1.0] and the target one-hot encoded with 0.01/0.99.
pub struct MnistRecord {
    pub label: usize,
    /// 784 x 1 column vector.
    pub input: Array2<f64>,
    /// 10 x 1 column vector.
    pub target: Array2<f64>,
}

pub struct MnistReader {
    reader: csv::Reader<File>,
}

impl MnistReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        Ok(Self { reader })
    }
}

impl Iterator for MnistReader {
    type Item = Result<MnistRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = csv::StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(parse_record(&record)),
            Ok(false) => None,
            Err(err) => Some(Err(err.into())),
        }
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<MnistRecord> {
    if record.len() != INPUT_SIZE + 1 {
        return Err(FFNError::DatasetError(format!(
            "expected {} fields, got {}",
            INPUT_SIZE + 1,
            record.len()
        )));
    }

    let label: usize = record[0]
        .trim()
        .parse()
        .map_err(|_| FFNError::DatasetError(format!("invalid label {:?}", &record[0])))?;
    if label >= CLASSES {
        return Err(FFNError::DatasetError(format!(
            "label {} out of range",
            label
        )));
    }

    let mut pixels = Vec::with_capacity(INPUT_SIZE);
    for field in record.iter().skip(1) {
        let value: f64 = field
            .trim()
            .parse()
            .map_err(|_| FFNError::DatasetError(format!("invalid pixel {:?}", field)))?;
        pixels.push(value / 255.0 * 0.99 + 0.01);
    }
    let input = Array2::from_shape_vec((INPUT_SIZE, 1), pixels)
        .map_err(|err| FFNError::DatasetError(err.to_string()))?;

    let mut target = matrices::fill_column(CLASSES, 0.01);
    target[[label, 0]] = 0.99;

    Ok(MnistRecord {
        label,
        input,
        target,
    })
}
