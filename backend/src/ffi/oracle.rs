//! Python callable as a Policy Oracle
//!
//! Any callable taking a list of float lists and returning one list of five
//! probabilities per input works, e.g. a Keras model's `predict` wrapped to
//! return `.tolist()`.

use pyo3::prelude::*;

use crate::oracle::{OracleError, PolicyOracle};

pub struct PyOracle {
    callable: Py<PyAny>,
}

impl PyOracle {
    pub fn new(callable: Py<PyAny>) -> Self {
        Self { callable }
    }
}

impl PolicyOracle for PyOracle {
    fn predict_batch(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f64>>, OracleError> {
        Python::with_gil(|py| {
            let output = self
                .callable
                .bind(py)
                .call1((batch.to_vec(),))
                .map_err(|e| OracleError::Backend(format!("Python oracle raised: {}", e)))?;
            output
                .extract::<Vec<Vec<f64>>>()
                .map_err(|e| OracleError::Backend(format!("Python oracle returned: {}", e)))
        })
    }
}
