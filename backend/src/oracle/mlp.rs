//! Dense network Policy Oracle (inference only)
//!
//! Loads a small feed-forward classifier exported to JSON and evaluates it on
//! CPU. The usual shape for `P = 200` is `407 → 128 relu → 64 relu → 5 softmax`.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "input_dim": 407,
//!   "layers": [
//!     { "weights": [[...407...], ...128 rows], "bias": [...128...], "activation": "relu" },
//!     { "weights": [[...128...], ...64 rows],  "bias": [...64...],  "activation": "relu" },
//!     { "weights": [[...64...], ...5 rows],    "bias": [...5...],   "activation": "softmax" }
//!   ]
//! }
//! ```
//!
//! Shapes are validated at load time; a file that does not end in exactly
//! five outputs is rejected.

use super::{OracleError, PolicyOracle, NUM_OUTCOME_CLASSES};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors loading a network
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid network: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Shape `[out_dim][in_dim]`
    pub weights: Vec<Vec<f64>>,
    /// Shape `[out_dim]`
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn out_dim(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, x: &[f64]) -> Vec<f64> {
        let mut y: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + b)
            .collect();
        match self.activation {
            Activation::Linear => {}
            Activation::Relu => y.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Softmax => softmax_in_place(&mut y),
        }
        y
    }
}

fn softmax_in_place(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    if sum > 0.0 && sum.is_finite() {
        scores.iter_mut().for_each(|s| *s /= sum);
    }
}

/// Multi-layer perceptron implementing [`PolicyOracle`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpOracle {
    input_dim: usize,
    layers: Vec<DenseLayer>,
}

impl MlpOracle {
    /// Build from layers, validating every shape
    pub fn new(input_dim: usize, layers: Vec<DenseLayer>) -> Result<Self, ModelLoadError> {
        let model = Self { input_dim, layers };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelLoadError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Reject a model built for a different feature width
    pub fn expect_input_width(&self, width: usize) -> Result<(), ModelLoadError> {
        if self.input_dim != width {
            return Err(ModelLoadError::Shape(format!(
                "model input_dim {} != feature width {}",
                self.input_dim, width
            )));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        let shape = |msg: String| Err(ModelLoadError::Shape(msg));

        if self.input_dim == 0 {
            return shape("input_dim must be > 0".to_string());
        }
        if self.layers.is_empty() {
            return shape("layers must not be empty".to_string());
        }

        let mut expected_in = self.input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return shape(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return shape(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return shape(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return shape(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return shape(format!("layer[{idx}] bias contains non-finite values"));
            }
            expected_in = layer.out_dim();
        }

        if expected_in != NUM_OUTCOME_CLASSES {
            return shape(format!(
                "output dim {expected_in} != {NUM_OUTCOME_CLASSES} outcome classes"
            ));
        }
        Ok(())
    }

    /// Forward pass for one feature vector
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f64>, OracleError> {
        if input.len() != self.input_dim {
            return Err(OracleError::WrongInputWidth {
                expected: self.input_dim,
                actual: input.len(),
            });
        }
        let mut x: Vec<f64> = input.iter().map(|v| f64::from(*v)).collect();
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        Ok(x)
    }
}

impl PolicyOracle for MlpOracle {
    fn predict_batch(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f64>>, OracleError> {
        batch.iter().map(|v| self.forward(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2 inputs straight into 5 softmax outputs
    fn tiny_json() -> &'static str {
        r#"{
            "input_dim": 2,
            "layers": [
                {
                    "weights": [[1.0, 0.0], [0.0, 1.0]],
                    "bias": [0.0, 0.0],
                    "activation": "relu"
                },
                {
                    "weights": [[0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [5.0, -5.0]],
                    "bias": [0.0, 0.0, 0.0, 0.0, 0.0],
                    "activation": "softmax"
                }
            ]
        }"#
    }

    #[test]
    fn test_load_and_predict_distribution() {
        let model = MlpOracle::from_json_str(tiny_json()).unwrap();
        let out = model.predict_batch(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(out.len(), 2);
        for dist in &out {
            assert_eq!(dist.len(), 5);
            assert!((dist.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        // first input pushes mass to "fail", second away from it
        assert!(out[0][4] > 0.9);
        assert!(out[1][4] < 0.01);
    }

    #[test]
    fn test_rejects_wrong_output_width() {
        let json = r#"{
            "input_dim": 1,
            "layers": [{ "weights": [[1.0], [1.0]], "bias": [0.0, 0.0], "activation": "softmax" }]
        }"#;
        assert!(matches!(
            MlpOracle::from_json_str(json),
            Err(ModelLoadError::Shape(_))
        ));
    }

    #[test]
    fn test_rejects_ragged_weights() {
        let json = r#"{
            "input_dim": 2,
            "layers": [{ "weights": [[1.0], [1.0], [1.0], [1.0], [1.0]], "bias": [0, 0, 0, 0, 0] }]
        }"#;
        assert!(matches!(
            MlpOracle::from_json_str(json),
            Err(ModelLoadError::Shape(_))
        ));
    }

    #[test]
    fn test_wrong_input_width_is_an_oracle_error() {
        let model = MlpOracle::from_json_str(tiny_json()).unwrap();
        assert_eq!(
            model.predict_batch(&[vec![1.0, 0.0, 0.0]]),
            Err(OracleError::WrongInputWidth {
                expected: 2,
                actual: 3
            })
        );
        assert!(model.expect_input_width(407).is_err());
    }
}
