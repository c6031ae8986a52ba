//! Policy Oracle
//!
//! The learned component consulted by policy agents. An oracle maps a batch of
//! encoded (board, action) vectors to one probability distribution per vector
//! over the five [`OutcomeClass`]es, in class-index order:
//!
//! ```text
//! [sell-overwrite, buy-overwrite, sell-executed, buy-executed, fail]
//! ```
//!
//! The core never depends on a concrete model. Anything implementing
//! [`PolicyOracle`] can be injected, including plain closures, which keeps the
//! engine testable with fixed distributions.
//!
//! A malformed answer (wrong batch size, wrong class count, non-finite value)
//! is an error for the whole run; it is never defaulted.

pub mod encoding;
pub mod mlp;

pub use crate::models::outcome::OutcomeClass;
pub use encoding::{EncodingError, FeatureEncoder};
pub use mlp::{MlpOracle, ModelLoadError};

use thiserror::Error;

/// Number of outcome classes in every oracle distribution
pub const NUM_OUTCOME_CLASSES: usize = 5;

/// Errors from an oracle call
#[derive(Debug, Error, PartialEq)]
pub enum OracleError {
    #[error("Oracle returned {actual} distributions for a batch of {expected}")]
    WrongBatchSize { expected: usize, actual: usize },

    #[error("Distribution {index} has {actual} classes, expected 5")]
    WrongWidth { index: usize, actual: usize },

    #[error("Distribution {index} holds a non-finite probability")]
    NonFinite { index: usize },

    #[error("Input vector has width {actual}, model expects {expected}")]
    WrongInputWidth { expected: usize, actual: usize },

    #[error("Oracle backend failed: {0}")]
    Backend(String),
}

/// Outcome-class estimator for candidate actions
///
/// Implementations must return exactly one distribution per input vector.
/// Callers check the shape with [`validate_distributions`].
pub trait PolicyOracle: Send + Sync {
    fn predict_batch(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f64>>, OracleError>;
}

impl<F> PolicyOracle for F
where
    F: Fn(&[Vec<f32>]) -> Result<Vec<Vec<f64>>, OracleError> + Send + Sync,
{
    fn predict_batch(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f64>>, OracleError> {
        self(batch)
    }
}

/// Oracle answering the same distribution for every input
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantOracle {
    distribution: [f64; NUM_OUTCOME_CLASSES],
}

impl ConstantOracle {
    pub fn new(distribution: [f64; NUM_OUTCOME_CLASSES]) -> Self {
        Self { distribution }
    }

    /// Uniform over all five classes
    pub fn uniform() -> Self {
        Self::new([1.0 / NUM_OUTCOME_CLASSES as f64; NUM_OUTCOME_CLASSES])
    }
}

impl PolicyOracle for ConstantOracle {
    fn predict_batch(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f64>>, OracleError> {
        Ok(batch.iter().map(|_| self.distribution.to_vec()).collect())
    }
}

/// Check that `output` answers a batch of `expected` vectors
pub fn validate_distributions(expected: usize, output: &[Vec<f64>]) -> Result<(), OracleError> {
    if output.len() != expected {
        return Err(OracleError::WrongBatchSize {
            expected,
            actual: output.len(),
        });
    }
    for (index, dist) in output.iter().enumerate() {
        if dist.len() != NUM_OUTCOME_CLASSES {
            return Err(OracleError::WrongWidth {
                index,
                actual: dist.len(),
            });
        }
        if dist.iter().any(|p| !p.is_finite()) {
            return Err(OracleError::NonFinite { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_an_oracle() {
        let oracle = |batch: &[Vec<f32>]| -> Result<Vec<Vec<f64>>, OracleError> {
            Ok(batch.iter().map(|v| vec![v[0] as f64; 5]).collect())
        };
        let out = oracle.predict_batch(&[vec![0.5], vec![1.0]]).unwrap();
        assert_eq!(out[1], vec![1.0; 5]);
    }

    #[test]
    fn test_constant_oracle_matches_batch() {
        let oracle = ConstantOracle::uniform();
        let out = oracle.predict_batch(&[vec![], vec![], vec![]]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(validate_distributions(3, &out).is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_output() {
        assert_eq!(
            validate_distributions(2, &[vec![0.2; 5]]),
            Err(OracleError::WrongBatchSize {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            validate_distributions(1, &[vec![0.25; 4]]),
            Err(OracleError::WrongWidth {
                index: 0,
                actual: 4
            })
        );
        assert_eq!(
            validate_distributions(1, &[vec![0.1, 0.1, f64::NAN, 0.1, 0.1]]),
            Err(OracleError::NonFinite { index: 0 })
        );
    }
}
