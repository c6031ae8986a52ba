//! Training-data generation for the policy oracle
//!
//! A zero-intelligence-only market stream without periods or trade limits:
//! every step a random trader quotes a random side, and the (board, action)
//! pair is labelled with the [`OutcomeClass`] the book assigns it. The
//! features are encoded against the book *before* the action is applied.
//!
//! Traders draw `cost ∈ [0, P]` and `value ∈ [cost, P]` once, at creation.
//! Each step draws, in order: trader index, role, quote (`[0, value]` for a
//! buyer, `[cost, P]` for a seller).
//!
//! # Example
//!
//! ```rust
//! use market_simulator_core_rs::dataset::{generate, DatasetConfig};
//!
//! let set = generate(&DatasetConfig {
//!     price_max: 20,
//!     num_traders: 10,
//!     num_steps: 100,
//!     rng_seed: 1,
//! })
//! .unwrap();
//! assert_eq!(set.len(), 100);
//! assert_eq!(set.class_counts().iter().sum::<usize>(), 100);
//! ```

use crate::models::action::Action;
use crate::models::agent::AgentId;
use crate::models::book::{OrderBook, Resolution};
use crate::models::outcome::{OutcomeClass, StepResult};
use crate::models::price::{Price, PriceDomain};
use crate::oracle::{EncodingError, FeatureEncoder, NUM_OUTCOME_CLASSES};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Invalid dataset config: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub price_max: Price,
    pub num_traders: usize,
    pub num_steps: usize,
    pub rng_seed: u64,
}

/// Labelled (board, action) feature vectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<OutcomeClass>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Samples per class, in class-index order
    pub fn class_counts(&self) -> [usize; NUM_OUTCOME_CLASSES] {
        let mut counts = [0; NUM_OUTCOME_CLASSES];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }
}

/// Fixed valuation of a dataset trader
#[derive(Debug, Clone, Copy)]
struct Trader {
    cost: i64,
    value: i64,
}

/// Generate a labelled training set
pub fn generate(config: &DatasetConfig) -> Result<TrainingSet, DatasetError> {
    let domain =
        PriceDomain::new(config.price_max).map_err(|e| DatasetError::InvalidConfig(e.to_string()))?;
    if config.num_traders == 0 {
        return Err(DatasetError::InvalidConfig(
            "num_traders must be > 0".to_string(),
        ));
    }

    let max = domain.max() as i64;
    let mut rng = RngManager::new(config.rng_seed);
    let traders: Vec<Trader> = (0..config.num_traders)
        .map(|_| {
            let cost = rng.range_inclusive(0, max);
            let value = rng.range_inclusive(cost, max);
            Trader { cost, value }
        })
        .collect();

    let encoder = FeatureEncoder::new(domain);
    let mut book = OrderBook::new();
    let mut set = TrainingSet {
        features: Vec::with_capacity(config.num_steps),
        labels: Vec::with_capacity(config.num_steps),
    };

    debug!(
        traders = config.num_traders,
        steps = config.num_steps,
        width = encoder.width(),
        "generating training data"
    );

    for _ in 0..config.num_steps {
        let index = rng.choose_index(traders.len());
        let trader = traders[index];
        let action = if rng.coin_flip() {
            Action::buy(rng.range_inclusive(0, trader.value) as Price)
        } else {
            Action::sell(rng.range_inclusive(trader.cost, max) as Price)
        };

        set.features.push(encoder.encode(book.snapshot(), action)?);

        let result = match book.submit(AgentId(index), action, |_| true) {
            Resolution::Executed(_) => StepResult::Executed,
            Resolution::Overwrite => StepResult::Overwrite,
            Resolution::Fail(_) => StepResult::Fail,
        };
        set.labels.push(OutcomeClass::from_step(action.role, result));
    }

    let counts = set.class_counts();
    info!(
        samples = set.len(),
        sell_overwrite = counts[0],
        buy_overwrite = counts[1],
        sell_executed = counts[2],
        buy_executed = counts[3],
        fail = counts[4],
        "training data generated"
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> DatasetConfig {
        DatasetConfig {
            price_max: 20,
            num_traders: 8,
            num_steps: 300,
            rng_seed: seed,
        }
    }

    #[test]
    fn test_first_label_is_an_overwrite() {
        let set = generate(&config(3)).unwrap();
        assert!(matches!(
            set.labels[0],
            OutcomeClass::BuyOverwrite | OutcomeClass::SellOverwrite
        ));
        // the first vector is encoded against an empty book
        assert_eq!(set.features[0][0], 1.0);
    }

    #[test]
    fn test_same_seed_same_set() {
        assert_eq!(generate(&config(11)).unwrap(), generate(&config(11)).unwrap());
        assert_ne!(
            generate(&config(11)).unwrap().labels,
            generate(&config(12)).unwrap().labels
        );
    }

    #[test]
    fn test_zero_traders_rejected() {
        let mut cfg = config(1);
        cfg.num_traders = 0;
        assert!(matches!(generate(&cfg), Err(DatasetError::InvalidConfig(_))));
    }
}
