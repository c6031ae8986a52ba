//! Market Simulator Core - Rust Engine
//!
//! Continuous double-auction market with a single-slot order book,
//! heterogeneous traders, and deterministic period-based execution.
//!
//! # Architecture
//!
//! - **core**: Period clock (Reset → Stepping → Exhausted)
//! - **models**: Domain types (prices, agents, book, trade log, state)
//! - **matching**: Action resolution and trade settlement
//! - **policy**: Agent decision strategies (zero-intelligence, rule, learned)
//! - **oracle**: Policy oracle contract, feature encoding, MLP inference
//! - **orchestrator**: Main run loop and checkpoints
//! - **dataset**: Labelled training data for the oracle
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. The book holds at most one resting quote
//! 2. Every trade moves the execution price from buyer to seller (closed economy)
//! 3. All randomness is deterministic (one seeded stream per run)

// Module declarations
pub mod core;
pub mod dataset;
pub mod matching;
pub mod models;
pub mod oracle;
pub mod orchestrator;
pub mod policy;
pub mod rng;

// Re-exports for convenience
pub use core::period::{PeriodClock, PeriodPhase};
pub use dataset::{DatasetConfig, TrainingSet};
pub use matching::{apply_action, MatchOutcome, PassiveFill};
pub use models::{
    action::{Action, Role},
    agent::{Agent, AgentId, AgentKind, Strategy, ZiValuation},
    book::{BoardSnapshot, BookState, FailReason, OrderBook, Quote, Resolution},
    outcome::{ActionBreakdown, OutcomeClass, StepOutcome, StepResult, TradeLog},
    price::{Price, PriceDomain, PriceError},
    state::{MarketState, StateError},
};
pub use oracle::{
    ConstantOracle, EncodingError, FeatureEncoder, MlpOracle, ModelLoadError, OracleError,
    PolicyOracle, NUM_OUTCOME_CLASSES,
};
pub use orchestrator::{
    AgentMix, Orchestrator, RunSummary, SimulationConfig, SimulationError, StateSnapshot,
};
pub use policy::DecisionError;
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn market_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulation::PySimulation>()?;
    m.add_function(wrap_pyfunction!(ffi::simulation::generate_training_data, m)?)?;
    Ok(())
}
