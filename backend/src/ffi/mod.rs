//! Python bindings (feature `pyo3`)
//!
//! Exposes a market run as `Simulation` and the dataset generator as
//! `generate_training_data`. Configs cross the boundary as JSON strings with
//! the same shape as the Rust serde types.

pub mod oracle;
pub mod simulation;
