//! Orchestrator - main market loop
//!
//! Owns a run and drives it period by period. See `engine.rs` for the loop
//! and `checkpoint.rs` for save/restore at period boundaries.

pub mod checkpoint;
pub mod engine;

// Re-export main types for convenience
pub use engine::{
    AgentAsset, AgentMix, Exhaustion, Orchestrator, PeriodResult, RunSummary, SimulationConfig,
    SimulationError, StepReport, StepStatus,
};

// Re-export checkpoint types
pub use checkpoint::{compute_config_hash, validate_snapshot, AgentSnapshot, StateSnapshot};
