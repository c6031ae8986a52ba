//! Checkpoint - Save/Load Run State
//!
//! Captures an orchestrator between periods so a run can be paused and
//! resumed. Only period boundaries are checkpointable: the book and the
//! per-period flags are rebuilt by the next reset, so a boundary snapshot
//! needs nothing but agent assets, ZI valuations, and the RNG state.
//!
//! # Critical Invariants
//!
//! - **Determinism**: a restored run continues with exactly the records the
//!   uninterrupted run would have written
//! - **Asset Conservation**: total agent asset equals `initial_asset × agents`
//! - **Config Matching**: a snapshot can only be restored with the config that produced it

use crate::core::period::{PeriodClock, PeriodPhase};
use crate::models::agent::{Agent, AgentId, AgentKind, Strategy, ZiValuation};
use crate::models::state::MarketState;
use crate::oracle::PolicyOracle;
use crate::orchestrator::engine::{Orchestrator, SimulationConfig, SimulationError};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const CONSERVATION_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Orchestrator state at a period boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// SHA256 hash of the config that produced this state
    pub config_hash: String,

    /// Periods fully run; the next period is `completed_periods + 1`
    pub completed_periods: usize,

    /// Phase at capture time (must not be `Stepping`)
    pub phase: PeriodPhase,

    /// RNG state (CRITICAL for determinism)
    pub rng_state: u64,

    /// Steps run before the snapshot
    pub steps_run: usize,

    pub agents: Vec<AgentSnapshot>,

    /// Sum of agent assets at capture time
    pub total_asset: f64,
}

/// Agent state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub kind: AgentKind,
    pub asset: f64,
    pub has_traded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<ZiValuation>,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        AgentSnapshot {
            id: agent.id(),
            kind: agent.kind(),
            asset: agent.asset(),
            has_traded: agent.has_traded(),
            valuation: agent.valuation().copied(),
        }
    }
}

impl From<AgentSnapshot> for Agent {
    fn from(snapshot: AgentSnapshot) -> Self {
        let strategy = match (snapshot.kind, snapshot.valuation) {
            (AgentKind::ZeroIntelligence, valuation) => {
                Strategy::ZeroIntelligence(valuation.unwrap_or_default())
            }
            (kind, _) => Strategy::for_kind(kind),
        };
        Agent::from_snapshot(snapshot.id, snapshot.asset, snapshot.has_traded, strategy)
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys, so the hash does not
/// depend on field order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate snapshot integrity
///
/// Checks:
/// - asset conservation against `expected_total_asset`
/// - the recorded total matches the agents
/// - agent ids are the registry indices `0..n`
/// - the snapshot was taken at a period boundary
pub fn validate_snapshot(
    snapshot: &StateSnapshot,
    expected_total_asset: f64,
) -> Result<(), SimulationError> {
    if snapshot.phase == PeriodPhase::Stepping {
        return Err(SimulationError::Checkpoint(
            "Snapshot was taken mid-period".to_string(),
        ));
    }

    let total: f64 = snapshot.agents.iter().map(|a| a.asset).sum();
    if (total - expected_total_asset).abs() > CONSERVATION_TOLERANCE {
        return Err(SimulationError::Checkpoint(format!(
            "Asset conservation violated: expected {}, got {}",
            expected_total_asset, total
        )));
    }
    if (total - snapshot.total_asset).abs() > CONSERVATION_TOLERANCE {
        return Err(SimulationError::Checkpoint(format!(
            "Recorded total {} does not match agents' total {}",
            snapshot.total_asset, total
        )));
    }

    for (i, agent) in snapshot.agents.iter().enumerate() {
        if agent.id != AgentId(i) {
            return Err(SimulationError::Checkpoint(format!(
                "Agent at position {} has id {}",
                i, agent.id
            )));
        }
    }

    Ok(())
}

// ============================================================================
// Save / Restore
// ============================================================================

impl Orchestrator {
    /// Snapshot the run at the current period boundary
    pub fn checkpoint(&self) -> Result<StateSnapshot, SimulationError> {
        if self.clock.phase() == PeriodPhase::Stepping {
            return Err(SimulationError::Checkpoint(format!(
                "Cannot checkpoint while period {} is stepping",
                self.clock.period()
            )));
        }

        Ok(StateSnapshot {
            config_hash: compute_config_hash(&self.config)?,
            completed_periods: self.clock.completed_periods(),
            phase: self.clock.phase(),
            rng_state: self.rng.get_state(),
            steps_run: self.steps_run,
            agents: self.state.agents().iter().map(AgentSnapshot::from).collect(),
            total_asset: self.state.total_asset(),
        })
    }

    /// Rebuild an orchestrator from `snapshot`
    ///
    /// The trade log of the restored orchestrator starts empty and continues
    /// with the first period after the snapshot.
    pub fn restore(
        config: SimulationConfig,
        snapshot: StateSnapshot,
        oracle: Option<Arc<dyn PolicyOracle>>,
    ) -> Result<Self, SimulationError> {
        let domain = Self::validate_config(&config, oracle.is_some())?;

        let hash = compute_config_hash(&config)?;
        if hash != snapshot.config_hash {
            return Err(SimulationError::Checkpoint(
                "Config hash mismatch: snapshot was taken with a different config".to_string(),
            ));
        }

        let expected_total = config.initial_asset * config.agent_mix.total() as f64;
        validate_snapshot(&snapshot, expected_total)?;

        if snapshot.completed_periods > config.num_periods {
            return Err(SimulationError::Checkpoint(format!(
                "Snapshot completed {} periods, config has {}",
                snapshot.completed_periods, config.num_periods
            )));
        }
        let kinds_match = snapshot.agents.len() == config.agent_mix.total()
            && snapshot
                .agents
                .iter()
                .zip(config.agent_mix.registry_kinds())
                .all(|(a, kind)| a.kind == kind);
        if !kinds_match {
            return Err(SimulationError::Checkpoint(
                "Snapshot agents do not match the configured agent mix".to_string(),
            ));
        }

        let agents: Vec<Agent> = snapshot.agents.into_iter().map(Agent::from).collect();
        let state =
            MarketState::new(agents).map_err(|e| SimulationError::Checkpoint(e.to_string()))?;
        let mut orchestrator = Self::new_restored(
            config,
            domain,
            state,
            RngManager::new(snapshot.rng_state),
            oracle,
        );
        orchestrator.clock = PeriodClock::resume_after(
            orchestrator.config.num_periods,
            orchestrator.config.steps_per_period,
            snapshot.completed_periods,
        );
        orchestrator.steps_run = snapshot.steps_run;
        Ok(orchestrator)
    }
}
