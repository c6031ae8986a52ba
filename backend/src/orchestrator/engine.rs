//! Orchestrator Engine
//!
//! Drives a market run period by period:
//!
//! ```text
//! For each period p:
//! 1. Reset: agents reset in registry order (ZI valuations redrawn), book emptied,
//!    availability pool refilled
//! 2. Stepping, at most steps_per_period times:
//!    a. stop early if every agent has traded
//!    b. pick an untraded agent uniformly at random
//!    c. the agent decides an action (oracle call for policy agents)
//!    d. matching resolves it: executed / overwrite / fail
//!    e. append the outcome (and the passive counterparty record) to the trade log
//! 3. Exhausted: period closes; next period or end of run
//! ```
//!
//! # Determinism
//!
//! All randomness comes from one seeded [`RngManager`] owned by the
//! orchestrator. Same config + same oracle answers = identical trade log.
//!
//! # Example
//!
//! ```rust
//! use market_simulator_core_rs::orchestrator::{AgentMix, Orchestrator, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     price_max: 10,
//!     num_periods: 2,
//!     steps_per_period: 6,
//!     rng_seed: 12345,
//!     initial_asset: 500.0,
//!     agent_mix: AgentMix::zero_intelligence_only(3),
//! };
//!
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! let summary = orchestrator.run().unwrap();
//! assert_eq!(summary.periods_run, 2);
//! assert!(summary.steps_run <= 12);
//! ```

use crate::core::period::{PeriodClock, PeriodPhase};
use crate::matching::step_market;
use crate::models::action::Action;
use crate::models::agent::{Agent, AgentId, AgentKind};
use crate::models::book::FailReason;
use crate::models::outcome::{ActionBreakdown, StepOutcome, StepResult, TradeLog};
use crate::models::price::{Price, PriceDomain};
use crate::models::state::MarketState;
use crate::oracle::PolicyOracle;
use crate::policy::{decide, DecisionContext, DecisionError};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Periods between progress log lines
const PROGRESS_EVERY: usize = 10;

// ============================================================================
// Configuration Types
// ============================================================================

fn default_initial_asset() -> f64 {
    500.0
}

/// Complete run configuration
///
/// # Fields
///
/// * `price_max` - Upper bound `P` of the price domain `[0, P]`
/// * `num_periods` - Number of trading periods
/// * `steps_per_period` - Step budget of each period
/// * `rng_seed` - Seed for the run's single random stream
/// * `initial_asset` - Starting asset of every agent
/// * `agent_mix` - How many agents of each kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub price_max: Price,
    pub num_periods: usize,
    pub steps_per_period: usize,
    pub rng_seed: u64,
    #[serde(default = "default_initial_asset")]
    pub initial_asset: f64,
    pub agent_mix: AgentMix,
}

impl SimulationConfig {
    /// Config with two steps per agent and the default starting asset
    pub fn new(price_max: Price, num_periods: usize, agent_mix: AgentMix, rng_seed: u64) -> Self {
        Self {
            price_max,
            num_periods,
            steps_per_period: agent_mix.total() * 2,
            rng_seed,
            initial_asset: default_initial_asset(),
            agent_mix,
        }
    }
}

/// Agent counts per kind
///
/// Registry ids are assigned rule agents first, then policy agents, then
/// zero-intelligence agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMix {
    #[serde(default)]
    pub zero_intelligence: usize,
    #[serde(default)]
    pub rule: usize,
    #[serde(default)]
    pub policy: usize,
}

impl AgentMix {
    pub fn zero_intelligence_only(count: usize) -> Self {
        Self {
            zero_intelligence: count,
            ..Self::default()
        }
    }

    /// `total` agents, `floor(total * fraction)` of them of `kind`, the rest ZI
    ///
    /// `fraction` is clamped to `[0, 1]`.
    pub fn with_share(total: usize, kind: AgentKind, fraction: f64) -> Self {
        let special = ((total as f64) * fraction.clamp(0.0, 1.0)).floor() as usize;
        let special = special.min(total);
        let mut mix = Self::zero_intelligence_only(total - special);
        match kind {
            AgentKind::ZeroIntelligence => mix.zero_intelligence += special,
            AgentKind::Rule => mix.rule = special,
            AgentKind::Policy => mix.policy = special,
        }
        mix
    }

    pub fn total(&self) -> usize {
        self.zero_intelligence + self.rule + self.policy
    }

    pub fn count(&self, kind: AgentKind) -> usize {
        match kind {
            AgentKind::ZeroIntelligence => self.zero_intelligence,
            AgentKind::Rule => self.rule,
            AgentKind::Policy => self.policy,
        }
    }

    /// Agent kinds in registry order
    pub fn registry_kinds(&self) -> impl Iterator<Item = AgentKind> + '_ {
        [AgentKind::Rule, AgentKind::Policy, AgentKind::ZeroIntelligence]
            .into_iter()
            .flat_map(move |kind| std::iter::repeat(kind).take(self.count(kind)))
    }

    /// Build the agent registry
    pub fn build_agents(&self, initial_asset: f64) -> Vec<Agent> {
        self.registry_kinds()
            .enumerate()
            .map(|(i, kind)| Agent::new(AgentId(i), kind, initial_asset))
            .collect()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Why a period stopped stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exhaustion {
    /// The period used all of its steps
    StepBudget,
    /// No agent was left untraded
    AllTraded,
}

/// One executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub period: usize,
    pub step: usize,
    pub agent_id: AgentId,
    pub action: Action,
    pub result: StepResult,
    /// Why the action failed, if it did
    pub fail_reason: Option<FailReason>,
    /// Counterparty of an execution
    pub counterparty: Option<AgentId>,
}

/// Result of [`Orchestrator::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Stepped(StepReport),
    /// The period closed instead of stepping
    Exhausted(Exhaustion),
}

/// Summary of one period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodResult {
    pub period: usize,
    pub steps: usize,
    pub executions: usize,
    pub exhaustion: Exhaustion,
}

/// Final asset of one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentAsset {
    pub id: AgentId,
    pub kind: AgentKind,
    pub asset: f64,
}

/// Summary of a complete run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub periods_run: usize,
    pub steps_run: usize,
    pub executions: usize,
    pub final_assets: Vec<AgentAsset>,
    pub breakdown: BTreeMap<AgentKind, ActionBreakdown>,
    /// SHA-256 of the trade log
    pub fingerprint: String,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns one market run: state, clock, random stream, oracle and trade log
pub struct Orchestrator {
    pub(crate) config: SimulationConfig,
    pub(crate) domain: PriceDomain,
    pub(crate) state: MarketState,
    pub(crate) clock: PeriodClock,
    pub(crate) rng: RngManager,
    pub(crate) oracle: Option<Arc<dyn PolicyOracle>>,
    trade_log: TradeLog,
    /// Steps across all periods (since construction or restore)
    pub(crate) steps_run: usize,
    /// Executions in the current period
    period_executions: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("period", &self.clock.period())
            .field("phase", &self.clock.phase())
            .field("has_oracle", &self.oracle.is_some())
            .field("log_len", &self.trade_log.len())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator without an oracle
    ///
    /// Fails if the mix contains policy agents.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::build(config, None)
    }

    /// Create an orchestrator whose policy agents consult `oracle`
    pub fn with_oracle(
        config: SimulationConfig,
        oracle: Arc<dyn PolicyOracle>,
    ) -> Result<Self, SimulationError> {
        Self::build(config, Some(oracle))
    }

    fn build(
        config: SimulationConfig,
        oracle: Option<Arc<dyn PolicyOracle>>,
    ) -> Result<Self, SimulationError> {
        let domain = Self::validate_config(&config, oracle.is_some())?;
        let agents = config.agent_mix.build_agents(config.initial_asset);
        let state =
            MarketState::new(agents).map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            domain,
            state,
            clock: PeriodClock::new(config.num_periods, config.steps_per_period),
            rng: RngManager::new(config.rng_seed),
            oracle,
            trade_log: TradeLog::new(),
            steps_run: 0,
            period_executions: 0,
            config,
        })
    }

    /// Assemble an orchestrator from restored parts, positioned before period 1
    pub(crate) fn new_restored(
        config: SimulationConfig,
        domain: PriceDomain,
        state: MarketState,
        rng: RngManager,
        oracle: Option<Arc<dyn PolicyOracle>>,
    ) -> Self {
        Self {
            domain,
            state,
            clock: PeriodClock::new(config.num_periods, config.steps_per_period),
            rng,
            oracle,
            trade_log: TradeLog::new(),
            steps_run: 0,
            period_executions: 0,
            config,
        }
    }

    /// Validate configuration and return its price domain
    pub(crate) fn validate_config(
        config: &SimulationConfig,
        has_oracle: bool,
    ) -> Result<PriceDomain, SimulationError> {
        let domain = PriceDomain::new(config.price_max)
            .map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;

        let mix = &config.agent_mix;
        if mix.rule + mix.policy > 0 && !domain.has_interior() {
            return Err(SimulationError::InvalidConfig(format!(
                "price_max must be >= 2 for rule or policy agents, got {}",
                config.price_max
            )));
        }
        if config.num_periods == 0 {
            return Err(SimulationError::InvalidConfig(
                "num_periods must be > 0".to_string(),
            ));
        }
        if config.steps_per_period == 0 {
            return Err(SimulationError::InvalidConfig(
                "steps_per_period must be > 0".to_string(),
            ));
        }
        if mix.total() == 0 {
            return Err(SimulationError::InvalidConfig(
                "Must have at least one agent".to_string(),
            ));
        }
        if !config.initial_asset.is_finite() {
            return Err(SimulationError::InvalidConfig(
                "initial_asset must be finite".to_string(),
            ));
        }
        if mix.policy > 0 && !has_oracle {
            return Err(SimulationError::InvalidConfig(format!(
                "{} policy agents configured but no oracle supplied",
                mix.policy
            )));
        }
        Ok(domain)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn domain(&self) -> PriceDomain {
        self.domain
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn agents(&self) -> &[Agent] {
        self.state.agents()
    }

    pub fn clock(&self) -> &PeriodClock {
        &self.clock
    }

    pub fn current_period(&self) -> usize {
        self.clock.period()
    }

    pub fn phase(&self) -> PeriodPhase {
        self.clock.phase()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    pub fn steps_run(&self) -> usize {
        self.steps_run
    }

    /// Current asset of every agent, in registry order
    pub fn assets(&self) -> Vec<AgentAsset> {
        self.state
            .agents()
            .iter()
            .map(|a| AgentAsset {
                id: a.id(),
                kind: a.kind(),
                asset: a.asset(),
            })
            .collect()
    }

    pub fn total_asset(&self) -> f64 {
        self.state.total_asset()
    }

    // ========================================================================
    // Period loop
    // ========================================================================

    /// Reset agents and book and open the next period
    pub fn begin_period(&mut self) -> Result<usize, SimulationError> {
        if self.clock.phase() == PeriodPhase::Stepping {
            return Err(SimulationError::InvalidState(format!(
                "period {} is still stepping",
                self.clock.period()
            )));
        }
        if self.clock.is_finished() {
            return Err(SimulationError::InvalidState(
                "all periods already ran".to_string(),
            ));
        }

        self.clock.enter_reset();
        self.state.reset_period(self.domain, &mut self.rng);
        self.period_executions = 0;
        let period = self.clock.open_period();

        debug!(
            period,
            agents = self.state.num_agents(),
            "period started"
        );
        Ok(period)
    }

    /// Run one matching step of the open period
    ///
    /// Returns [`StepStatus::Exhausted`] (and closes the period) instead of
    /// stepping when the budget is used up or no agent is left untraded.
    pub fn step(&mut self) -> Result<StepStatus, SimulationError> {
        if self.clock.phase() != PeriodPhase::Stepping {
            return Err(SimulationError::InvalidState(
                "no period is open".to_string(),
            ));
        }

        if self.clock.budget_exhausted() {
            return Ok(StepStatus::Exhausted(self.close_period(Exhaustion::StepBudget)));
        }
        if self.state.available().is_empty() {
            return Ok(StepStatus::Exhausted(self.close_period(Exhaustion::AllTraded)));
        }

        // 1. Select an untraded agent
        let slot = self.rng.choose_index(self.state.available().len());
        let agent_id = self.state.available().get(slot).ok_or_else(|| {
            SimulationError::InvalidState(format!("availability slot {} out of range", slot))
        })?;

        // 2. Decide
        let agent = &self.state.agents()[agent_id.index()];
        debug_assert!(!agent.has_traded(), "scheduler selected traded agent {}", agent_id);
        let agent_kind = agent.kind();
        let mut ctx = DecisionContext::new(self.state.book().snapshot(), self.domain);
        if let Some(oracle) = self.oracle.as_deref() {
            ctx = ctx.with_oracle(oracle);
        }
        let action = decide(agent, &ctx, &mut self.rng)?;
        let period = self.clock.period();
        let step = self.clock.advance_step();

        // 3. Match and settle
        let outcome = step_market(&mut self.state, agent_id, action);
        self.steps_run += 1;

        // 4. Log
        self.trade_log.record(StepOutcome {
            period,
            step,
            agent_id,
            agent_kind,
            role: action.role,
            price: outcome.price,
            result: outcome.result,
            passive: false,
        });
        if let Some(fill) = outcome.passive {
            self.period_executions += 1;
            let counterparty_kind = self.state.agents()[fill.agent_id.index()].kind();
            self.trade_log.record(StepOutcome {
                period,
                step,
                agent_id: fill.agent_id,
                agent_kind: counterparty_kind,
                role: fill.role,
                price: fill.price,
                result: StepResult::Executed,
                passive: true,
            });
        }

        trace!(
            period,
            step,
            agent = %agent_id,
            kind = %agent_kind,
            role = %action.role,
            price = outcome.price,
            result = %outcome.result,
            "step"
        );

        Ok(StepStatus::Stepped(StepReport {
            period,
            step,
            agent_id,
            action,
            result: outcome.result,
            fail_reason: outcome.fail_reason,
            counterparty: outcome.passive.map(|fill| fill.agent_id),
        }))
    }

    fn close_period(&mut self, exhaustion: Exhaustion) -> Exhaustion {
        self.clock.close_period();
        let period = self.clock.period();
        debug!(
            period,
            steps = self.clock.steps_taken(),
            executions = self.period_executions,
            early = exhaustion == Exhaustion::AllTraded,
            "period ended"
        );
        if period % PROGRESS_EVERY == 0 {
            info!(
                period,
                of = self.clock.num_periods(),
                trades = self.trade_log.executions(),
                "progress"
            );
        }
        exhaustion
    }

    /// Run the current period to exhaustion, opening the next one if none is open
    pub fn run_period(&mut self) -> Result<PeriodResult, SimulationError> {
        if self.clock.phase() != PeriodPhase::Stepping {
            self.begin_period()?;
        }
        loop {
            if let StepStatus::Exhausted(exhaustion) = self.step()? {
                return Ok(PeriodResult {
                    period: self.clock.period(),
                    steps: self.clock.steps_taken(),
                    executions: self.period_executions,
                    exhaustion,
                });
            }
        }
    }

    /// Run every remaining period
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        while !self.clock.is_finished() {
            self.run_period()?;
        }
        let summary = self.summary();
        info!(
            periods = summary.periods_run,
            steps = summary.steps_run,
            executions = summary.executions,
            fingerprint = %summary.fingerprint,
            "run complete"
        );
        Ok(summary)
    }

    /// Summary of everything run so far
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            periods_run: self.clock.completed_periods(),
            steps_run: self.steps_run,
            executions: self.trade_log.executions(),
            final_assets: self.assets(),
            breakdown: self.trade_log.action_breakdown(),
            fingerprint: self.trade_log.fingerprint(),
        }
    }
}
