//! Step outcomes and the trade log
//!
//! The trade log is the only output of the matching core: an append-only,
//! ordered list of [`StepOutcome`] records across every period of a run.
//! An executed step writes two records, the active one for the stepping agent
//! followed immediately by a passive one for the counterparty.
//!
//! # Example
//!
//! ```rust
//! use market_simulator_core_rs::{AgentId, AgentKind, Role, StepOutcome, StepResult, TradeLog};
//!
//! let mut log = TradeLog::new();
//! log.record(StepOutcome {
//!     period: 1,
//!     step: 1,
//!     agent_id: AgentId(0),
//!     agent_kind: AgentKind::ZeroIntelligence,
//!     role: Role::Seller,
//!     price: 42,
//!     result: StepResult::Overwrite,
//!     passive: false,
//! });
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.executions(), 0);
//! ```

use super::action::Role;
use super::agent::{AgentId, AgentKind};
use super::price::Price;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Result of one step, from the stepping agent's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepResult {
    Executed,
    Overwrite,
    Fail,
}

impl StepResult {
    pub fn as_str(self) -> &'static str {
        match self {
            StepResult::Executed => "executed",
            StepResult::Overwrite => "overwrite",
            StepResult::Fail => "fail",
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five outcome classes predicted by the policy oracle
///
/// The discriminants are the column order of every oracle distribution and
/// the labels of generated training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    SellOverwrite = 0,
    BuyOverwrite = 1,
    SellExecuted = 2,
    BuyExecuted = 3,
    Fail = 4,
}

impl OutcomeClass {
    pub const ALL: [OutcomeClass; 5] = [
        OutcomeClass::SellOverwrite,
        OutcomeClass::BuyOverwrite,
        OutcomeClass::SellExecuted,
        OutcomeClass::BuyExecuted,
        OutcomeClass::Fail,
    ];

    /// Class of a resolved step; a failure is `Fail` whatever the side
    pub fn from_step(role: Role, result: StepResult) -> Self {
        match (role, result) {
            (_, StepResult::Fail) => OutcomeClass::Fail,
            (Role::Seller, StepResult::Overwrite) => OutcomeClass::SellOverwrite,
            (Role::Buyer, StepResult::Overwrite) => OutcomeClass::BuyOverwrite,
            (Role::Seller, StepResult::Executed) => OutcomeClass::SellExecuted,
            (Role::Buyer, StepResult::Executed) => OutcomeClass::BuyExecuted,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One trade log record
///
/// `period` and `step` are 1-indexed. For an executed step, `price` is the
/// execution price (the resting quote), on both the active and passive record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub period: usize,
    pub step: usize,
    pub agent_id: AgentId,
    pub agent_kind: AgentKind,
    pub role: Role,
    pub price: Price,
    pub result: StepResult,
    /// Counterparty record written right after an execution
    #[serde(default)]
    pub passive: bool,
}

impl StepOutcome {
    pub fn class(&self) -> OutcomeClass {
        OutcomeClass::from_step(self.role, self.result)
    }
}

/// Per-kind counts of what agents did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBreakdown {
    pub fail: usize,
    pub buy_overwrite: usize,
    pub buy_executed: usize,
    pub sell_overwrite: usize,
    pub sell_executed: usize,
}

impl ActionBreakdown {
    fn count(&mut self, class: OutcomeClass) {
        match class {
            OutcomeClass::Fail => self.fail += 1,
            OutcomeClass::BuyOverwrite => self.buy_overwrite += 1,
            OutcomeClass::BuyExecuted => self.buy_executed += 1,
            OutcomeClass::SellOverwrite => self.sell_overwrite += 1,
            OutcomeClass::SellExecuted => self.sell_executed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fail + self.buy_overwrite + self.buy_executed + self.sell_overwrite + self.sell_executed
    }
}

/// Append-only log of step outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLog {
    records: Vec<StepOutcome>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn record(&mut self, outcome: StepOutcome) {
        self.records.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in the order they were written
    pub fn records(&self) -> &[StepOutcome] {
        &self.records
    }

    /// Number of trades (active executed records)
    pub fn executions(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.result == StepResult::Executed && !r.passive)
            .count()
    }

    /// Count every record (passive ones included) by agent kind and class
    pub fn action_breakdown(&self) -> BTreeMap<AgentKind, ActionBreakdown> {
        let mut breakdown: BTreeMap<AgentKind, ActionBreakdown> = BTreeMap::new();
        for record in &self.records {
            breakdown
                .entry(record.agent_kind)
                .or_default()
                .count(record.class());
        }
        breakdown
    }

    /// SHA-256 hex digest of the ordered records
    ///
    /// Two runs produced the same log iff their fingerprints are equal.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for r in &self.records {
            hasher.update((r.period as u64).to_le_bytes());
            hasher.update((r.step as u64).to_le_bytes());
            hasher.update((r.agent_id.index() as u64).to_le_bytes());
            hasher.update(r.agent_kind.label().as_bytes());
            hasher.update(r.role.as_str().as_bytes());
            hasher.update(r.price.to_le_bytes());
            hasher.update(r.result.as_str().as_bytes());
            hasher.update([r.passive as u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}
