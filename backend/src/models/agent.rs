//! Agent (trader) model
//!
//! Each trader has:
//! - a stable id (its index in the registry)
//! - a real-valued asset balance, mutated only by trade settlement
//! - a per-period `has_traded` flag
//! - a decision strategy: zero-intelligence, rule-based or learned policy
//!
//! Strategies form a closed set. Only the zero-intelligence strategy carries
//! private state (its valuation), redrawn at every period reset.
//!
//! CRITICAL: the market is closed. Every settlement debits one agent and
//! credits another by the same price, so total asset never changes.

use super::price::{Price, PriceDomain};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable agent identifier (index into the agent registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of trader, used for configuration and log labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    ZeroIntelligence,
    Rule,
    Policy,
}

impl AgentKind {
    /// Label written into trade log records
    pub fn label(self) -> &'static str {
        match self {
            AgentKind::ZeroIntelligence => "ZIT",
            AgentKind::Rule => "Rule",
            AgentKind::Policy => "ML",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Private valuation of a zero-intelligence trader for one period
///
/// Invariants after [`ZiValuation::draw`]:
/// - `value >= cost`
/// - `buy_price` in `[0, value]`
/// - `sell_price` in `[cost, price_max]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZiValuation {
    pub cost: Price,
    pub value: Price,
    pub buy_price: Price,
    pub sell_price: Price,
}

impl ZiValuation {
    /// Draw a fresh valuation (four or five RNG draws, in field order)
    ///
    /// `value` is drawn over the whole domain and redrawn from `[cost, max]`
    /// only when it lands below `cost`.
    pub fn draw(domain: PriceDomain, rng: &mut RngManager) -> Self {
        let max = domain.max() as i64;
        let cost = rng.range_inclusive(0, max);
        let mut value = rng.range_inclusive(0, max);
        if value < cost {
            value = rng.range_inclusive(cost, max);
        }
        let buy_price = rng.range_inclusive(0, value);
        let sell_price = rng.range_inclusive(cost, max);

        Self {
            cost: cost as Price,
            value: value as Price,
            buy_price: buy_price as Price,
            sell_price: sell_price as Price,
        }
    }
}

/// Decision strategy of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Strategy {
    /// Random quotes bounded by a private valuation; ignores the book
    ZeroIntelligence(ZiValuation),
    /// Fresh random price, side chosen by a fixed rule on the book
    Rule,
    /// Fresh random price, side chosen by the policy oracle
    Policy,
}

impl Strategy {
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::ZeroIntelligence => Strategy::ZeroIntelligence(ZiValuation::default()),
            AgentKind::Rule => Strategy::Rule,
            AgentKind::Policy => Strategy::Policy,
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            Strategy::ZeroIntelligence(_) => AgentKind::ZeroIntelligence,
            Strategy::Rule => AgentKind::Rule,
            Strategy::Policy => AgentKind::Policy,
        }
    }
}

/// A trader in the double auction
///
/// # Example
/// ```
/// use market_simulator_core_rs::{Agent, AgentId, AgentKind};
///
/// let mut agent = Agent::new(AgentId(0), AgentKind::Rule, 500.0);
/// agent.debit(120);
/// agent.mark_traded();
/// assert_eq!(agent.asset(), 380.0);
/// assert!(agent.has_traded());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    asset: f64,
    has_traded: bool,
    strategy: Strategy,
}

impl Agent {
    pub fn new(id: AgentId, kind: AgentKind, initial_asset: f64) -> Self {
        Self {
            id,
            asset: initial_asset,
            has_traded: false,
            strategy: Strategy::for_kind(kind),
        }
    }

    /// Rebuild an agent with every field preserved (checkpoint restore)
    pub fn from_snapshot(id: AgentId, asset: f64, has_traded: bool, strategy: Strategy) -> Self {
        Self {
            id,
            asset,
            has_traded,
            strategy,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.strategy.kind()
    }

    pub fn asset(&self) -> f64 {
        self.asset
    }

    pub fn has_traded(&self) -> bool {
        self.has_traded
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Current valuation, for zero-intelligence agents only
    pub fn valuation(&self) -> Option<&ZiValuation> {
        match &self.strategy {
            Strategy::ZeroIntelligence(valuation) => Some(valuation),
            _ => None,
        }
    }

    /// Start-of-period reset
    ///
    /// Clears `has_traded`; zero-intelligence agents also redraw their
    /// valuation. Other strategies consume no randomness here.
    pub fn reset_period(&mut self, domain: PriceDomain, rng: &mut RngManager) {
        self.has_traded = false;
        if let Strategy::ZeroIntelligence(valuation) = &mut self.strategy {
            *valuation = ZiValuation::draw(domain, rng);
        }
    }

    pub fn mark_traded(&mut self) {
        self.has_traded = true;
    }

    /// Pay `price` (buyer side of a settlement)
    pub fn debit(&mut self, price: Price) {
        self.asset -= price as f64;
    }

    /// Receive `price` (seller side of a settlement)
    pub fn credit(&mut self, price: Price) {
        self.asset += price as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_untraded() {
        let agent = Agent::new(AgentId(3), AgentKind::Policy, 500.0);
        assert_eq!(agent.id(), AgentId(3));
        assert_eq!(agent.kind(), AgentKind::Policy);
        assert!(!agent.has_traded());
        assert!(agent.valuation().is_none());
    }

    #[test]
    fn test_reset_clears_flag_without_draws_for_rule() {
        let domain = PriceDomain::new(200).unwrap();
        let mut rng = RngManager::new(5);
        let before = rng.get_state();

        let mut agent = Agent::new(AgentId(0), AgentKind::Rule, 500.0);
        agent.mark_traded();
        agent.reset_period(domain, &mut rng);

        assert!(!agent.has_traded());
        assert_eq!(rng.get_state(), before, "rule reset must not draw");
    }

    #[test]
    fn test_zi_reset_draws_valid_valuation() {
        let domain = PriceDomain::new(10).unwrap();
        let mut rng = RngManager::new(11);
        let mut agent = Agent::new(AgentId(0), AgentKind::ZeroIntelligence, 500.0);

        for _ in 0..200 {
            agent.reset_period(domain, &mut rng);
            let v = agent.valuation().copied().unwrap();
            assert!(v.value >= v.cost);
            assert!(v.buy_price <= v.value);
            assert!(v.sell_price >= v.cost && v.sell_price <= 10);
        }
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(AgentKind::ZeroIntelligence.label(), "ZIT");
        assert_eq!(AgentKind::Rule.to_string(), "Rule");
        assert_eq!(AgentKind::Policy.label(), "ML");
    }
}
