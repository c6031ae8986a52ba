//! Market state
//!
//! Everything one run mutates between steps: the agent registry, the
//! single-slot book, and the pool of agents still available this period.
//!
//! # Critical Invariants
//!
//! 1. **Asset conservation**: the sum of agent assets never changes
//! 2. **Availability**: an agent is in the pool iff `has_traded` is false
//! 3. **Registry ids**: `agents[i].id() == AgentId(i)`

use super::agent::{Agent, AgentId};
use super::book::OrderBook;
use super::price::PriceDomain;
use crate::rng::RngManager;
use thiserror::Error;

/// Errors raised when assembling market state
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("agent registry must be ordered by id: slot {slot} holds agent {found}")]
    MisorderedRegistry { slot: usize, found: AgentId },
}

/// Agents that have not traded in the current period
///
/// Removal swaps the last id into the freed slot, so selection and removal
/// are both O(1). The pool is refilled in registry order at every reset.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityPool {
    ids: Vec<AgentId>,
    /// Position of each agent in `ids`, indexed by agent id
    positions: Vec<Option<usize>>,
}

impl AvailabilityPool {
    /// Pool holding every agent `0..num_agents`
    pub fn full(num_agents: usize) -> Self {
        let mut pool = Self::default();
        pool.refill(num_agents);
        pool
    }

    /// Pool holding the agents whose `has_traded` flag is clear, in registry order
    pub fn from_agents(agents: &[Agent]) -> Self {
        let mut pool = Self {
            ids: Vec::with_capacity(agents.len()),
            positions: vec![None; agents.len()],
        };
        for agent in agents.iter().filter(|a| !a.has_traded()) {
            pool.positions[agent.id().index()] = Some(pool.ids.len());
            pool.ids.push(agent.id());
        }
        pool
    }

    pub fn refill(&mut self, num_agents: usize) {
        self.ids.clear();
        self.ids.extend((0..num_agents).map(AgentId));
        self.positions.clear();
        self.positions.extend((0..num_agents).map(Some));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        matches!(self.positions.get(id.index()), Some(Some(_)))
    }

    /// Id at `slot` (as drawn by `RngManager::choose_index(len)`)
    pub fn get(&self, slot: usize) -> Option<AgentId> {
        self.ids.get(slot).copied()
    }

    /// Remove `id`; returns false if it was not in the pool
    pub fn remove(&mut self, id: AgentId) -> bool {
        let Some(slot) = self.positions.get_mut(id.index()).and_then(Option::take) else {
            return false;
        };
        self.ids.swap_remove(slot);
        if let Some(moved) = self.ids.get(slot) {
            self.positions[moved.index()] = Some(slot);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.ids.iter().copied()
    }
}

/// Mutable state of one market run
#[derive(Debug, Clone)]
pub struct MarketState {
    agents: Vec<Agent>,
    book: OrderBook,
    available: AvailabilityPool,
}

impl MarketState {
    /// Create state from a registry ordered by id
    ///
    /// Fails if `agents[i]` does not carry id `i`.
    pub fn new(agents: Vec<Agent>) -> Result<Self, StateError> {
        if let Some((slot, agent)) = agents
            .iter()
            .enumerate()
            .find(|(i, agent)| agent.id() != AgentId(*i))
        {
            return Err(StateError::MisorderedRegistry {
                slot,
                found: agent.id(),
            });
        }
        let available = AvailabilityPool::from_agents(&agents);
        Ok(Self {
            agents,
            book: OrderBook::new(),
            available,
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn available(&self) -> &AvailabilityPool {
        &self.available
    }

    /// Split borrow used by matching
    pub fn market_mut(&mut self) -> (&mut OrderBook, &mut [Agent]) {
        (&mut self.book, &mut self.agents)
    }

    /// Start-of-period reset: agents in registry order, empty book, full pool
    pub fn reset_period(&mut self, domain: PriceDomain, rng: &mut RngManager) {
        for agent in &mut self.agents {
            agent.reset_period(domain, rng);
        }
        self.book.clear();
        self.available.refill(self.agents.len());
    }

    /// Drop an agent that has just traded from the pool
    pub fn retire(&mut self, id: AgentId) {
        debug_assert!(
            self.agent(id).map_or(false, Agent::has_traded),
            "retiring agent {} that has not traded",
            id
        );
        self.available.remove(id);
    }

    /// Sum of all agent assets
    pub fn total_asset(&self) -> f64 {
        self.agents.iter().map(Agent::asset).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::AgentKind;

    fn agents(n: usize) -> Vec<Agent> {
        (0..n)
            .map(|i| Agent::new(AgentId(i), AgentKind::ZeroIntelligence, 100.0))
            .collect()
    }

    #[test]
    fn test_pool_swap_remove_keeps_positions() {
        let mut pool = AvailabilityPool::full(4);
        assert!(pool.remove(AgentId(1)));
        // last id moved into the freed slot
        assert_eq!(pool.get(1), Some(AgentId(3)));
        assert!(pool.remove(AgentId(3)));
        assert!(!pool.remove(AgentId(3)));
        let mut left: Vec<_> = pool.iter().collect();
        left.sort();
        assert_eq!(left, vec![AgentId(0), AgentId(2)]);
        assert!(!pool.contains(AgentId(1)));
    }

    #[test]
    fn test_pool_from_agents_skips_traded() {
        let mut registry = agents(3);
        registry[1].mark_traded();
        let pool = AvailabilityPool::from_agents(&registry);
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec![AgentId(0), AgentId(2)]);
    }

    #[test]
    fn test_reset_refills_pool_and_clears_book() {
        let domain = PriceDomain::new(10).unwrap();
        let mut rng = RngManager::new(1);
        let mut state = MarketState::new(agents(3)).unwrap();
        let (book, registry) = state.market_mut();
        book.submit(AgentId(0), crate::models::action::Action::buy(4), |_| true);
        registry[2].mark_traded();
        state.retire(AgentId(2));
        assert_eq!(state.available().len(), 2);

        state.reset_period(domain, &mut rng);
        assert!(state.book().is_empty());
        assert_eq!(state.available().len(), 3);
        assert!(state.agents().iter().all(|a| !a.has_traded()));
        assert_eq!(state.total_asset(), 300.0);
    }

    #[test]
    fn test_misordered_registry_rejected() {
        let registry = vec![
            Agent::new(AgentId(0), AgentKind::Rule, 0.0),
            Agent::new(AgentId(2), AgentKind::Rule, 0.0),
        ];
        assert_eq!(
            MarketState::new(registry).unwrap_err(),
            StateError::MisorderedRegistry {
                slot: 1,
                found: AgentId(2)
            }
        );
    }
}
