//! Matching Engine
//!
//! Resolves one agent action against the single-slot book and settles the
//! resulting trade, if any.
//!
//! # Step Flow
//!
//! ```text
//! Action ─→ OrderBook::submit ─┬─ Executed  → settle (buyer pays, seller receives) → book Empty
//!                              ├─ Overwrite → book holds the incoming quote
//!                              └─ Fail      → book unchanged
//! ```
//!
//! A failed step is an economic outcome, not an error: nothing in this module
//! returns `Result`.
//!
//! # Critical Invariants
//!
//! - **Conservation**: a settlement moves exactly the execution price from the
//!   buyer to the seller, so the two asset deltas sum to zero
//! - **Resting price**: trades execute at the resting quote's price
//! - **One trade per period**: both parties are marked traded on execution
//!
//! # Example
//!
//! ```rust
//! use market_simulator_core_rs::{Action, Agent, AgentId, AgentKind, OrderBook, StepResult};
//! use market_simulator_core_rs::matching::apply_action;
//!
//! let mut agents = vec![
//!     Agent::new(AgentId(0), AgentKind::Rule, 100.0),
//!     Agent::new(AgentId(1), AgentKind::Rule, 100.0),
//! ];
//! let mut book = OrderBook::new();
//!
//! apply_action(&mut book, &mut agents, AgentId(0), Action::sell(10));
//! let outcome = apply_action(&mut book, &mut agents, AgentId(1), Action::buy(15));
//!
//! assert_eq!(outcome.result, StepResult::Executed);
//! assert_eq!(outcome.price, 10);
//! assert_eq!(agents[0].asset(), 110.0);
//! assert_eq!(agents[1].asset(), 90.0);
//! ```

use crate::models::action::{Action, Role};
use crate::models::agent::{Agent, AgentId};
use crate::models::book::{FailReason, OrderBook, Resolution};
use crate::models::outcome::StepResult;
use crate::models::price::Price;
use crate::models::state::MarketState;
use tracing::warn;

/// Counterparty side of an execution, logged as the passive record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveFill {
    pub agent_id: AgentId,
    pub role: Role,
    pub price: Price,
}

/// Result of applying one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub result: StepResult,
    /// Price to log for the active record: the execution price on a trade,
    /// the submitted price otherwise
    pub price: Price,
    pub passive: Option<PassiveFill>,
    pub fail_reason: Option<FailReason>,
}

/// Resolve `action` from `agent_id` against `book`, settling any trade
///
/// # Panics
/// Panics if `agent_id` (or the resting quote's owner) is not in `agents`.
/// In debug builds, also panics if the acting agent has already traded.
pub fn apply_action(
    book: &mut OrderBook,
    agents: &mut [Agent],
    agent_id: AgentId,
    action: Action,
) -> MatchOutcome {
    debug_assert!(
        !agents[agent_id.index()].has_traded(),
        "agent {} acted after trading this period",
        agent_id
    );

    let resolution = book.submit(agent_id, action, |owner| {
        agents.get(owner.index()).map_or(false, |a| !a.has_traded())
    });

    match resolution {
        Resolution::Executed(quote) => {
            let (buyer, seller) = match action.role {
                Role::Buyer => (agent_id, quote.owner),
                Role::Seller => (quote.owner, agent_id),
            };
            settle(agents, buyer, seller, quote.price);
            MatchOutcome {
                result: StepResult::Executed,
                price: quote.price,
                passive: Some(PassiveFill {
                    agent_id: quote.owner,
                    role: action.role.opposite(),
                    price: quote.price,
                }),
                fail_reason: None,
            }
        }
        Resolution::Overwrite => MatchOutcome {
            result: StepResult::Overwrite,
            price: action.price,
            passive: None,
            fail_reason: None,
        },
        Resolution::Fail(reason) => {
            if reason == FailReason::StaleQuote {
                warn!(
                    agent = %agent_id,
                    role = %action.role,
                    price = action.price,
                    "resting quote owner already traded; action fails"
                );
            }
            MatchOutcome {
                result: StepResult::Fail,
                price: action.price,
                passive: None,
                fail_reason: Some(reason),
            }
        }
    }
}

/// Move `price` from `buyer` to `seller` and mark both as traded
///
/// A self-match (same agent on both sides) leaves the asset unchanged.
pub fn settle(agents: &mut [Agent], buyer: AgentId, seller: AgentId, price: Price) {
    if buyer != seller {
        agents[buyer.index()].debit(price);
        agents[seller.index()].credit(price);
    }
    agents[buyer.index()].mark_traded();
    agents[seller.index()].mark_traded();
}

/// Apply an action to the whole market state, keeping the availability pool in sync
pub fn step_market(state: &mut MarketState, agent_id: AgentId, action: Action) -> MatchOutcome {
    let (book, agents) = state.market_mut();
    let outcome = apply_action(book, agents, agent_id, action);
    if let Some(passive) = outcome.passive {
        state.retire(agent_id);
        if passive.agent_id != agent_id {
            state.retire(passive.agent_id);
        }
    }
    outcome
}
