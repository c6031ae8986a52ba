//! Agent Decision Policies
//!
//! Every agent turns its own state (and, for the rule and learned strategies,
//! the current book) into one [`Action`] per step. The strategy set is closed,
//! so dispatch is a `match` on [`Strategy`]:
//!
//! 1. **Zero-intelligence**: side by coin flip, price from the period valuation;
//!    never looks at the book
//! 2. **Rule**: fresh price in `(0, P)`, side picked to cross or improve the book
//! 3. **Learned policy**: fresh price in `(0, P)`, side picked by the
//!    [`PolicyOracle`](crate::oracle::PolicyOracle)
//!
//! # Randomness
//!
//! Draws per decision, in order:
//! - zero-intelligence: one role draw
//! - rule: one price draw, then one role draw only when the book is empty
//! - learned policy: one price draw
//!
//! # Example
//!
//! ```rust
//! use market_simulator_core_rs::policy::{decide, DecisionContext};
//! use market_simulator_core_rs::{Agent, AgentId, AgentKind, BoardSnapshot, PriceDomain, RngManager, Role};
//!
//! let domain = PriceDomain::new(200).unwrap();
//! let agent = Agent::new(AgentId(0), AgentKind::Rule, 0.0);
//! let mut rng = RngManager::new(42);
//!
//! let ctx = DecisionContext::new(BoardSnapshot::Ask(0), domain);
//! let action = decide(&agent, &ctx, &mut rng).unwrap();
//! // every interior price crosses an ask at 0
//! assert_eq!(action.role, Role::Buyer);
//! ```

pub mod learned;
pub mod rule;
pub mod zero_intelligence;

use crate::models::action::Action;
use crate::models::agent::{Agent, Strategy};
use crate::models::book::BoardSnapshot;
use crate::models::price::{Price, PriceDomain};
use crate::oracle::{EncodingError, OracleError, PolicyOracle};
use crate::rng::RngManager;
use thiserror::Error;

/// Errors from an agent decision
#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    #[error("Policy agent needs an oracle but none was supplied")]
    MissingOracle,

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

/// What an agent may look at when deciding
#[derive(Clone, Copy)]
pub struct DecisionContext<'a> {
    pub board: BoardSnapshot,
    pub domain: PriceDomain,
    pub oracle: Option<&'a dyn PolicyOracle>,
}

impl<'a> DecisionContext<'a> {
    pub fn new(board: BoardSnapshot, domain: PriceDomain) -> Self {
        Self {
            board,
            domain,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, oracle: &'a dyn PolicyOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }
}

/// Choose the action `agent` submits this step
pub fn decide(
    agent: &Agent,
    ctx: &DecisionContext<'_>,
    rng: &mut RngManager,
) -> Result<Action, DecisionError> {
    let action = match agent.strategy() {
        Strategy::ZeroIntelligence(valuation) => zero_intelligence::choose(valuation, rng),
        Strategy::Rule => rule::choose(ctx.board, ctx.domain, rng),
        Strategy::Policy => {
            let oracle = ctx.oracle.ok_or(DecisionError::MissingOracle)?;
            learned::choose(ctx.board, ctx.domain, oracle, rng)?
        }
    };
    debug_assert!(
        ctx.domain.contains(action.price),
        "agent {} quoted {} outside [0, {}]",
        agent.id(),
        action.price,
        ctx.domain.max()
    );
    Ok(action)
}

/// Uniform price in the open interval `(0, max)`
///
/// # Panics
/// Panics if the domain has no interior (`max < 2`)
pub fn draw_interior_price(domain: PriceDomain, rng: &mut RngManager) -> Price {
    rng.range_inclusive(1, domain.max() as i64 - 1) as Price
}
