//! Domain models for the market simulator

pub mod action;
pub mod agent;
pub mod book;
pub mod outcome;
pub mod price;
pub mod state;

// Re-exports
pub use action::{Action, Role};
pub use agent::{Agent, AgentId, AgentKind, Strategy, ZiValuation};
pub use book::{BoardSnapshot, BookState, FailReason, OrderBook, Quote, Resolution};
pub use outcome::{ActionBreakdown, OutcomeClass, StepOutcome, StepResult, TradeLog};
pub use price::{Price, PriceDomain, PriceError};
pub use state::{AvailabilityPool, MarketState, StateError};
