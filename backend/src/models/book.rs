//! Single-slot order book
//!
//! The book holds at most one resting quote. Every incoming action resolves
//! to exactly one of three outcomes:
//!
//! - **execute** against the resting quote, at the resting price; the book empties
//! - **overwrite** the slot with the incoming quote
//! - **fail**, leaving the book untouched
//!
//! # Critical Invariants
//!
//! 1. At most one resting quote at any time
//! 2. Executions price at the resting quote (price improvement goes to the incoming side)
//! 3. Meeting the resting price is enough to trade, but replacing a quote on the
//!    same side needs strict improvement
//! 4. A resting quote whose owner has already traded is stale and never matches

use super::action::{Action, Role};
use super::agent::AgentId;
use super::price::Price;
use serde::{Deserialize, Serialize};

/// A resting quote and the agent that posted it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Price,
    pub owner: AgentId,
}

/// Contents of the single book slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookState {
    #[default]
    Empty,
    Bid(Quote),
    Ask(Quote),
}

impl BookState {
    pub fn snapshot(&self) -> BoardSnapshot {
        match self {
            BookState::Empty => BoardSnapshot::Empty,
            BookState::Bid(q) => BoardSnapshot::Bid(q.price),
            BookState::Ask(q) => BoardSnapshot::Ask(q.price),
        }
    }

    pub fn resting(&self) -> Option<Quote> {
        match self {
            BookState::Empty => None,
            BookState::Bid(q) | BookState::Ask(q) => Some(*q),
        }
    }
}

/// Owner-free view of the book, as seen by decision policies and the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardSnapshot {
    Empty,
    Ask(Price),
    Bid(Price),
}

impl BoardSnapshot {
    pub fn price(&self) -> Option<Price> {
        match self {
            BoardSnapshot::Empty => None,
            BoardSnapshot::Ask(p) | BoardSnapshot::Bid(p) => Some(*p),
        }
    }
}

/// Why an action failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailReason {
    /// Neither crosses the resting quote nor improves it
    NoImprovement,
    /// Crosses a quote whose owner has already traded this period
    StaleQuote,
}

/// How the book resolves an incoming action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Trade against the resting quote, at its price
    Executed(Quote),
    /// The incoming quote replaces the slot
    Overwrite,
    Fail(FailReason),
}

/// The single-slot limit-order book
///
/// # Example
/// ```
/// use market_simulator_core_rs::{Action, AgentId, OrderBook, Resolution};
///
/// let mut book = OrderBook::new();
/// assert_eq!(book.submit(AgentId(0), Action::sell(10), |_| true), Resolution::Overwrite);
///
/// // A buyer at 15 lifts the ask at 10: the resting price sets the trade
/// match book.submit(AgentId(1), Action::buy(15), |_| true) {
///     Resolution::Executed(quote) => assert_eq!(quote.price, 10),
///     other => panic!("unexpected {:?}", other),
/// }
/// assert!(book.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    state: BookState,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: BookState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &BookState {
        &self.state
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.state.snapshot()
    }

    pub fn is_empty(&self) -> bool {
        self.state == BookState::Empty
    }

    pub fn clear(&mut self) {
        self.state = BookState::Empty;
    }

    /// Classify `action` against the current slot without mutating it
    ///
    /// `counterparty_available` is asked only when the action crosses the
    /// resting quote; it reports whether the quote's owner can still trade.
    pub fn resolve<F>(&self, action: Action, counterparty_available: F) -> Resolution
    where
        F: FnOnce(AgentId) -> bool,
    {
        let p = action.price;
        match (action.role, self.state) {
            (Role::Buyer, BookState::Ask(ask)) if p >= ask.price => {
                if counterparty_available(ask.owner) {
                    Resolution::Executed(ask)
                } else {
                    Resolution::Fail(FailReason::StaleQuote)
                }
            }
            (Role::Seller, BookState::Bid(bid)) if p <= bid.price => {
                if counterparty_available(bid.owner) {
                    Resolution::Executed(bid)
                } else {
                    Resolution::Fail(FailReason::StaleQuote)
                }
            }
            (_, BookState::Empty) => Resolution::Overwrite,
            (Role::Buyer, BookState::Bid(bid)) if p > bid.price => Resolution::Overwrite,
            (Role::Seller, BookState::Ask(ask)) if p < ask.price => Resolution::Overwrite,
            _ => Resolution::Fail(FailReason::NoImprovement),
        }
    }

    /// Resolve `action` from `owner` and apply the result to the slot
    pub fn submit<F>(&mut self, owner: AgentId, action: Action, counterparty_available: F) -> Resolution
    where
        F: FnOnce(AgentId) -> bool,
    {
        let resolution = self.resolve(action, counterparty_available);
        match resolution {
            Resolution::Executed(_) => self.state = BookState::Empty,
            Resolution::Overwrite => {
                let quote = Quote {
                    price: action.price,
                    owner,
                };
                self.state = match action.role {
                    Role::Buyer => BookState::Bid(quote),
                    Role::Seller => BookState::Ask(quote),
                };
            }
            Resolution::Fail(_) => {}
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(price: Price) -> OrderBook {
        OrderBook::from_state(BookState::Ask(Quote {
            price,
            owner: AgentId(9),
        }))
    }

    fn bid(price: Price) -> OrderBook {
        OrderBook::from_state(BookState::Bid(Quote {
            price,
            owner: AgentId(9),
        }))
    }

    #[test]
    fn test_empty_book_accepts_either_side() {
        let book = OrderBook::new();
        assert_eq!(book.resolve(Action::buy(0), |_| true), Resolution::Overwrite);
        assert_eq!(book.resolve(Action::sell(200), |_| true), Resolution::Overwrite);
    }

    #[test]
    fn test_buyer_meeting_ask_executes() {
        let book = ask(10);
        assert!(matches!(
            book.resolve(Action::buy(10), |_| true),
            Resolution::Executed(Quote { price: 10, .. })
        ));
    }

    #[test]
    fn test_buyer_below_ask_fails() {
        let book = ask(10);
        assert_eq!(
            book.resolve(Action::buy(9), |_| true),
            Resolution::Fail(FailReason::NoImprovement)
        );
    }

    #[test]
    fn test_bid_overwrite_needs_strict_improvement() {
        let book = bid(7);
        assert_eq!(
            book.resolve(Action::buy(7), |_| true),
            Resolution::Fail(FailReason::NoImprovement)
        );
        assert_eq!(book.resolve(Action::buy(8), |_| true), Resolution::Overwrite);
    }

    #[test]
    fn test_ask_overwrite_needs_strict_improvement() {
        let book = ask(7);
        assert_eq!(
            book.resolve(Action::sell(7), |_| true),
            Resolution::Fail(FailReason::NoImprovement)
        );
        assert_eq!(book.resolve(Action::sell(6), |_| true), Resolution::Overwrite);
    }

    #[test]
    fn test_seller_above_bid_fails() {
        let book = bid(7);
        assert_eq!(
            book.resolve(Action::sell(8), |_| true),
            Resolution::Fail(FailReason::NoImprovement)
        );
    }

    #[test]
    fn test_stale_quote_fails_and_keeps_book() {
        let mut book = ask(10);
        let before = *book.state();
        let resolution = book.submit(AgentId(1), Action::buy(50), |_| false);
        assert_eq!(resolution, Resolution::Fail(FailReason::StaleQuote));
        assert_eq!(*book.state(), before);
    }

    #[test]
    fn test_counterparty_checked_only_on_cross() {
        let book = bid(7);
        let resolution = book.resolve(Action::buy(9), |_| panic!("must not be asked"));
        assert_eq!(resolution, Resolution::Overwrite);
    }

    #[test]
    fn test_submit_overwrite_records_owner() {
        let mut book = OrderBook::new();
        book.submit(AgentId(4), Action::buy(33), |_| true);
        assert_eq!(
            *book.state(),
            BookState::Bid(Quote {
                price: 33,
                owner: AgentId(4)
            })
        );
        assert_eq!(book.snapshot(), BoardSnapshot::Bid(33));
    }
}
