//! Agent Decision Policy Tests
//!
//! Tests the three strategies through the shared `decide` entry point:
//! - zero-intelligence agents quote their period valuation and ignore the book
//! - rule agents pick the side that crosses or improves the book
//! - policy agents ask the oracle once per decision, with two encoded candidates

use market_simulator_core_rs::policy::{decide, DecisionContext, DecisionError};
use market_simulator_core_rs::{
    Agent, AgentId, AgentKind, BoardSnapshot, ConstantOracle, FeatureEncoder, OracleError,
    PriceDomain, RngManager, Role,
};
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Test Helpers
// ============================================================================

fn domain() -> PriceDomain {
    PriceDomain::new(200).unwrap()
}

fn agent(kind: AgentKind) -> Agent {
    Agent::new(AgentId(0), kind, 500.0)
}

// ============================================================================
// Zero-intelligence
// ============================================================================

#[test]
fn test_zi_ignores_board() {
    let mut zi = agent(AgentKind::ZeroIntelligence);
    zi.reset_period(domain(), &mut RngManager::new(1));
    let valuation = *zi.valuation().unwrap();

    for board in [BoardSnapshot::Empty, BoardSnapshot::Ask(3), BoardSnapshot::Bid(190)] {
        let mut rng = RngManager::new(77);
        let action = decide(&zi, &DecisionContext::new(board, domain()), &mut rng).unwrap();
        let expected = match action.role {
            Role::Buyer => valuation.buy_price,
            Role::Seller => valuation.sell_price,
        };
        assert_eq!(action.price, expected);
        // same seed, same role whatever the board
        let mut again = RngManager::new(77);
        let other = decide(&zi, &DecisionContext::new(BoardSnapshot::Empty, domain()), &mut again)
            .unwrap();
        assert_eq!(other, action);
    }
}

// ============================================================================
// Rule
// ============================================================================

#[test]
fn test_rule_agent_never_fails_against_resting_ask() {
    let rule = agent(AgentKind::Rule);
    let mut rng = RngManager::new(31);
    for _ in 0..1000 {
        let action = decide(&rule, &DecisionContext::new(BoardSnapshot::Ask(100), domain()), &mut rng)
            .unwrap();
        // buyer crosses the ask; seller undercuts it
        match action.role {
            Role::Buyer => assert!(action.price >= 100),
            Role::Seller => assert!(action.price < 100),
        }
    }
}

#[test]
fn test_rule_agent_on_empty_book_picks_both_sides() {
    let rule = agent(AgentKind::Rule);
    let mut rng = RngManager::new(4);
    let mut buyers = 0;
    for _ in 0..400 {
        let action = decide(&rule, &DecisionContext::new(BoardSnapshot::Empty, domain()), &mut rng)
            .unwrap();
        assert!(action.price > 0 && action.price < 200);
        if action.role == Role::Buyer {
            buyers += 1;
        }
    }
    assert!(buyers > 100 && buyers < 300, "roughly even split, got {}", buyers);
}

// ============================================================================
// Policy
// ============================================================================

#[test]
fn test_policy_agent_without_oracle_errors() {
    let policy = agent(AgentKind::Policy);
    let err = decide(
        &policy,
        &DecisionContext::new(BoardSnapshot::Empty, domain()),
        &mut RngManager::new(1),
    )
    .unwrap_err();
    assert_eq!(err, DecisionError::MissingOracle);
}

#[test]
fn test_policy_agent_sends_one_batch_of_two() {
    let calls = AtomicUsize::new(0);
    let encoder = FeatureEncoder::new(domain());
    let oracle = |batch: &[Vec<f32>]| -> Result<Vec<Vec<f64>>, OracleError> {
        calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(batch.len(), 2);
        let (board0, buy) = encoder.decode(&batch[0]).unwrap();
        let (board1, sell) = encoder.decode(&batch[1]).unwrap();
        assert_eq!(board0, BoardSnapshot::Bid(60));
        assert_eq!(board1, BoardSnapshot::Bid(60));
        assert_eq!(buy.role, Role::Buyer);
        assert_eq!(sell.role, Role::Seller);
        assert_eq!(buy.price, sell.price);
        // sell side looks safer
        Ok(vec![
            vec![0.0, 0.2, 0.0, 0.0, 0.8],
            vec![0.3, 0.0, 0.5, 0.0, 0.2],
        ])
    };

    let policy = agent(AgentKind::Policy);
    let ctx = DecisionContext::new(BoardSnapshot::Bid(60), domain()).with_oracle(&oracle);
    let action = decide(&policy, &ctx, &mut RngManager::new(9)).unwrap();

    assert_eq!(action.role, Role::Seller);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_policy_agent_surfaces_malformed_distribution() {
    let oracle = |batch: &[Vec<f32>]| -> Result<Vec<Vec<f64>>, OracleError> {
        Ok(batch.iter().map(|_| vec![0.25; 4]).collect())
    };
    let policy = agent(AgentKind::Policy);
    let ctx = DecisionContext::new(BoardSnapshot::Empty, domain()).with_oracle(&oracle);
    let err = decide(&policy, &ctx, &mut RngManager::new(2)).unwrap_err();
    assert_eq!(
        err,
        DecisionError::Oracle(OracleError::WrongWidth { index: 0, actual: 4 })
    );
}

#[test]
fn test_policy_agent_with_equal_estimates_sells() {
    let oracle = ConstantOracle::new([0.1, 0.1, 0.1, 0.1, 0.6]);
    let policy = agent(AgentKind::Policy);
    let ctx = DecisionContext::new(BoardSnapshot::Ask(20), domain()).with_oracle(&oracle);
    let action = decide(&policy, &ctx, &mut RngManager::new(5)).unwrap();
    assert_eq!(action.role, Role::Seller);
    assert!(action.price >= 1 && action.price <= 199);
}
