//! Learned-policy traders
//!
//! One candidate price, two hypothetical actions (buy and sell at that
//! price), a single batched oracle call. The side with the larger estimated
//! success probability `1 - P(fail)` wins; ties go to the seller.

use super::{draw_interior_price, DecisionError};
use crate::models::action::Action;
use crate::models::book::BoardSnapshot;
use crate::models::outcome::OutcomeClass;
use crate::models::price::PriceDomain;
use crate::oracle::{validate_distributions, FeatureEncoder, PolicyOracle};
use crate::rng::RngManager;

pub fn choose(
    board: BoardSnapshot,
    domain: PriceDomain,
    oracle: &dyn PolicyOracle,
    rng: &mut RngManager,
) -> Result<Action, DecisionError> {
    let price = draw_interior_price(domain, rng);
    let buy = Action::buy(price);
    let sell = Action::sell(price);

    let encoder = FeatureEncoder::new(domain);
    let batch = [buy, sell]
        .iter()
        .map(|action| encoder.encode(board, *action))
        .collect::<Result<Vec<_>, _>>()?;

    let probs = oracle.predict_batch(&batch)?;
    validate_distributions(batch.len(), &probs)?;

    let fail = OutcomeClass::Fail.index();
    let buy_success = 1.0 - probs[0][fail];
    let sell_success = 1.0 - probs[1][fail];

    Ok(if buy_success > sell_success { buy } else { sell })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::Role;
    use crate::oracle::{ConstantOracle, OracleError};

    fn domain() -> PriceDomain {
        PriceDomain::new(20).unwrap()
    }

    #[test]
    fn test_picks_side_with_lower_fail_probability() {
        // buy vector has the buyer flag at index 3 + 21
        let oracle = |batch: &[Vec<f32>]| -> Result<Vec<Vec<f64>>, OracleError> {
            Ok(batch
                .iter()
                .map(|v| {
                    let fail = if v[24] == 1.0 { 0.1 } else { 0.9 };
                    vec![0.0, 0.0, 0.0, 1.0 - fail, fail]
                })
                .collect())
        };
        let mut rng = RngManager::new(1);
        let action = choose(BoardSnapshot::Empty, domain(), &oracle, &mut rng).unwrap();
        assert_eq!(action.role, Role::Buyer);
    }

    #[test]
    fn test_tie_goes_to_seller() {
        let oracle = ConstantOracle::uniform();
        let mut rng = RngManager::new(2);
        let action = choose(BoardSnapshot::Bid(4), domain(), &oracle, &mut rng).unwrap();
        assert_eq!(action.role, Role::Seller);
    }

    #[test]
    fn test_malformed_oracle_output_is_an_error() {
        let oracle = |_: &[Vec<f32>]| -> Result<Vec<Vec<f64>>, OracleError> { Ok(vec![vec![0.2; 5]]) };
        let mut rng = RngManager::new(3);
        let err = choose(BoardSnapshot::Empty, domain(), &oracle, &mut rng).unwrap_err();
        assert_eq!(
            err,
            DecisionError::Oracle(OracleError::WrongBatchSize {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_one_price_draw_per_decision() {
        let oracle = ConstantOracle::uniform();
        let mut a = RngManager::new(8);
        let mut b = RngManager::new(8);
        choose(BoardSnapshot::Empty, domain(), &oracle, &mut a).unwrap();
        draw_interior_price(domain(), &mut b);
        assert_eq!(a.get_state(), b.get_state());
    }
}
