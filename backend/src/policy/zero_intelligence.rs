//! Zero-intelligence traders
//!
//! Quote the stored valuation for a side picked by coin flip (heads buys).

use crate::models::action::Action;
use crate::models::agent::ZiValuation;
use crate::rng::RngManager;

pub fn choose(valuation: &ZiValuation, rng: &mut RngManager) -> Action {
    if rng.coin_flip() {
        Action::buy(valuation.buy_price)
    } else {
        Action::sell(valuation.sell_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::Role;

    #[test]
    fn test_quotes_the_stored_price_for_each_side() {
        let valuation = ZiValuation {
            cost: 20,
            value: 80,
            buy_price: 55,
            sell_price: 35,
        };
        let mut rng = RngManager::new(3);
        let mut seen = (false, false);
        for _ in 0..64 {
            let action = choose(&valuation, &mut rng);
            match action.role {
                Role::Buyer => {
                    assert_eq!(action.price, 55);
                    seen.0 = true;
                }
                Role::Seller => {
                    assert_eq!(action.price, 35);
                    seen.1 = true;
                }
            }
        }
        assert_eq!(seen, (true, true));
    }
}
