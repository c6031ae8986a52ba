//! Rule-based traders
//!
//! Draw a fresh interior price every step, then pick the side most likely to
//! trade against the book:
//!
//! | book       | buyer when       | otherwise |
//! |------------|------------------|-----------|
//! | empty      | coin flip        | seller    |
//! | ask `a`    | `price >= a`     | seller    |
//! | bid `b`    | `price > b`      | seller    |

use super::draw_interior_price;
use crate::models::action::Action;
use crate::models::book::BoardSnapshot;
use crate::models::price::PriceDomain;
use crate::rng::RngManager;

pub fn choose(board: BoardSnapshot, domain: PriceDomain, rng: &mut RngManager) -> Action {
    let price = draw_interior_price(domain, rng);
    let buy = match board {
        BoardSnapshot::Empty => rng.coin_flip(),
        BoardSnapshot::Ask(ask) => price >= ask,
        BoardSnapshot::Bid(bid) => price > bid,
    };
    if buy {
        Action::buy(price)
    } else {
        Action::sell(price)
    }
}
