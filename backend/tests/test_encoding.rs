//! Feature Encoding Tests
//!
//! The (board, action) layout is shared with trained models, so offsets are
//! pinned here explicitly for the standard 200-tick domain.

use market_simulator_core_rs::{
    Action, BoardSnapshot, EncodingError, FeatureEncoder, PriceDomain, Role,
};
use proptest::prelude::*;

fn encoder() -> FeatureEncoder {
    FeatureEncoder::new(PriceDomain::new(200).unwrap())
}

fn set_positions(v: &[f32]) -> Vec<usize> {
    v.iter()
        .enumerate()
        .filter(|(_, x)| **x == 1.0)
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn test_width_is_407_for_price_max_200() {
    assert_eq!(encoder().width(), (3 + 201) + (2 + 201));
}

#[test]
fn test_offsets_for_bid_and_seller() {
    let v = encoder().encode(BoardSnapshot::Bid(150), Action::sell(149)).unwrap();
    // bid flag, bid price, seller flag, action price
    assert_eq!(set_positions(&v), vec![2, 3 + 150, 204 + 1, 204 + 2 + 149]);
}

#[test]
fn test_offsets_for_empty_and_buyer() {
    let v = encoder().encode(BoardSnapshot::Empty, Action::buy(0)).unwrap();
    assert_eq!(set_positions(&v), vec![0, 204, 206]);
}

#[test]
fn test_decode_recovers_pair() {
    let enc = encoder();
    let v = enc.encode(BoardSnapshot::Ask(10), Action::buy(15)).unwrap();
    let (board, action) = enc.decode(&v).unwrap();
    assert_eq!(board, BoardSnapshot::Ask(10));
    assert_eq!(action.role, Role::Buyer);
    assert_eq!(action.price, 15);
}

#[test]
fn test_decode_rejects_missing_action_price() {
    let enc = encoder();
    let mut v = enc.encode(BoardSnapshot::Empty, Action::buy(7)).unwrap();
    v[204 + 2 + 7] = 0.0;
    assert_eq!(
        enc.decode(&v),
        Err(EncodingError::PriceSlots {
            segment: "action",
            count: 0,
            expected: 1
        })
    );
}

#[test]
fn test_decode_rejects_two_roles() {
    let enc = encoder();
    let mut v = enc.encode(BoardSnapshot::Empty, Action::buy(7)).unwrap();
    v[205] = 1.0;
    assert_eq!(
        enc.decode(&v),
        Err(EncodingError::KindFlags {
            segment: "action",
            count: 2
        })
    );
}

fn board_strategy(max: u32) -> impl Strategy<Value = BoardSnapshot> {
    prop_oneof![
        Just(BoardSnapshot::Empty),
        (0..=max).prop_map(BoardSnapshot::Ask),
        (0..=max).prop_map(BoardSnapshot::Bid),
    ]
}

fn action_strategy(max: u32) -> impl Strategy<Value = Action> {
    (any::<bool>(), 0..=max).prop_map(|(buy, price)| if buy { Action::buy(price) } else { Action::sell(price) })
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(
        max in 1u32..300,
        seed in any::<u64>(),
    ) {
        let enc = FeatureEncoder::new(PriceDomain::new(max).unwrap());
        // derive a pair from the seed so both halves stay inside this domain
        let board = match seed % 3 {
            0 => BoardSnapshot::Empty,
            1 => BoardSnapshot::Ask((seed / 3 % (max as u64 + 1)) as u32),
            _ => BoardSnapshot::Bid((seed / 3 % (max as u64 + 1)) as u32),
        };
        let price = (seed / 7 % (max as u64 + 1)) as u32;
        let action = if seed & 1 == 0 { Action::buy(price) } else { Action::sell(price) };

        let v = enc.encode(board, action).unwrap();
        prop_assert_eq!(v.len(), enc.width());
        prop_assert_eq!(enc.decode(&v).unwrap(), (board, action));
    }

    #[test]
    fn prop_exactly_three_or_four_slots_set(
        board in board_strategy(200),
        action in action_strategy(200),
    ) {
        let v = encoder().encode(board, action).unwrap();
        let expected = if board == BoardSnapshot::Empty { 3 } else { 4 };
        prop_assert_eq!(set_positions(&v).len(), expected);
    }
}
