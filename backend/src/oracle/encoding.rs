//! Feature encoding of (board, action) pairs
//!
//! Layout for a price domain `[0, P]` (`S = P + 1` price slots):
//!
//! ```text
//! board segment                         action segment
//! [empty, ask, bid, price_0 .. price_P] [buyer, seller, price_0 .. price_P]
//!  0      1    2    3 .. 3+P             3+S  4+S     5+S .. 5+S+P
//! ```
//!
//! The resting price uses the same slots for an ask and a bid. An empty book
//! sets no price slot. Every other position is zero. The trained policy
//! models depend on these exact offsets.

use crate::models::action::{Action, Role};
use crate::models::book::BoardSnapshot;
use crate::models::price::{Price, PriceDomain};
use thiserror::Error;

const BOARD_FLAGS: usize = 3;
const ACTION_FLAGS: usize = 2;

/// Errors decoding a feature vector
#[derive(Debug, Error, PartialEq)]
pub enum EncodingError {
    #[error("Feature vector has width {actual}, expected {expected}")]
    WrongWidth { expected: usize, actual: usize },

    #[error("Position {index} holds {value}, expected 0 or 1")]
    NotOneHot { index: usize, value: f32 },

    #[error("{segment} segment has {count} kind flags set, expected exactly one")]
    KindFlags { segment: &'static str, count: usize },

    #[error("{segment} segment has {count} price slots set, expected {expected}")]
    PriceSlots {
        segment: &'static str,
        count: usize,
        expected: usize,
    },

    #[error("Price {price} exceeds the domain maximum {max}")]
    PriceOutOfDomain { price: Price, max: Price },
}

/// Encoder for one price domain
///
/// # Example
/// ```
/// use market_simulator_core_rs::{Action, BoardSnapshot, FeatureEncoder, PriceDomain};
///
/// let encoder = FeatureEncoder::new(PriceDomain::new(200).unwrap());
/// assert_eq!(encoder.width(), 407);
///
/// let features = encoder.encode(BoardSnapshot::Ask(120), Action::buy(130)).unwrap();
/// assert_eq!(features[1], 1.0);
/// assert_eq!(features[3 + 120], 1.0);
/// assert_eq!(
///     encoder.decode(&features).unwrap(),
///     (BoardSnapshot::Ask(120), Action::buy(130))
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEncoder {
    domain: PriceDomain,
}

impl FeatureEncoder {
    pub fn new(domain: PriceDomain) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> PriceDomain {
        self.domain
    }

    fn board_width(&self) -> usize {
        BOARD_FLAGS + self.domain.slots()
    }

    fn action_width(&self) -> usize {
        ACTION_FLAGS + self.domain.slots()
    }

    /// Total vector width: `(3 + (P+1)) + (2 + (P+1))`
    pub fn width(&self) -> usize {
        self.board_width() + self.action_width()
    }

    fn check_price(&self, price: Price) -> Result<(), EncodingError> {
        if self.domain.contains(price) {
            Ok(())
        } else {
            Err(EncodingError::PriceOutOfDomain {
                price,
                max: self.domain.max(),
            })
        }
    }

    /// Encode one (board, action) pair
    pub fn encode(&self, board: BoardSnapshot, action: Action) -> Result<Vec<f32>, EncodingError> {
        let mut features = vec![0.0f32; self.width()];
        self.encode_into(board, action, &mut features)?;
        Ok(features)
    }

    /// Encode into a zeroed buffer of exactly [`width`](Self::width) elements
    pub fn encode_into(
        &self,
        board: BoardSnapshot,
        action: Action,
        features: &mut [f32],
    ) -> Result<(), EncodingError> {
        if features.len() != self.width() {
            return Err(EncodingError::WrongWidth {
                expected: self.width(),
                actual: features.len(),
            });
        }
        self.check_price(action.price)?;

        match board {
            BoardSnapshot::Empty => features[0] = 1.0,
            BoardSnapshot::Ask(price) => {
                self.check_price(price)?;
                features[1] = 1.0;
                features[BOARD_FLAGS + price as usize] = 1.0;
            }
            BoardSnapshot::Bid(price) => {
                self.check_price(price)?;
                features[2] = 1.0;
                features[BOARD_FLAGS + price as usize] = 1.0;
            }
        }

        let action_start = self.board_width();
        match action.role {
            Role::Buyer => features[action_start] = 1.0,
            Role::Seller => features[action_start + 1] = 1.0,
        }
        features[action_start + ACTION_FLAGS + action.price as usize] = 1.0;
        Ok(())
    }

    /// Recover the (board, action) pair that produced `features`
    pub fn decode(&self, features: &[f32]) -> Result<(BoardSnapshot, Action), EncodingError> {
        if features.len() != self.width() {
            return Err(EncodingError::WrongWidth {
                expected: self.width(),
                actual: features.len(),
            });
        }
        if let Some((index, &value)) = features
            .iter()
            .enumerate()
            .find(|(_, v)| **v != 0.0 && **v != 1.0)
        {
            return Err(EncodingError::NotOneHot { index, value });
        }

        let (board_part, action_part) = features.split_at(self.board_width());

        let board_flag = single_flag("board", &board_part[..BOARD_FLAGS])?;
        let board_prices = set_slots(&board_part[BOARD_FLAGS..]);
        let board = match board_flag {
            0 => {
                expect_slots("board", &board_prices, 0)?;
                BoardSnapshot::Empty
            }
            flag => {
                expect_slots("board", &board_prices, 1)?;
                let price = board_prices[0] as Price;
                if flag == 1 {
                    BoardSnapshot::Ask(price)
                } else {
                    BoardSnapshot::Bid(price)
                }
            }
        };

        let role = match single_flag("action", &action_part[..ACTION_FLAGS])? {
            0 => Role::Buyer,
            _ => Role::Seller,
        };
        let action_prices = set_slots(&action_part[ACTION_FLAGS..]);
        expect_slots("action", &action_prices, 1)?;

        Ok((
            board,
            Action {
                role,
                price: action_prices[0] as Price,
            },
        ))
    }
}

fn set_slots(slots: &[f32]) -> Vec<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == 1.0)
        .map(|(i, _)| i)
        .collect()
}

fn single_flag(segment: &'static str, flags: &[f32]) -> Result<usize, EncodingError> {
    let set = set_slots(flags);
    match set.as_slice() {
        [flag] => Ok(*flag),
        _ => Err(EncodingError::KindFlags {
            segment,
            count: set.len(),
        }),
    }
}

fn expect_slots(segment: &'static str, set: &[usize], expected: usize) -> Result<(), EncodingError> {
    if set.len() == expected {
        Ok(())
    } else {
        Err(EncodingError::PriceSlots {
            segment,
            count: set.len(),
            expected,
        })
    }
}
