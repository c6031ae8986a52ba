//! Price domain
//!
//! Every quote, action and trade lives on the bounded integer grid
//! `[0, price_max]` shared by all agents and the book.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer price on the `[0, price_max]` grid
pub type Price = u32;

/// Errors raised when a price does not belong to the domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price {price} outside domain [0, {max}]")]
    OutOfDomain { price: i64, max: Price },

    #[error("price domain needs price_max >= 1, got {0}")]
    EmptyDomain(Price),
}

/// The bounded price space `[0, max]`
///
/// # Example
/// ```
/// use market_simulator_core_rs::PriceDomain;
///
/// let domain = PriceDomain::new(200).unwrap();
/// assert!(domain.contains(200));
/// assert!(domain.validate(201).is_err());
/// assert_eq!(domain.slots(), 201);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDomain {
    max: Price,
}

impl PriceDomain {
    pub fn new(max: Price) -> Result<Self, PriceError> {
        if max < 1 {
            return Err(PriceError::EmptyDomain(max));
        }
        Ok(Self { max })
    }

    pub fn max(&self) -> Price {
        self.max
    }

    /// Number of distinct prices (`max + 1`), the width of a price one-hot
    pub fn slots(&self) -> usize {
        self.max as usize + 1
    }

    pub fn contains(&self, price: Price) -> bool {
        price <= self.max
    }

    /// Check a raw (possibly negative) price against the domain
    pub fn validate(&self, price: i64) -> Result<Price, PriceError> {
        if price < 0 || price > self.max as i64 {
            return Err(PriceError::OutOfDomain {
                price,
                max: self.max,
            });
        }
        Ok(price as Price)
    }

    /// Whether the open interval `(0, max)` holds at least one price
    pub fn has_interior(&self) -> bool {
        self.max >= 2
    }
}
