//! Agent actions
//!
//! An action is the ephemeral quote an agent sends to the book in one step:
//! a side and a limit price. It is consumed immediately by matching.

use super::price::Price;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side taken by an agent in a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Role::Buyer => Role::Seller,
            Role::Seller => Role::Buyer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single quote submitted to the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub role: Role,
    pub price: Price,
}

impl Action {
    pub fn buy(price: Price) -> Self {
        Self {
            role: Role::Buyer,
            price,
        }
    }

    pub fn sell(price: Price) -> Self {
        Self {
            role: Role::Seller,
            price,
        }
    }
}
