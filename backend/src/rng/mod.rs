//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: Every draw in the market (valuations, agent selection, roles,
//! candidate prices) MUST go through this module, in the documented order.

mod xorshift;

pub use xorshift::RngManager;
