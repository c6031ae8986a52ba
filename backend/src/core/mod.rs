//! Core timekeeping for the market simulation

pub mod period;
