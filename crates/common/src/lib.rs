//! Pieces shared by the roster crates: tracing setup and small response types.

pub mod types;
pub mod utils;
