//! Roster store: the only code that reads or writes class/student keys.

pub mod keys;
pub mod store;

pub use store::{RosterPolicy, RosterStore, StudentAdded};
