//! Roster service layer: KV backend abstraction, the roster store that owns
//! every class/student key, and the spreadsheet importer built on top of it.
//! - Framework independent; the HTTP crate only maps results to responses.
//! - "Not found" is `Ok(None)`, never an error.

pub mod errors;
pub mod storage;
pub mod roster;
pub mod import;
pub mod seed;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
