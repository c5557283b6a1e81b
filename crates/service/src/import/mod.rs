//! Bulk student import from spreadsheet uploads.

pub mod sheet;
pub mod importer;

pub use importer::{student_candidates, ImportReport, StudentImporter};
