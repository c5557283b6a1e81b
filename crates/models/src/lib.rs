//! Roster entities shared by the service and HTTP layers.

pub mod errors;
pub mod class;
pub mod student;

pub use class::Class;
pub use student::Student;
