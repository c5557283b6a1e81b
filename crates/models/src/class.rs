use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// A named group of students.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
}

impl Class {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    /// Placeholder created when a student references an unknown class.
    pub fn placeholder(id: &str) -> Self {
        Self::new(id, format!("Class {id}"))
    }

    /// Placeholder created when an import targets an unknown class.
    pub fn imported(id: &str) -> Self {
        Self::new(id, format!("Imported Class {id}"))
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id.trim().is_empty() || self.name.trim().is_empty() {
            return Err(ModelError::Validation("class ID and Name cannot be empty".into()));
        }
        Ok(())
    }
}
