use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// A student enrolled in exactly one class. Serialized with `classId` for
/// compatibility with existing clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class_id: String,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), class_id: class_id.into() }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id.trim().is_empty() || self.name.trim().is_empty() || self.class_id.trim().is_empty() {
            return Err(ModelError::Validation(
                "student ID, Name, and ClassID cannot be empty".into(),
            ));
        }
        Ok(())
    }
}
