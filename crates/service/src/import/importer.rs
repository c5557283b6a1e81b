use models::{Class, Student};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::sheet::{self, Row};
use crate::errors::ServiceError;
use crate::roster::RosterStore;

/// Outcome of one import. Partial success is the normal case: skipped rows
/// and failed records are reported, not raised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported_count: usize,
    pub class_id: String,
    /// The target class did not exist and was created for this import.
    pub class_created: bool,
    /// 1-based sheet row numbers skipped for a missing ID or name.
    pub skipped_rows: Vec<usize>,
    /// Candidates the roster store rejected.
    pub failed_count: usize,
}

/// Turn sheet rows into students of `class_id`.
///
/// Row 0 is the header. Column 0 is the student ID, column 1 the name;
/// missing cells count as empty. Returns the candidates and the 1-based
/// numbers of rows skipped for an empty ID or name.
pub fn student_candidates(rows: &[Row], class_id: &str) -> (Vec<Student>, Vec<usize>) {
    let mut students = Vec::new();
    let mut skipped = Vec::new();
    for (i, row) in rows.iter().enumerate().skip(1) {
        let id = row.first().map(|s| s.trim()).unwrap_or_default();
        let name = row.get(1).map(|s| s.trim()).unwrap_or_default();
        if id.is_empty() || name.is_empty() {
            warn!(row = i + 1, student_id = %id, name = %name, "skipping row with missing ID or name");
            skipped.push(i + 1);
            continue;
        }
        students.push(Student::new(id, name, class_id));
    }
    (students, skipped)
}

/// Bulk-imports students into one class through the roster store, one
/// record at a time.
#[derive(Clone)]
pub struct StudentImporter {
    roster: RosterStore,
}

impl StudentImporter {
    pub fn new(roster: RosterStore) -> Self { Self { roster } }

    /// Import an uploaded workbook. The target class is ensured first; an
    /// unreadable workbook fails with `Format` before any student is written.
    #[instrument(skip(self, bytes), fields(class_id = %class_id, size = bytes.len()))]
    pub async fn import_workbook(&self, bytes: Vec<u8>, class_id: &str) -> Result<ImportReport, ServiceError> {
        let class_created = self.prepare_class(class_id).await?;

        let rows = tokio::task::spawn_blocking(move || sheet::read_rows(&bytes))
            .await
            .map_err(|e| ServiceError::Format(format!("workbook reader task failed: {e}")))??;

        Ok(self.submit(&rows, class_id, class_created).await)
    }

    /// Import rows already extracted from a sheet (header row included).
    pub async fn import_rows(&self, rows: &[Row], class_id: &str) -> Result<ImportReport, ServiceError> {
        let class_created = self.prepare_class(class_id).await?;
        Ok(self.submit(rows, class_id, class_created).await)
    }

    async fn prepare_class(&self, class_id: &str) -> Result<bool, ServiceError> {
        if class_id.trim().is_empty() {
            return Err(ServiceError::Validation("import target class ID cannot be empty".into()));
        }
        self.roster
            .ensure_class(class_id, Class::imported)
            .await
            .map_err(|e| e.context("failed to prepare import target class"))
    }

    async fn submit(&self, rows: &[Row], class_id: &str, class_created: bool) -> ImportReport {
        let (students, skipped_rows) = student_candidates(rows, class_id);
        info!(class_id = %class_id, candidates = students.len(), skipped = skipped_rows.len(), "importing students");

        let mut imported_count = 0;
        let mut failed_count = 0;
        for student in &students {
            match self.roster.add_student(student).await {
                Ok(_) => imported_count += 1,
                Err(e) => {
                    warn!(student_id = %student.id, name = %student.name, error = %e, "failed to add student during import");
                    failed_count += 1;
                }
            }
        }

        info!(class_id = %class_id, imported_count, failed_count, "import finished");
        ImportReport {
            imported_count,
            class_id: class_id.to_string(),
            class_created,
            skipped_rows,
            failed_count,
        }
    }
}
