//! Demo data for an empty store, enabled with `roster.seed_on_empty`.

use models::{Class, Student};
use tracing::{info, warn};

use crate::roster::RosterStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already had classes; nothing written.
    Skipped { existing: usize },
    Seeded { classes: usize, students: usize },
    /// The store could not be checked, so seeding was not attempted.
    CheckFailed,
}

fn demo_classes() -> Vec<Class> {
    vec![
        Class::new("C2024_RS01", "2024 Rust Systems Class 1"),
        Class::new("C2024_DB02", "2024 Databases Class 2"),
    ]
}

fn demo_students() -> Vec<Student> {
    vec![
        Student::new("S_RS01_001", "Alice", "C2024_RS01"),
        Student::new("S_RS01_002", "Bob", "C2024_RS01"),
        Student::new("S_RS01_003", "Charlie", "C2024_RS01"),
        Student::new("S_DB02_001", "David", "C2024_DB02"),
    ]
}

/// Insert the demo roster when no class is registered yet. Individual write
/// failures are logged and do not stop the rest.
pub async fn seed_if_empty(roster: &RosterStore) -> SeedOutcome {
    let existing = match roster.class_count().await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "cannot check for existing classes; skipping seed data");
            return SeedOutcome::CheckFailed;
        }
    };
    if existing > 0 {
        info!(existing, "existing classes found; skipping seed data");
        return SeedOutcome::Skipped { existing };
    }

    info!("no classes found; adding seed data");
    let mut classes = 0;
    for class in demo_classes() {
        match roster.add_class(&class).await {
            Ok(()) => classes += 1,
            Err(e) => warn!(class_id = %class.id, error = %e, "failed to add seed class"),
        }
    }
    let mut students = 0;
    for student in demo_students() {
        match roster.add_student(&student).await {
            Ok(_) => students += 1,
            Err(e) => warn!(student_id = %student.id, error = %e, "failed to add seed student"),
        }
    }
    info!(classes, students, "seed data added");
    SeedOutcome::Seeded { classes, students }
}
