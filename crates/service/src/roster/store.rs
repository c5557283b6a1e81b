use std::collections::HashMap;
use std::sync::Arc;

use models::{Class, Student};
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};

use super::keys;
use crate::errors::ServiceError;
use crate::storage::{KvBackend, WriteBatch};

/// What to do when a write references a class that does not exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RosterPolicy {
    /// Create a placeholder class instead of rejecting the write.
    pub auto_create_missing_class: bool,
}

impl Default for RosterPolicy {
    fn default() -> Self { Self { auto_create_missing_class: true } }
}

/// Result of [`RosterStore::add_student`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudentAdded {
    pub student: Student,
    /// The student's class did not exist and a placeholder was created.
    pub class_created: bool,
}

/// Reads and writes classes, students and their two indexes.
///
/// Cheap to clone; every clone shares the same backend handle. Lookups return
/// `Ok(None)` for entities that legitimately do not exist.
#[derive(Clone)]
pub struct RosterStore {
    backend: Arc<dyn KvBackend>,
    policy: RosterPolicy,
}

impl RosterStore {
    pub fn new(backend: Arc<dyn KvBackend>, policy: RosterPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> RosterPolicy { self.policy }

    /// Backend round-trip, used by startup to fail fast.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.backend.ping().await.map_err(|e| e.context("store ping failed"))
    }

    // --- classes ---

    /// Register the class ID and write its record in one atomic batch.
    /// An existing class with the same ID is overwritten.
    #[instrument(skip(self, class), fields(class_id = %class.id))]
    pub async fn add_class(&self, class: &Class) -> Result<(), ServiceError> {
        class.validate()?;
        check_class_id(&class.id)?;

        let batch = WriteBatch::new()
            .set_add(keys::CLASSES_KEY, class.id.as_str())
            .hash_set(keys::class_key(&class.id), class_fields(class));
        self.backend
            .apply(batch)
            .await
            .map_err(|e| e.context(format!("failed to add class {}", class.id)))?;

        info!(class_id = %class.id, name = %class.name, "class_added");
        Ok(())
    }

    /// `None` for unknown IDs, including reserved ones that can never name a
    /// class.
    pub async fn get_class(&self, class_id: &str) -> Result<Option<Class>, ServiceError> {
        if keys::is_reserved_class_id(class_id) {
            return Ok(None);
        }
        let key = keys::class_key(class_id);
        let data = self
            .backend
            .hash_get_all(&key)
            .await
            .map_err(|e| e.context(format!("failed to get class {class_id}")))?;
        if data.is_empty() {
            return Ok(None);
        }
        decode_class(&key, data).map(Some)
    }

    /// Every registered class, sorted by ID. Entries whose record cannot be
    /// read are logged and left out.
    pub async fn list_classes(&self) -> Result<Vec<Class>, ServiceError> {
        let ids = self
            .backend
            .set_members(keys::CLASSES_KEY)
            .await
            .map_err(|e| e.context("failed to get class IDs"))?;

        let mut classes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_class(&id).await {
                Ok(Some(class)) => classes.push(class),
                Ok(None) => warn!(class_id = %id, "class registered without a record; skipping"),
                Err(e) => warn!(class_id = %id, error = %e, "failed to fetch class; skipping"),
            }
        }
        classes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(classes)
    }

    pub async fn class_exists(&self, class_id: &str) -> Result<bool, ServiceError> {
        self.backend
            .set_contains(keys::CLASSES_KEY, class_id)
            .await
            .map_err(|e| e.context(format!("failed to check class {class_id}")))
    }

    pub async fn class_count(&self) -> Result<usize, ServiceError> {
        self.backend
            .set_len(keys::CLASSES_KEY)
            .await
            .map_err(|e| e.context("failed to count classes"))
    }

    /// Make sure `class_id` exists, creating `make(class_id)` when the policy
    /// allows. Returns whether a class was created.
    pub(crate) async fn ensure_class(
        &self,
        class_id: &str,
        make: fn(&str) -> Class,
    ) -> Result<bool, ServiceError> {
        if self.class_exists(class_id).await? {
            return Ok(false);
        }
        if !self.policy.auto_create_missing_class {
            return Err(ServiceError::Validation(format!("class {class_id} does not exist")));
        }

        let class = make(class_id);
        warn!(class_id = %class_id, name = %class.name, "class does not exist; creating it");
        self.add_class(&class)
            .await
            .map_err(|e| e.context(format!("class {class_id} does not exist and auto-creation failed")))?;
        Ok(true)
    }

    // --- students ---

    /// Add the student to its class's set and write its record in one atomic
    /// batch, creating a placeholder class first if needed and allowed.
    #[instrument(skip(self, student), fields(student_id = %student.id, class_id = %student.class_id))]
    pub async fn add_student(&self, student: &Student) -> Result<StudentAdded, ServiceError> {
        student.validate()?;
        check_class_id(&student.class_id)?;

        let class_created = self.ensure_class(&student.class_id, Class::placeholder).await?;

        let batch = WriteBatch::new()
            .set_add(keys::class_students_key(&student.class_id), student.id.as_str())
            .hash_set(keys::student_key(&student.id), student_fields(student));
        self.backend.apply(batch).await.map_err(|e| {
            e.context(format!("failed to add student {} to class {}", student.id, student.class_id))
        })?;

        Ok(StudentAdded { student: student.clone(), class_created })
    }

    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>, ServiceError> {
        let key = keys::student_key(student_id);
        let data = self
            .backend
            .hash_get_all(&key)
            .await
            .map_err(|e| e.context(format!("failed to get student {student_id}")))?;
        if data.is_empty() {
            return Ok(None);
        }
        decode_student(&key, data).map(Some)
    }

    /// Students of a class, sorted by ID. Empty for unknown classes.
    /// Entries that cannot be read, or whose record now points at another
    /// class, are logged and left out.
    pub async fn list_students(&self, class_id: &str) -> Result<Vec<Student>, ServiceError> {
        let ids = self
            .backend
            .set_members(&keys::class_students_key(class_id))
            .await
            .map_err(|e| e.context(format!("failed to get student IDs for class {class_id}")))?;

        let mut students = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_student(&id).await {
                Ok(Some(s)) if s.class_id == class_id => students.push(s),
                Ok(Some(s)) => warn!(
                    student_id = %id, class_id = %class_id, actual_class_id = %s.class_id,
                    "student moved to another class; skipping stale entry"
                ),
                Ok(None) => warn!(student_id = %id, class_id = %class_id, "student listed without a record; skipping"),
                Err(e) => warn!(student_id = %id, class_id = %class_id, error = %e, "failed to fetch student; skipping"),
            }
        }
        students.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(students)
    }

    /// One student of the class picked uniformly at random by the backend.
    /// `None` when the class has no students or does not exist; callers that
    /// need to tell those apart must ask [`RosterStore::class_exists`].
    pub async fn random_student(&self, class_id: &str) -> Result<Option<Student>, ServiceError> {
        let picked = self
            .backend
            .set_random_member(&keys::class_students_key(class_id))
            .await
            .map_err(|e| e.context(format!("failed to pick a random student for class {class_id}")))?;
        let Some(student_id) = picked else {
            return Ok(None);
        };

        match self.get_student(&student_id).await? {
            Some(s) if s.class_id == class_id => Ok(Some(s)),
            _ => {
                warn!(student_id = %student_id, class_id = %class_id, "random pick hit a stale entry; choosing among valid students");
                let students = self.list_students(class_id).await?;
                Ok(students.choose(&mut rand::thread_rng()).cloned())
            }
        }
    }
}

fn check_class_id(class_id: &str) -> Result<(), ServiceError> {
    if keys::is_reserved_class_id(class_id) {
        return Err(ServiceError::Validation(format!(
            "class ID {class_id} collides with the student index key layout"
        )));
    }
    Ok(())
}

fn class_fields(class: &Class) -> [(&'static str, String); 2] {
    [
        (keys::FIELD_ID, class.id.clone()),
        (keys::FIELD_NAME, class.name.clone()),
    ]
}

fn student_fields(student: &Student) -> [(&'static str, String); 3] {
    [
        (keys::FIELD_ID, student.id.clone()),
        (keys::FIELD_NAME, student.name.clone()),
        (keys::FIELD_CLASS_ID, student.class_id.clone()),
    ]
}

fn take_field(
    key: &str,
    data: &mut HashMap<String, String>,
    field: &str,
) -> Result<String, ServiceError> {
    data.remove(field)
        .ok_or_else(|| ServiceError::Store(format!("record {key} is missing field {field}")))
}

fn decode_class(key: &str, mut data: HashMap<String, String>) -> Result<Class, ServiceError> {
    Ok(Class {
        id: take_field(key, &mut data, keys::FIELD_ID)?,
        name: take_field(key, &mut data, keys::FIELD_NAME)?,
    })
}

fn decode_student(key: &str, mut data: HashMap<String, String>) -> Result<Student, ServiceError> {
    Ok(Student {
        id: take_field(key, &mut data, keys::FIELD_ID)?,
        name: take_field(key, &mut data, keys::FIELD_NAME)?,
        class_id: take_field(key, &mut data, keys::FIELD_CLASS_ID)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::test_support::{memory_roster, FlakyBackend};

    #[tokio::test]
    async fn add_then_get_class_round_trips() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        let class = Class::new("C2024_RS01", "2024 Rust Systems 1");
        roster.add_class(&class).await?;

        assert_eq!(roster.get_class("C2024_RS01").await?, Some(class));
        assert!(roster.class_exists("C2024_RS01").await?);
        assert_eq!(roster.class_count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn add_class_overwrites_existing_record() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        roster.add_class(&Class::new("C1", "Old")).await?;
        roster.add_class(&Class::new("C1", "New")).await?;

        assert_eq!(roster.get_class("C1").await?.map(|c| c.name), Some("New".to_string()));
        assert_eq!(roster.class_count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_backend() {
        let flaky = Arc::new(FlakyBackend::new());
        flaky.fail_writes(true);
        let roster = RosterStore::new(flaky, RosterPolicy::default());

        // writes would fail with Store; validation must win first
        let res = roster.add_class(&Class::new("", "x")).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        let res = roster.add_student(&Student::new("S1", "Ann", "")).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        let res = roster.add_class(&Class::new("C1:students", "x")).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_entities_are_absent_not_errors() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        assert_eq!(roster.get_class("nope").await?, None);
        assert_eq!(roster.get_student("nope").await?, None);
        assert_eq!(roster.random_student("nope").await?, None);
        assert!(roster.list_classes().await?.is_empty());
        assert!(roster.list_students("nope").await?.is_empty());
        assert!(!roster.class_exists("nope").await?);
        Ok(())
    }

    #[tokio::test]
    async fn reserved_class_id_reads_as_absent() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        roster.add_student(&Student::new("S1", "Ann", "C1")).await?;

        // `class:C1:students` is C1's student set, not a class record
        assert_eq!(roster.get_class("C1:students").await?, None);
        assert!(!roster.class_exists("C1:students").await?);
        Ok(())
    }

    #[tokio::test]
    async fn add_student_auto_creates_class() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        let added = roster.add_student(&Student::new("S1", "Ann", "C9")).await?;
        assert!(added.class_created);

        assert_eq!(roster.get_class("C9").await?, Some(Class::new("C9", "Class C9")));
        assert_eq!(roster.get_student("S1").await?, Some(Student::new("S1", "Ann", "C9")));
        let ids: Vec<String> = roster.list_students("C9").await?.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["S1".to_string()]);

        // second student: class already there
        let added = roster.add_student(&Student::new("S2", "Bo", "C9")).await?;
        assert!(!added.class_created);
        Ok(())
    }

    #[tokio::test]
    async fn strict_policy_rejects_unknown_class() -> Result<(), anyhow::Error> {
        let roster = RosterStore::new(
            Arc::new(MemoryBackend::new()),
            RosterPolicy { auto_create_missing_class: false },
        );
        let res = roster.add_student(&Student::new("S1", "Ann", "C9")).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        assert!(!roster.class_exists("C9").await?);
        assert_eq!(roster.get_student("S1").await?, None);

        roster.add_class(&Class::new("C9", "Nine")).await?;
        roster.add_student(&Student::new("S1", "Ann", "C9")).await?;
        assert!(roster.get_student("S1").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn list_classes_sorted_and_skips_unreadable() -> Result<(), anyhow::Error> {
        let flaky = Arc::new(FlakyBackend::new());
        let roster = RosterStore::new(flaky.clone(), RosterPolicy::default());
        roster.add_class(&Class::new("B", "Bee")).await?;
        roster.add_class(&Class::new("A", "Ay")).await?;
        roster.add_class(&Class::new("C", "Cee")).await?;

        let ids: Vec<String> = roster.list_classes().await?.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        flaky.fail_reads_of(keys::class_key("B"));
        let ids: Vec<String> = roster.list_classes().await?.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["A", "C"]);

        // a single-entity read surfaces the failure
        assert!(matches!(roster.get_class("B").await, Err(ServiceError::Store(_))));
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_record_is_store_error_and_skipped_in_listing() -> Result<(), anyhow::Error> {
        let backend = Arc::new(MemoryBackend::new());
        let roster = RosterStore::new(backend.clone(), RosterPolicy::default());
        roster.add_class(&Class::new("C1", "One")).await?;
        roster.add_student(&Student::new("S1", "Ann", "C1")).await?;

        // index entry whose record lacks `name`
        backend
            .apply(
                WriteBatch::new()
                    .set_add(keys::class_students_key("C1"), "S2")
                    .hash_set(keys::student_key("S2"), [("id", "S2"), ("classId", "C1")]),
            )
            .await?;

        assert!(matches!(roster.get_student("S2").await, Err(ServiceError::Store(_))));
        let ids: Vec<String> = roster.list_students("C1").await?.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["S1".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn list_students_skips_failed_reads() -> Result<(), anyhow::Error> {
        let flaky = Arc::new(FlakyBackend::new());
        let roster = RosterStore::new(flaky.clone(), RosterPolicy::default());
        for (id, name) in [("S1", "Ann"), ("S2", "Bo"), ("S3", "Cy")] {
            roster.add_student(&Student::new(id, name, "C1")).await?;
        }
        flaky.fail_reads_of(keys::student_key("S2"));

        let ids: Vec<String> = roster.list_students("C1").await?.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["S1", "S3"]);
        Ok(())
    }

    #[tokio::test]
    async fn random_student_belongs_to_class() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        roster.add_class(&Class::new("C1", "One")).await?;
        assert_eq!(roster.random_student("C1").await?, None);

        for (id, name) in [("S1", "Ann"), ("S2", "Bo"), ("S3", "Cy")] {
            roster.add_student(&Student::new(id, name, "C1")).await?;
        }
        roster.add_student(&Student::new("X1", "Other", "C2")).await?;

        for _ in 0..25 {
            let s = roster.random_student("C1").await?.expect("class has students");
            assert_eq!(s.class_id, "C1");
        }
        Ok(())
    }

    #[tokio::test]
    async fn moved_student_leaves_stale_entry_that_readers_ignore() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        roster.add_student(&Student::new("S1", "Ann", "C1")).await?;
        roster.add_student(&Student::new("S1", "Ann", "C2")).await?;

        assert!(roster.list_students("C1").await?.is_empty());
        assert_eq!(roster.list_students("C2").await?.len(), 1);
        // only candidate in C1 is stale, so the fallback finds nobody
        assert_eq!(roster.random_student("C1").await?, None);
        assert_eq!(roster.random_student("C2").await?.map(|s| s.id), Some("S1".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_adds_of_same_id_leave_one_record() -> Result<(), anyhow::Error> {
        let roster = memory_roster();
        roster.add_class(&Class::new("C1", "One")).await?;

        let a = roster.clone();
        let b = roster.clone();
        let (ra, rb) = tokio::join!(
            async move { a.add_student(&Student::new("S1", "Ann", "C1")).await },
            async move { b.add_student(&Student::new("S1", "Anne", "C1")).await },
        );
        ra?;
        rb?;

        let students = roster.list_students("C1").await?;
        assert_eq!(students.len(), 1);
        let name = &students[0].name;
        assert!(name == "Ann" || name == "Anne");
        assert_eq!(roster.get_student("S1").await?.map(|s| s.name).as_ref(), Some(name));
        Ok(())
    }

    #[tokio::test]
    async fn backend_write_failure_is_store_error() {
        let flaky = Arc::new(FlakyBackend::new());
        flaky.fail_writes(true);
        let roster = RosterStore::new(flaky, RosterPolicy::default());

        let err = roster.add_class(&Class::new("C1", "One")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(err.to_string().contains("failed to add class C1"));
    }
}
