//! Backend key layout. Shared with existing deployments; do not change.
//!
//! | key                   | type | contents               |
//! |-----------------------|------|------------------------|
//! | `classes`             | set  | every class ID         |
//! | `class:<id>`          | hash | `id`, `name`           |
//! | `class:<id>:students` | set  | student IDs of a class |
//! | `student:<id>`        | hash | `id`, `name`, `classId`|

pub const CLASSES_KEY: &str = "classes";

const CLASS_PREFIX: &str = "class:";
const STUDENTS_SUFFIX: &str = ":students";
const STUDENT_PREFIX: &str = "student:";

pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_CLASS_ID: &str = "classId";

pub fn class_key(class_id: &str) -> String {
    format!("{CLASS_PREFIX}{class_id}")
}

pub fn class_students_key(class_id: &str) -> String {
    format!("{CLASS_PREFIX}{class_id}{STUDENTS_SUFFIX}")
}

pub fn student_key(student_id: &str) -> String {
    format!("{STUDENT_PREFIX}{student_id}")
}

/// A class ID ending in `:students` would make its record key equal to
/// another class's student set.
pub fn is_reserved_class_id(class_id: &str) -> bool {
    class_id.ends_with(STUDENTS_SUFFIX)
}
