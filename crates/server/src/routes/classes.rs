use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use models::{Class, Student};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::JsonApiError;
use crate::observability;
use crate::state::AppState;

/// Body of `POST /api/classes`. Missing fields deserialize as empty and are
/// rejected by validation.
#[derive(Debug, Deserialize)]
pub struct NewClass {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /api/classes/:class_id/students`.
#[derive(Debug, Deserialize)]
pub struct NewStudent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreated {
    pub student: Student,
    pub class_created: bool,
}

fn invalid_body(rejection: JsonRejection) -> JsonApiError {
    JsonApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
}

/// 列出所有班级
#[utoipa::path(get, path = "/api/classes", tag = "classes", responses((status = 200, description = "All classes", body = [crate::openapi::ClassDoc]), (status = 500, description = "Store failure")))]
pub async fn list_classes(State(state): State<AppState>) -> Result<Json<Vec<Class>>, JsonApiError> {
    let classes = state.roster.list_classes().await?;
    Ok(Json(classes))
}

/// 获取指定班级
#[utoipa::path(get, path = "/api/classes/{class_id}", tag = "classes", params(("class_id" = String, Path, description = "Class ID")), responses((status = 200, description = "Class", body = crate::openapi::ClassDoc), (status = 404, description = "Class not found")))]
pub async fn get_class(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<Class>, JsonApiError> {
    match state.roster.get_class(&class_id).await? {
        Some(class) => Ok(Json(class)),
        None => Err(JsonApiError::not_found("Class not found")),
    }
}

/// 创建班级
#[utoipa::path(post, path = "/api/classes", tag = "classes", request_body = crate::openapi::ClassDoc, responses((status = 201, description = "Created", body = crate::openapi::ClassDoc), (status = 400, description = "Missing id or name")))]
pub async fn create_class(
    State(state): State<AppState>,
    payload: Result<Json<NewClass>, JsonRejection>,
) -> Result<(StatusCode, Json<Class>), JsonApiError> {
    let Json(input) = payload.map_err(invalid_body)?;
    let class = Class::new(input.id.trim(), input.name.trim());
    if class.id.is_empty() || class.name.is_empty() {
        return Err(JsonApiError::bad_request("Class ID and Name are required"));
    }
    state.roster.add_class(&class).await?;
    observability::CLASSES_CREATED_TOTAL.inc();
    Ok((StatusCode::CREATED, Json(class)))
}

/// 列出班级学生
#[utoipa::path(get, path = "/api/classes/{class_id}/students", tag = "students", params(("class_id" = String, Path, description = "Class ID")), responses((status = 200, description = "Students of the class", body = [crate::openapi::StudentDoc]), (status = 404, description = "Class not found")))]
pub async fn list_students(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<Vec<Student>>, JsonApiError> {
    if !state.roster.class_exists(&class_id).await? {
        return Err(JsonApiError::not_found("Class not found"));
    }
    let students = state.roster.list_students(&class_id).await?;
    Ok(Json(students))
}

/// 向班级添加学生（班级不存在时按策略自动创建）
#[utoipa::path(post, path = "/api/classes/{class_id}/students", tag = "students", params(("class_id" = String, Path, description = "Class ID")), request_body = crate::openapi::NewStudentDoc, responses((status = 201, description = "Created", body = crate::openapi::StudentCreatedDoc), (status = 400, description = "Validation error")))]
pub async fn add_student(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    payload: Result<Json<NewStudent>, JsonRejection>,
) -> Result<(StatusCode, Json<StudentCreated>), JsonApiError> {
    let Json(input) = payload.map_err(invalid_body)?;
    let student = Student::new(input.id.trim(), input.name.trim(), class_id);
    let added = state.roster.add_student(&student).await?;

    observability::STUDENTS_CREATED_TOTAL.inc();
    if added.class_created {
        observability::CLASSES_AUTO_CREATED_TOTAL.inc();
        info!(class_id = %added.student.class_id, "class auto-created for new student");
    }
    Ok((
        StatusCode::CREATED,
        Json(StudentCreated { student: added.student, class_created: added.class_created }),
    ))
}

/// 随机点名
#[utoipa::path(get, path = "/api/classes/{class_id}/random-student", tag = "students", params(("class_id" = String, Path, description = "Class ID")), responses((status = 200, description = "A random student", body = crate::openapi::StudentDoc), (status = 404, description = "Class not found, or no students in the class")))]
pub async fn random_student(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
) -> Result<Json<Student>, JsonApiError> {
    if let Some(student) = state.roster.random_student(&class_id).await? {
        return Ok(Json(student));
    }
    if state.roster.class_exists(&class_id).await? {
        Err(JsonApiError::not_found("No students found in this class"))
    } else {
        Err(JsonApiError::not_found("Class not found"))
    }
}
