use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct ClassDoc { pub id: String, pub name: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentDoc { pub id: String, pub name: String, pub class_id: String }

#[derive(ToSchema)]
pub struct NewStudentDoc { pub id: String, pub name: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreatedDoc { pub student: StudentDoc, pub class_created: bool }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportFormDoc {
    pub class_id: String,
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponseDoc {
    pub message: String,
    pub imported_count: usize,
    pub class_id: String,
    pub class_created: bool,
    pub skipped_rows: Vec<usize>,
    pub failed_count: usize,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::ping,
        crate::routes::classes::list_classes,
        crate::routes::classes::get_class,
        crate::routes::classes::create_class,
        crate::routes::classes::list_students,
        crate::routes::classes::add_student,
        crate::routes::classes::random_student,
        crate::routes::import::import_students,
    ),
    components(schemas(
        HealthResponse,
        ClassDoc,
        StudentDoc,
        NewStudentDoc,
        StudentCreatedDoc,
        ImportFormDoc,
        ImportResponseDoc,
    )),
    tags(
        (name = "meta", description = "Health and liveness"),
        (name = "classes", description = "Class roster"),
        (name = "students", description = "Students within a class"),
        (name = "import", description = "Spreadsheet import"),
    )
)]
pub struct ApiDoc;
