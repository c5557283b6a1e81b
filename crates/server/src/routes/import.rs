use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use service::import::ImportReport;
use tracing::{info, warn};

use crate::errors::JsonApiError;
use crate::observability;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: ImportReport,
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// 导入学生：multipart 表单字段 `classId` 与 `file`
#[utoipa::path(post, path = "/api/import/students", tag = "import", request_body(content = crate::openapi::ImportFormDoc, content_type = "multipart/form-data"), responses((status = 200, description = "Import finished", body = crate::openapi::ImportResponseDoc), (status = 400, description = "Missing classId or file"), (status = 500, description = "Unreadable workbook or store failure")))]
pub async fn import_students(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, JsonApiError> {
    observability::IMPORT_REQUESTS_TOTAL.inc();

    let mut class_id: Option<String> = None;
    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JsonApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("classId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| JsonApiError::bad_request(format!("Invalid 'classId' field: {e}")))?;
                class_id = Some(text.trim().to_string());
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| JsonApiError::bad_request(format!("Error retrieving uploaded file: {e}")))?;
                upload = Some(Upload { file_name, data: data.to_vec() });
            }
            _ => {}
        }
    }

    let class_id = class_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| JsonApiError::bad_request("Missing 'classId' in form data"))?;
    let upload = upload.ok_or_else(|| JsonApiError::bad_request("Missing 'file' in form data"))?;

    info!(file_name = %upload.file_name, class_id = %class_id, size = upload.data.len(), "received student import upload");

    let report = match state.importer().import_workbook(upload.data, &class_id).await {
        Ok(report) => report,
        Err(e) => {
            observability::IMPORT_FAILURES_TOTAL.inc();
            warn!(file_name = %upload.file_name, class_id = %class_id, error = %e, "student import failed");
            return Err(e.into());
        }
    };
    observability::record_import(&report);

    Ok(Json(ImportResponse { message: "Import successful", report }))
}
