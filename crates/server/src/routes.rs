use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::{Health, Pong};

use crate::observability;
use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod classes;
pub mod import;

#[utoipa::path(get, path = "/health", tag = "meta", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

#[utoipa::path(get, path = "/api/ping", tag = "meta", responses((status = 200, description = "Pong")))]
pub async fn ping() -> Json<Pong> {
    Json(Pong::default())
}

async fn metrics() -> (StatusCode, String) {
    observability::encode_metrics()
}

/// Build the application router: roster API under `/api`, plus health,
/// metrics and API docs.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api = Router::new()
        .route("/classes", get(classes::list_classes).post(classes::create_class))
        .route("/classes/:class_id", get(classes::get_class))
        .route(
            "/classes/:class_id/students",
            get(classes::list_students).post(classes::add_student),
        )
        .route("/classes/:class_id/random-student", get(classes::random_student))
        .route("/import/students", post(import::import_students).layer(upload_limit))
        .route("/ping", get(ping));

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // one INFO span per request with method and path
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // status code and latency
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
