use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};
use service::import::ImportReport;

// Prometheus metrics (default registry)
pub static CLASSES_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rollcall_classes_created_total",
        "Classes created through the API"
    )
    .expect("register classes_created_total")
});

pub static STUDENTS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rollcall_students_created_total",
        "Students written through the API or imports"
    )
    .expect("register students_created_total")
});

pub static CLASSES_AUTO_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rollcall_classes_auto_created_total",
        "Placeholder classes created for unknown class IDs"
    )
    .expect("register classes_auto_created_total")
});

pub static IMPORT_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rollcall_import_requests_total",
        "Spreadsheet import requests received"
    )
    .expect("register import_requests_total")
});

pub static IMPORT_ROWS_SKIPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rollcall_import_rows_skipped_total",
        "Sheet rows skipped for a missing ID or name"
    )
    .expect("register import_rows_skipped_total")
});

pub static IMPORT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rollcall_import_failures_total",
        "Imports that failed before any student was written"
    )
    .expect("register import_failures_total")
});

pub fn record_import(report: &ImportReport) {
    STUDENTS_CREATED_TOTAL.inc_by(report.imported_count as u64);
    IMPORT_ROWS_SKIPPED_TOTAL.inc_by(report.skipped_rows.len() as u64);
    if report.class_created {
        CLASSES_AUTO_CREATED_TOTAL.inc();
    }
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

/// Touch every counter so they appear in `/metrics` before first use.
pub fn init() {
    Lazy::force(&CLASSES_CREATED_TOTAL);
    Lazy::force(&STUDENTS_CREATED_TOTAL);
    Lazy::force(&CLASSES_AUTO_CREATED_TOTAL);
    Lazy::force(&IMPORT_REQUESTS_TOTAL);
    Lazy::force(&IMPORT_ROWS_SKIPPED_TOTAL);
    Lazy::force(&IMPORT_FAILURES_TOTAL);
}
