use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode as HttpStatusCode;
use serde_json::json;
use service::roster::{RosterPolicy, RosterStore};
use service::storage::MemoryBackend;
use service::test_support::xlsx_fixture;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use server::{routes, state::AppState};

struct TestApp {
    base_url: String,
    roster: RosterStore,
}

async fn start_server(max_upload_bytes: usize) -> anyhow::Result<TestApp> {
    let roster = RosterStore::new(Arc::new(MemoryBackend::new()), RosterPolicy::default());
    let state = AppState::new(roster.clone(), max_upload_bytes);

    let app: Router = routes::build_router(state, CorsLayer::very_permissive());
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, roster })
}

fn xlsx_part(bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name("students.xlsx")
}

#[tokio::test]
async fn e2e_import_three_row_sheet() -> anyhow::Result<()> {
    let app = start_server(1024 * 1024).await?;
    let c = reqwest::Client::new();

    let sheet = xlsx_fixture(&[&["Student ID", "Name"], &["S1", "Ann"], &["S2", "Bo"]]);
    let form = Form::new().text("classId", "C1").part("file", xlsx_part(sheet));
    let res = c.post(format!("{}/api/import/students", app.base_url)).multipart(form).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["importedCount"], 2);
    assert_eq!(body["classId"], "C1");
    assert_eq!(body["classCreated"], true);
    assert_eq!(body["message"], "Import successful");

    let res = c.get(format!("{}/api/classes/C1/students", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let students = res.json::<serde_json::Value>().await?;
    assert_eq!(students, json!([
        {"id": "S1", "name": "Ann", "classId": "C1"},
        {"id": "S2", "name": "Bo", "classId": "C1"},
    ]));
    Ok(())
}

#[tokio::test]
async fn e2e_import_skips_row_without_name() -> anyhow::Result<()> {
    let app = start_server(1024 * 1024).await?;
    let c = reqwest::Client::new();

    let sheet = xlsx_fixture(&[&["id", "name"], &["S1", "Ann"], &["S2", ""], &["S3", "Cy"]]);
    let form = Form::new().text("classId", "C2").part("file", xlsx_part(sheet));
    let res = c.post(format!("{}/api/import/students", app.base_url)).multipart(form).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["importedCount"], 2);
    assert_eq!(body["skippedRows"], json!([3]));
    assert_eq!(app.roster.list_students("C2").await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn e2e_import_missing_fields_is_400() -> anyhow::Result<()> {
    let app = start_server(1024 * 1024).await?;
    let c = reqwest::Client::new();

    let form = Form::new().part("file", xlsx_part(xlsx_fixture(&[&["id", "name"]])));
    let res = c.post(format!("{}/api/import/students", app.base_url)).multipart(form).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    let form = Form::new().text("classId", "C1");
    let res = c.post(format!("{}/api/import/students", app.base_url)).multipart(form).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "Missing 'file' in form data");
    Ok(())
}

#[tokio::test]
async fn e2e_import_garbage_file_is_500() -> anyhow::Result<()> {
    let app = start_server(1024 * 1024).await?;
    let c = reqwest::Client::new();

    let form = Form::new()
        .text("classId", "C3")
        .part("file", Part::bytes(b"id,name\nS1,Ann\n".to_vec()).file_name("students.csv"));
    let res = c.post(format!("{}/api/import/students", app.base_url)).multipart(form).send().await?;
    assert_eq!(res.status(), HttpStatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], "Import Failed");
    assert!(app.roster.list_students("C3").await?.is_empty());
    Ok(())
}
