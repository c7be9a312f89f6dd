//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use axum::http::{HeaderName, HeaderValue};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestServer};
use geolayers::config::Settings;
use geolayers::database::seed_data::seed_demo_data;
use geolayers::database::{establish_connection, setup_database};
use geolayers::server::app::create_app;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

pub const SITE_URL: &str = "http://testserver";

/// A migrated, seeded database in a temporary file.
pub async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = establish_connection(&db_url).await?;
    setup_database(&db).await?;
    seed_demo_data(&db).await?;

    Ok((db, temp_file))
}

/// A test server over a seeded database, plus a handle on that database.
pub async fn setup_test_server() -> Result<(TestServer, DatabaseConnection, NamedTempFile)> {
    let (db, temp_file) = setup_test_db().await?;

    let settings = Settings {
        site_url: SITE_URL.to_string(),
        ..Settings::default()
    };
    let app = create_app(db.clone(), settings).await?;
    let server = TestServer::new(app)?;

    Ok((server, db, temp_file))
}

/// Logs in through the API and returns the session token.
pub async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/account/login")
        .json(&json!({ "username": username, "password": password }))
        .await;
    let body: Value = response.json();
    body["token"]
        .as_str()
        .unwrap_or_else(|| panic!("login failed for {}: {}", username, body))
        .to_string()
}

pub fn with_token(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {}", token)).expect("valid header"),
    )
}

/// Upload form with one empty file per name, keyed by upload field.
pub fn upload_form(files: &[(&str, &str)]) -> MultipartForm {
    files.iter().fold(MultipartForm::new(), |form, (field, file_name)| {
        form.add_part(
            field.to_string(),
            Part::bytes(b" ".as_slice()).file_name(file_name.to_string()),
        )
    })
}
