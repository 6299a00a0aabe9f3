//! Routing, CORS and request-level errors.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum_test::multipart::{MultipartForm, Part};
use rstest::rstest;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::common::{TestApp, pdf_form, sample_pdf};
use pdfforge::config::Config;
use pdfforge::server::{AppState, router};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "ok": true }));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;
    let response = app.server.get("/rotate").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_merge_requires_post() {
    let app = TestApp::new().await;
    let response = app.server.get("/merge").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let app = TestApp::new().await;

    let response = app
        .server
        .method(Method::OPTIONS, "/merge")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5500"))
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        )
        .await;

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5500"
    );
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn test_cors_exposes_content_disposition() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/merge")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://127.0.0.1:5500"))
        .multipart(pdf_form(
            "pdfs",
            vec![("a.pdf", sample_pdf("a", 1)), ("b.pdf", sample_pdf("b", 1))],
        ))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let exposed = response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-disposition"));
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/health")
        .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.example"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key(HeaderName::from_static("access-control-allow-origin"))
    );
}

#[tokio::test]
async fn test_unexpected_file_field_is_rejected() {
    let app = TestApp::new().await;
    let form = pdf_form("document", vec![("a.pdf", sample_pdf("a", 1))]);

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_UPLOAD");
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_rejected() {
    let app = TestApp::new().await;

    let response = app.server.post("/merge").text("hello").await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_upload_over_limit_is_413() {
    let app = TestApp::with_config(|config, _| config.max_upload_mb = 1).await;
    let oversized = vec![b'x'; 2 * 1024 * 1024];
    let form = pdf_form("pdf", vec![("huge.pdf", oversized)]);

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.leftover_files().await, 0);
}

#[rstest]
#[case("/split")]
#[case("/compress")]
#[tokio::test]
async fn test_empty_file_input_counts_as_missing(#[case] route: &str) {
    let app = TestApp::new().await;
    // What a browser sends for a file input left empty.
    let empty = Part::bytes(Vec::<u8>::new())
        .file_name(String::new())
        .mime_type("application/octet-stream");
    let form = MultipartForm::new().add_part("pdf", empty);

    let response = app.server.post(route).multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT_COUNT");
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_client_disconnect_mid_split_releases_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config {
        temp_dir: dir.path().join("uploads"),
        ..Config::default()
    };
    let state = AppState::from_config(&config).await.unwrap();
    let store = state.store.clone();
    let app = router(state, &config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    let boundary = "pdfforge-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"pdf\"; filename=\"big.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend(sample_pdf("big", 2000));
    body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "POST /split HTTP/1.1\r\nHost: {addr}\r\nContent-Type: multipart/form-data; boundary={boundary}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(&body).await.unwrap();

    let mut first = vec![0u8; 1024];
    let read = stream.read(&mut first).await.unwrap();
    assert!(String::from_utf8_lossy(&first[..read]).starts_with("HTTP/1.1 200"));
    drop(stream);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let left = store.artifact_count().await.unwrap();
        if left == 0 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "{left} file(s) left");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
