//! `POST /compress` end to end, with shell scripts standing in for Ghostscript.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::{TestApp, pdf_form, pdf_part, sample_pdf};
use axum_test::multipart::MultipartForm;

async fn app_with(body: &str, timeout: Duration) -> TestApp {
    TestApp::with_fake_gs(body, timeout).await
}

#[tokio::test]
async fn test_compress_returns_output() {
    let app = app_with("cp \"$input\" \"$out\"", Duration::from_secs(10)).await;
    let input = sample_pdf("scan", 2);
    let form = pdf_form("pdf", vec![("Scan 01.pdf", input.clone())]);

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Scan 01-compressed.pdf\""
    );
    assert_eq!(response.as_bytes().as_ref(), input.as_slice());

    assert_eq!(app.wait_for_cleanup(Duration::from_secs(2)).await, 0);
}

#[tokio::test]
async fn test_compress_passes_selected_preset() {
    let app = app_with(
        "for arg; do case \"$arg\" in -dPDFSETTINGS=/prepress) cp \"$input\" \"$out\";; esac; done",
        Duration::from_secs(10),
    )
    .await;

    let form = MultipartForm::new()
        .add_part("pdf", pdf_part("a.pdf", sample_pdf("a", 1)))
        .add_text("quality", "prepress");
    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // Without a quality field the default preset is used, which the script ignores.
    let form = pdf_form("pdf", vec![("a.pdf", sample_pdf("a", 1))]);
    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "OUTPUT_MISSING");
}

#[tokio::test]
async fn test_compress_rejects_unknown_preset() {
    let app = TestApp::new().await;
    let form = MultipartForm::new()
        .add_part("pdf", pdf_part("a.pdf", sample_pdf("a", 1)))
        .add_text("quality", "/ebook -dSAFER=false");

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_PRESET");
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_compress_without_file_is_rejected() {
    let app = TestApp::new().await;
    let form = MultipartForm::new().add_text("quality", "screen");

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT_COUNT");
}

#[tokio::test]
async fn test_compress_process_failure_hides_stderr() {
    let app = app_with(
        "echo \"Error reading $input\" >&2\nexit 3",
        Duration::from_secs(10),
    )
    .await;
    let form = pdf_form("pdf", vec![("a.pdf", sample_pdf("a", 1))]);

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["error"], "Compression failed");
    assert!(!body.to_string().contains("Error reading"));
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_compress_timeout_is_504() {
    let app = app_with("sleep 30", Duration::from_millis(300)).await;
    let form = pdf_form("pdf", vec![("slow.pdf", sample_pdf("slow", 1))]);

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_compress_malformed_input_is_500() {
    let app = app_with("cp \"$input\" \"$out\"", Duration::from_secs(10)).await;
    let form = pdf_form("pdf", vec![("junk.pdf", b"junk".to_vec())]);

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["code"], "MALFORMED_DOCUMENT");
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_compress_missing_ghostscript_is_500() {
    let app = TestApp::new().await;
    let form = pdf_form("pdf", vec![("a.pdf", sample_pdf("a", 1))]);

    let response = app.server.post("/compress").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["code"], "COMPRESSION_FAILED");
}
