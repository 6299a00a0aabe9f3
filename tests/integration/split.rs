//! `POST /split` end to end.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;

use crate::common::{TestApp, page_marker, page_markers, pdf_form, sample_pdf, zip_entries};

#[tokio::test]
async fn test_split_streams_one_entry_per_page() {
    let app = TestApp::new().await;
    let form = pdf_form("pdf", vec![("Field Notes.pdf", sample_pdf("notes", 4))]);

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "application/zip");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Field Notes-split.zip\""
    );

    let entries = zip_entries(response.as_bytes());
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Field Notes-1.pdf",
            "Field Notes-2.pdf",
            "Field Notes-3.pdf",
            "Field Notes-4.pdf"
        ]
    );

    for (index, (_, bytes)) in entries.iter().enumerate() {
        assert_eq!(page_markers(bytes), vec![page_marker("notes", index + 1)]);
    }

    assert_eq!(app.wait_for_cleanup(Duration::from_secs(2)).await, 0);
}

#[tokio::test]
async fn test_split_zero_page_document_returns_empty_archive() {
    let app = TestApp::new().await;
    let form = pdf_form("pdf", vec![("blank.pdf", sample_pdf("blank", 0))]);

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(zip_entries(response.as_bytes()).is_empty());
}

#[tokio::test]
async fn test_split_large_document() {
    let app = TestApp::new().await;
    let form = pdf_form("pdf", vec![("big.pdf", sample_pdf("big", 230))]);

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let entries = zip_entries(response.as_bytes());
    assert_eq!(entries.len(), 230);
    assert_eq!(entries[229].0, "big-230.pdf");
    assert_eq!(page_markers(&entries[229].1), vec![page_marker("big", 230)]);
}

#[tokio::test]
async fn test_split_without_file_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/split")
        .multipart(pdf_form("pdf", vec![]))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT_COUNT");
}

#[tokio::test]
async fn test_split_with_two_files_is_rejected() {
    let app = TestApp::new().await;
    let form = pdf_form(
        "pdf",
        vec![("a.pdf", sample_pdf("a", 1)), ("b.pdf", sample_pdf("b", 1))],
    );

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_split_malformed_document_fails_before_streaming() {
    let app = TestApp::new().await;
    let form = pdf_form("pdf", vec![("broken.pdf", b"not a pdf".to_vec())]);

    let response = app.server.post("/split").multipart(form).await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json();
    assert_eq!(body["code"], "MALFORMED_DOCUMENT");
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_concurrent_splits_stay_separate() {
    let app = TestApp::new().await;

    let first = app
        .server
        .post("/split")
        .multipart(pdf_form("pdf", vec![("left.pdf", sample_pdf("left", 60))]));
    let second = app
        .server
        .post("/split")
        .multipart(pdf_form("pdf", vec![("right.pdf", sample_pdf("right", 45))]));
    let (first, second) = tokio::join!(async { first.await }, async { second.await });

    let left = zip_entries(first.as_bytes());
    let right = zip_entries(second.as_bytes());
    assert_eq!(left.len(), 60);
    assert_eq!(right.len(), 45);
    assert!(left.iter().all(|(name, _)| name.starts_with("left-")));
    assert!(right.iter().all(|(name, _)| name.starts_with("right-")));

    assert_eq!(app.wait_for_cleanup(Duration::from_secs(2)).await, 0);
}
