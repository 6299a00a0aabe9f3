//! Temp artifacts are removed after every request, successful or not.

use std::time::Duration;

use axum::http::StatusCode;
use futures::future::join_all;

use crate::common::{TestApp, pdf_form, sample_pdf};
use pdfforge::storage::TempStore;

#[tokio::test]
async fn test_mixed_requests_leave_nothing_behind() {
    let app = TestApp::new().await;

    let ok = app
        .server
        .post("/merge")
        .multipart(pdf_form(
            "pdfs",
            vec![("a.pdf", sample_pdf("a", 2)), ("b.pdf", sample_pdf("b", 2))],
        ))
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);

    let bad = app
        .server
        .post("/merge")
        .multipart(pdf_form(
            "pdfs",
            vec![("a.pdf", sample_pdf("a", 1)), ("x.pdf", b"xx".to_vec())],
        ))
        .await;
    assert_eq!(bad.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let split = app
        .server
        .post("/split")
        .multipart(pdf_form("pdf", vec![("c.pdf", sample_pdf("c", 3))]))
        .await;
    assert_eq!(split.status_code(), StatusCode::OK);

    // No Ghostscript configured: compression fails after the upload was stored.
    let compress = app
        .server
        .post("/compress")
        .multipart(pdf_form("pdf", vec![("d.pdf", sample_pdf("d", 1))]))
        .await;
    assert_eq!(compress.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(app.wait_for_cleanup(Duration::from_secs(2)).await, 0);
}

#[tokio::test]
async fn test_concurrent_merges_clean_up() {
    let app = TestApp::new().await;

    let requests = (0..6).map(|i| {
        app.server.post("/merge").multipart(pdf_form(
            "pdfs",
            vec![
                ("a.pdf", sample_pdf(&format!("a{i}"), 1)),
                ("b.pdf", sample_pdf(&format!("b{i}"), 2)),
            ],
        ))
    });
    let responses = join_all(requests.map(|request| async move { request.await })).await;

    for response in responses {
        assert_eq!(response.status_code(), StatusCode::OK);
    }
    assert_eq!(app.leftover_files().await, 0);
}

#[tokio::test]
async fn test_startup_sweep_clears_previous_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("uploads");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("crashed-request.pdf"), b"stale").unwrap();

    let store = TempStore::new(&root).await.unwrap();
    assert_eq!(store.artifact_count().await.unwrap(), 1);
    assert_eq!(store.sweep().await.unwrap(), 1);
    assert_eq!(store.artifact_count().await.unwrap(), 0);
}
