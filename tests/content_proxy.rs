//! End-to-end tests for the content proxy and static routes.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt as _;

use nelum::approaches::ApproachRegistry;
use nelum::auth::token::{CredentialClient, StaticCredential, TokenCell};
use nelum::clients::blob::{BlobStore, MemoryBlobStore};
use nelum::http::{AppState, build_router};

fn state_with_blob(store: MemoryBlobStore, static_dir: PathBuf) -> AppState {
    AppState {
        registry: Arc::new(ApproachRegistry::new()),
        token: Arc::new(TokenCell::new(CredentialClient::Static(
            StaticCredential::new("test-token"),
        ))),
        blob: Arc::new(BlobStore::Memory(store)),
        identity_header: Arc::from("x-identity-token"),
        static_dir: Arc::new(static_dir),
    }
}

async fn get(state: AppState, path: &str) -> axum::response::Response {
    build_router(state)
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

// ── Content proxy ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn small_file_streams_back_with_its_content_type() {
    let mut store = MemoryBlobStore::new();
    store.insert("doc.pdf", Some("application/pdf"), vec![7u8; 500_000]);

    let response = get(state_with_blob(store, PathBuf::from("static")), "/content/doc.pdf").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline"
    );
    assert_eq!(body_bytes(response).await.len(), 500_000);
}

#[tokio::test]
async fn oversize_file_gets_403_notice_with_byte_count() {
    let mut store = MemoryBlobStore::new();
    store.insert("doc.pdf", Some("application/pdf"), vec![0u8; 2_000_000]);

    let response = get(state_with_blob(store, PathBuf::from("static")), "/content/doc.pdf").await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("2000000"), "notice must carry the byte count: {body}");
}

#[tokio::test]
async fn office_document_downloads_as_attachment() {
    let mut store = MemoryBlobStore::new();
    store.insert(
        "report.xlsx",
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        vec![1u8; 64],
    );

    let response =
        get(state_with_blob(store, PathBuf::from("static")), "/content/report.xlsx").await;

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"), "got: {disposition}");
    assert!(disposition.contains("report.xlsx"));
}

#[tokio::test]
async fn missing_object_is_404() {
    let response = get(
        state_with_blob(MemoryBlobStore::new(), PathBuf::from("static")),
        "/content/absent.pdf",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn object_without_content_type_is_404() {
    let mut store = MemoryBlobStore::new();
    store.insert("half-uploaded.bin", None, vec![0u8; 10]);

    let response = get(
        state_with_blob(store, PathBuf::from("static")),
        "/content/half-uploaded.bin",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── Static routes ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_serves_static_index_when_present() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>built frontend</html>").unwrap();

    let response = get(
        state_with_blob(MemoryBlobStore::new(), dir.path().to_path_buf()),
        "/",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("built frontend"));
}

#[tokio::test]
async fn root_falls_back_to_inline_page() {
    let dir = tempfile::TempDir::new().unwrap();

    let response = get(
        state_with_blob(MemoryBlobStore::new(), dir.path().to_path_buf()),
        "/",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("Nelum"));
}

#[tokio::test]
async fn assets_serve_with_guessed_mime() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();

    let response = get(
        state_with_blob(MemoryBlobStore::new(), dir.path().to_path_buf()),
        "/assets/app.js",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let mime = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(mime.contains("javascript"), "got: {mime}");
}

#[tokio::test]
async fn missing_asset_is_404() {
    let dir = tempfile::TempDir::new().unwrap();
    let response = get(
        state_with_blob(MemoryBlobStore::new(), dir.path().to_path_buf()),
        "/assets/absent.css",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn asset_traversal_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("outside.txt"), "secret").unwrap();

    let response = get(
        state_with_blob(MemoryBlobStore::new(), dir.path().to_path_buf()),
        "/assets/../outside.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favicon_without_icon_is_204() {
    let dir = tempfile::TempDir::new().unwrap();
    let response = get(
        state_with_blob(MemoryBlobStore::new(), dir.path().to_path_buf()),
        "/favicon.ico",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
