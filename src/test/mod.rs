//! Endpoint tests driving the uploader routes end to end.

use actix_web::{http::header, http::StatusCode, test, web, App};
use image::{GenericImageView, ImageFormat};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

use crate::modules::uploader::{
    self, imaging::tests::encoded, LocalMediaStore, UploaderConfig, UploaderService,
};

const BOUNDARY: &str = "----uploader-test-boundary";

fn service(dir: &TempDir) -> UploaderService<LocalMediaStore> {
    let config = UploaderConfig { media_dir: dir.path().to_path_buf(), ..Default::default() };
    UploaderService::new(Arc::new(LocalMediaStore::new(dir.path())), config)
}

macro_rules! init_app {
    ($dir:expr) => {
        test::init_service(
            App::new().app_data(web::Data::new(service($dir))).service(
                web::scope("/uploader")
                    .configure(uploader::route::configure::<LocalMediaStore>),
            ),
        )
        .await
    };
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, mime, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/uploader/file_upload")
        .insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(multipart_body(fields, file))
}

#[actix_web::test]
async fn test_upload_resize_to_show_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(300, 300, ImageFormat::Png);

    let req = upload_request(
        &[("imageShowMaxWidth", "180"), ("imageResizeToShow", "true")],
        Some(("square.png", "image/png", &png)),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["event"], "uploader:success");
    assert_eq!(json["data"]["filename"], "filename.jpg");
    assert_eq!(json["data"]["imagesize"], serde_json::json!([180, 180]));

    let stored = std::fs::read(dir.path().join("uploads/filename.jpg")).unwrap();
    assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (180, 180));
}

#[actix_web::test]
async fn test_upload_without_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);

    let req = upload_request(&[("folder", "uploads")], None).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["event"], "uploader:error");
    assert_eq!(json["data"]["message"], "Missing file.");
}

#[actix_web::test]
async fn test_upload_rejects_small_image() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(40, 40, ImageFormat::Png);

    let req = upload_request(
        &[("imageMinWidth", "150"), ("imageMinHeight", "150")],
        Some(("tiny.png", "image/png", &png)),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(
        json["data"]["message"],
        "The image must be at least 150 pixels wide and 150 pixels tall."
    );
    assert!(!dir.path().join("uploads").exists());
}

#[actix_web::test]
async fn test_upload_rejects_disallowed_mime_type() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(200, 200, ImageFormat::Png);

    let req = upload_request(
        &[("mimeTypes", r#"["image/jpeg"]"#)],
        Some(("photo.png", "image/png", &png)),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["data"]["message"], "Invalid file.");
}

#[actix_web::test]
async fn test_download_returns_uploaded_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(200, 200, ImageFormat::Png);

    let req = upload_request(
        &[("folder", "avatars"), ("keepOriginalName", "true")],
        Some(("me.png", "image/png", &png)),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/uploader/file_download?filename=me.png&folder=avatars")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
    assert!(disposition.starts_with("attachment"), "{disposition}");
    assert!(disposition.contains("me.png"), "{disposition}");

    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), png.as_slice());
}

#[actix_web::test]
async fn test_download_requires_filename() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);

    let req = test::TestRequest::get().uri("/uploader/file_download").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/uploader/file_download?filename=ghost.png").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_remove_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(200, 200, ImageFormat::Png);
    let req = upload_request(&[], Some(("photo.png", "image/png", &png))).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/uploader/file_remove")
        .set_form([("filename", "missing.png")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(dir.path().join("uploads/filename.png").exists());

    let req = test::TestRequest::post()
        .uri("/uploader/file_remove")
        .set_form([("filename", "filename.png"), ("folder", "")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["event"], "uploader:fileremoved");
    assert_eq!(json["data"], serde_json::json!({}));
    assert!(!dir.path().join("uploads/filename.png").exists());
}

#[actix_web::test]
async fn test_remove_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);

    let req = test::TestRequest::post()
        .uri("/uploader/file_remove")
        .set_form([("filename", "../secret.txt")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_crop_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(300, 300, ImageFormat::Png);
    let req = upload_request(
        &[("imageResizeToShow", "false")],
        Some(("photo.png", "image/png", &png)),
    )
    .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/uploader/file_crop")
        .set_form([
            ("filename", "filename.png"),
            ("uploadProportion", "0.5"),
            ("x", "10"),
            ("y", "10"),
            ("w", "100"),
            ("h", "50"),
            ("cropResizeToShow", "0"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["event"], "uploader:filecropped");
    assert_eq!(json["data"]["filename"], "filename.png");
    assert_eq!(json["data"]["imagesize"], serde_json::json!([200, 100]));
}

#[actix_web::test]
async fn test_crop_rejects_zero_proportion() {
    let dir = tempfile::tempdir().unwrap();
    let app = init_app!(&dir);
    let png = encoded(200, 200, ImageFormat::Png);
    let req = upload_request(&[], Some(("photo.png", "image/png", &png))).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/uploader/file_crop")
        .set_form([
            ("filename", "filename.png"),
            ("uploadProportion", "0"),
            ("x", "0"),
            ("y", "0"),
            ("w", "10"),
            ("h", "10"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["event"], "uploader:error");
}
