use crate::fixtures::test_app::TestApp;
use reqwest::multipart;
use serde_json::Value;

fn photo_form(bytes: Vec<u8>, filename: &str, mime: &str) -> multipart::Form {
    let part = multipart::Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str(mime)
        .unwrap();
    multipart::Form::new().part("photo", part)
}

#[tokio::test]
async fn upload_creates_exactly_one_drive_file() {
    let app = TestApp::spawn().await;
    app.authorize().await;

    let payload = b"\x89PNG fake image bytes".to_vec();
    let resp = app
        .client
        .post(app.url("/upload-drive"))
        .multipart(photo_form(payload.clone(), "cat.png", "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["id"], "file-1");
    assert_eq!(body["name"], "cat.png");

    assert_eq!(app.drive.upload_count(), 1);
    let create = &app.drive.calls_to("files.create")[0];
    assert!(create.query.contains("uploadType=multipart"));

    // The media part carries the payload verbatim.
    let sent = app.drive.last_upload_body().unwrap();
    assert!(
        sent.windows(payload.len()).any(|w| w == payload),
        "upload body should contain the raw image bytes"
    );
    let sent_text = String::from_utf8_lossy(&sent);
    assert!(sent_text.contains("\"parents\":[\"folder123\"]"));
    assert!(sent_text.contains("Content-Type: image/png"));
}

#[tokio::test]
async fn upload_without_a_file_part_is_rejected() {
    let app = TestApp::spawn().await;
    app.authorize().await;

    let form = multipart::Form::new().text("note", "no file here");
    let resp = app
        .client
        .post(app.url("/upload-drive"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "No file");
    assert_eq!(app.drive.upload_count(), 0);
}

#[tokio::test]
async fn upload_with_an_empty_file_is_rejected() {
    let app = TestApp::spawn().await;
    app.authorize().await;

    let resp = app
        .client
        .post(app.url("/upload-drive"))
        .multipart(photo_form(vec![], "empty.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(app.drive.upload_count(), 0);
}

#[tokio::test]
async fn repeated_uploads_with_the_same_name_create_distinct_files() {
    let app = TestApp::spawn().await;
    app.authorize().await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let resp = app
            .client
            .post(app.url("/upload-drive"))
            .multipart(photo_form(b"same bytes".to_vec(), "dup.jpg", "image/jpeg"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    assert_eq!(app.drive.upload_count(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn missing_content_type_falls_back_to_jpeg() {
    let app = TestApp::spawn().await;
    app.authorize().await;

    let part = multipart::Part::bytes(b"bytes".to_vec()).file_name("x.jpg");
    let form = multipart::Form::new().part("photo", part);
    let resp = app
        .client
        .post(app.url("/upload-drive"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let sent = app.drive.last_upload_body().unwrap();
    let sent_text = String::from_utf8_lossy(&sent);
    assert!(sent_text.contains("Content-Type: image/jpeg"));
}

#[tokio::test]
async fn missing_filename_gets_a_generated_one() {
    let app = TestApp::spawn().await;
    app.authorize().await;

    // A part with a content type but no filename still counts as the file.
    let part = multipart::Part::bytes(b"bytes".to_vec())
        .mime_str("image/png")
        .unwrap();
    let form = multipart::Form::new().part("photo", part);
    let resp = app
        .client
        .post(app.url("/upload-drive"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let name = body["name"].as_str().unwrap();
    assert!(name.starts_with("photo-"));
    assert!(name.ends_with(".jpg"));
}
