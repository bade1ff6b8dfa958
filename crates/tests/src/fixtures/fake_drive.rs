use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Folder id the fake knows about; test settings point at it.
pub const FOLDER_ID: &str = "folder123";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: String,
    pub query: String,
}

#[derive(Clone, Default)]
struct FakeState {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<RecordedCall>,
    used_codes: HashSet<String>,
    refresh_count: u32,
    upload_count: u32,
    files: Vec<Value>,
    blobs: HashMap<String, (String, Vec<u8>)>,
    folder_mime: Option<String>,
    folder_drive_id: Option<String>,
    last_upload_body: Option<Vec<u8>>,
}

impl FakeState {
    fn record(&self, endpoint: &str, query: &str) {
        self.inner.lock().unwrap().calls.push(RecordedCall {
            endpoint: endpoint.to_string(),
            query: query.to_string(),
        });
    }
}

/// In-process stand-in for Google's OAuth token endpoint and the Drive v3
/// files surface. Records every inbound call so tests can assert on
/// exactly what the gateway sent.
pub struct FakeDrive {
    pub base_url: String,
    state: FakeState,
}

impl FakeDrive {
    pub async fn spawn() -> Self {
        let state = FakeState::default();
        let app = Router::new()
            .route("/token", post(token))
            .route("/drive/v3/files", get(list_files))
            .route("/drive/v3/files/{id}", get(get_file))
            .route("/upload/drive/v3/files", post(upload_file))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake drive");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Everything recorded, token endpoint included.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }

    pub fn refresh_count(&self) -> u32 {
        self.state.inner.lock().unwrap().refresh_count
    }

    pub fn upload_count(&self) -> u32 {
        self.state.inner.lock().unwrap().upload_count
    }

    pub fn last_upload_body(&self) -> Option<Vec<u8>> {
        self.state.inner.lock().unwrap().last_upload_body.clone()
    }

    pub fn set_files(&self, files: Vec<Value>) {
        self.state.inner.lock().unwrap().files = files;
    }

    pub fn insert_blob(&self, id: &str, mime: &str, bytes: &[u8]) {
        self.state
            .inner
            .lock()
            .unwrap()
            .blobs
            .insert(id.to_string(), (mime.to_string(), bytes.to_vec()));
    }

    /// Override the destination's mimeType (to simulate a non-folder id).
    pub fn set_folder_mime(&self, mime: &str) {
        self.state.inner.lock().unwrap().folder_mime = Some(mime.to_string());
    }

    /// Mark the destination folder as living on a shared drive.
    pub fn set_folder_drive_id(&self, drive_id: &str) {
        self.state.inner.lock().unwrap().folder_drive_id = Some(drive_id.to_string());
    }
}

async fn token(
    State(state): State<FakeState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.record("token", "");
    let grant_type = form.get("grant_type").map(String::as_str);

    match grant_type {
        Some("authorization_code") => {
            let code = form.get("code").cloned().unwrap_or_default();
            let mut inner = state.inner.lock().unwrap();
            // One-time codes: a replay is invalid_grant, like the real thing.
            if code != "valid-code" || !inner.used_codes.insert(code) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Bad Request"
                    })),
                )
                    .into_response();
            }
            Json(json!({
                "access_token": "access-initial",
                "refresh_token": "refresh-1",
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/drive.file",
                "token_type": "Bearer"
            }))
            .into_response()
        }
        Some("refresh_token") => {
            let mut inner = state.inner.lock().unwrap();
            inner.refresh_count += 1;
            let n = inner.refresh_count;
            // Deliberately no refresh_token field: the store merge must
            // preserve the one it already has.
            Json(json!({
                "access_token": format!("access-refreshed-{n}"),
                "expires_in": 3599,
                "token_type": "Bearer"
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response(),
    }
}

async fn list_files(State(state): State<FakeState>, RawQuery(query): RawQuery) -> Json<Value> {
    let query = query.unwrap_or_default();
    state.record("files.list", &query);
    let files = state.inner.lock().unwrap().files.clone();
    Json(json!({ "files": files }))
}

async fn get_file(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    state.record("files.get", &query);
    let inner = state.inner.lock().unwrap();

    if query.contains("alt=media") {
        return match inner.blobs.get(&id) {
            Some((mime, bytes)) => {
                let mime = if mime.is_empty() {
                    "application/octet-stream"
                } else {
                    mime.as_str()
                };
                ([(header::CONTENT_TYPE, mime.to_string())], bytes.clone()).into_response()
            }
            None => not_found(&id),
        };
    }

    if id == FOLDER_ID {
        let mime = inner.folder_mime.clone().unwrap_or_else(|| FOLDER_MIME.to_string());
        let mut meta = json!({ "id": FOLDER_ID, "name": "Photos", "mimeType": mime });
        if let Some(drive_id) = &inner.folder_drive_id {
            meta["driveId"] = json!(drive_id);
        }
        return Json(meta).into_response();
    }

    match inner.blobs.get(&id) {
        Some((mime, _)) => {
            let mut meta = json!({
                "id": id,
                "name": format!("{id}.img"),
                "createdTime": "2025-01-01T00:00:00.000Z"
            });
            if !mime.is_empty() {
                meta["mimeType"] = json!(mime);
            }
            Json(meta).into_response()
        }
        None => not_found(&id),
    }
}

async fn upload_file(
    State(state): State<FakeState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<Value> {
    let query = query.unwrap_or_default();
    state.record("files.create", &query);

    let mut inner = state.inner.lock().unwrap();
    inner.upload_count += 1;
    let n = inner.upload_count;
    inner.last_upload_body = Some(body.to_vec());

    // Pull the name out of the JSON metadata part of the related body.
    let text = String::from_utf8_lossy(&body);
    let name = text
        .split("\"name\":\"")
        .nth(1)
        .and_then(|s| s.split('"').next())
        .unwrap_or("upload")
        .to_string();

    Json(json!({
        "id": format!("file-{n}"),
        "name": name,
        "mimeType": "image/jpeg",
        "createdTime": "2025-01-01T00:00:00.000Z"
    }))
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": { "code": 404, "message": format!("File not found: {id}.") }
        })),
    )
        .into_response()
}
