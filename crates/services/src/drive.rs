use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snapdrive_config::DriveSettings;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthError, AuthService};

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const FILE_FIELDS: &str = "id,name,mimeType,createdTime";
const GALLERY_PAGE_SIZE: u32 = 30;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("File not found")]
    NotFound,
    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("{id} is not a folder (mimeType={mime_type})")]
    NotAFolder { id: String, mime_type: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Drive request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Provider-side file record, passed through to clients verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// Destination folder, verified once per process. `drive_id` is set when
/// the folder lives on a shared drive, which changes the query parameters
/// list calls must pass.
#[derive(Debug, Clone)]
pub struct DriveFolder {
    pub id: String,
    pub drive_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMeta {
    id: String,
    name: Option<String>,
    mime_type: Option<String>,
    drive_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Thin wrapper over the Drive v3 REST surface, constrained to the one
/// configured folder. Every call asks `AuthService` for a bearer token
/// first, so refresh happens before the request rather than around it.
pub struct DriveService {
    settings: DriveSettings,
    auth: Arc<AuthService>,
    client: reqwest::Client,
    folder: OnceCell<DriveFolder>,
}

impl DriveService {
    pub fn new(settings: DriveSettings, auth: Arc<AuthService>) -> Self {
        Self {
            settings,
            auth,
            client: reqwest::Client::new(),
            folder: OnceCell::new(),
        }
    }

    /// Destination folder, verified and cached on first authorized use.
    /// A non-folder id is a configuration error; lookup failures are left
    /// to the caller, and the next call retries.
    pub async fn resolve_folder(&self) -> Result<&DriveFolder, DriveError> {
        self.folder
            .get_or_try_init(|| async {
                let folder_id = self.settings.folder_id.trim();
                let token = self.auth.bearer_token().await?;
                let meta: FileMeta = self
                    .get_json(
                        &format!("{}/files/{}", self.settings.api_base, folder_id),
                        &[
                            ("fields", "id,name,mimeType,driveId"),
                            ("supportsAllDrives", "true"),
                        ],
                        &token,
                    )
                    .await?;

                let mime_type = meta.mime_type.unwrap_or_default();
                if mime_type != FOLDER_MIME_TYPE {
                    return Err(DriveError::NotAFolder {
                        id: meta.id,
                        mime_type,
                    });
                }
                info!(
                    folder = %meta.name.as_deref().unwrap_or(&meta.id),
                    shared_drive = meta.drive_id.is_some(),
                    "destination folder verified"
                );
                Ok(DriveFolder {
                    id: meta.id,
                    drive_id: meta.drive_id,
                })
            })
            .await
    }

    /// Images in the destination folder, newest first, capped at one page.
    pub async fn list_images(&self) -> Result<Vec<DriveFile>, DriveError> {
        let folder = self.resolve_folder().await?;
        let token = self.auth.bearer_token().await?;

        let query = format!(
            "'{}' in parents and mimeType contains 'image/' and trashed = false",
            folder.id
        );
        let page_size = GALLERY_PAGE_SIZE.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", &query),
            ("orderBy", "createdTime desc"),
            ("pageSize", &page_size),
            ("fields", "files(id,name,mimeType,createdTime)"),
            ("includeItemsFromAllDrives", "true"),
            ("supportsAllDrives", "true"),
        ];
        if let Some(drive_id) = folder.drive_id.as_deref() {
            params.push(("corpora", "drive"));
            params.push(("driveId", drive_id));
        }

        let list: FileList = self
            .get_json(
                &format!("{}/files", self.settings.api_base),
                &params,
                &token,
            )
            .await?;
        Ok(list.files)
    }

    /// Creates one file under the destination folder with a single
    /// multipart/related call: JSON metadata part plus the media bytes.
    /// No dedup; the provider assigns a fresh id every time.
    pub async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<DriveFile, DriveError> {
        let folder = self.resolve_folder().await?;
        let token = self.auth.bearer_token().await?;

        let metadata = serde_json::json!({ "name": name, "parents": [folder.id] });
        let boundary = format!("snapdrive-{}", Uuid::new_v4().simple());
        let mut body = Vec::with_capacity(data.len() + 512);
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(&data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let resp = self
            .client
            .post(format!("{}/files", self.settings.upload_base))
            .query(&[
                ("uploadType", "multipart"),
                ("fields", FILE_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .bearer_auth(&token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json::<DriveFile>().await?)
    }

    pub async fn get_metadata(&self, file_id: &str) -> Result<DriveFile, DriveError> {
        let token = self.auth.bearer_token().await?;
        self.get_json(
            &format!("{}/files/{}", self.settings.api_base, file_id),
            &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")],
            &token,
        )
        .await
    }

    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let token = self.auth.bearer_token().await?;
        let resp = self
            .client
            .get(format!("{}/files/{}", self.settings.api_base, file_id))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .bearer_auth(&token)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        token: &str,
    ) -> Result<T, DriveError> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .bearer_auth(token)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, DriveError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.map(|e| e.message))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(DriveError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
