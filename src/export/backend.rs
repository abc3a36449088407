//! Upload backends: Dropbox content upload, Google Drive multipart upload and
//! the same-origin relay.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::export::oauth::OAuthError;

pub const DROPBOX_UPLOAD_URL: &str = "https://content.dropboxapi.com/2/files/upload";
pub const DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no data to export")]
    NoData,
    #[error("not connected to an upload backend")]
    NotConnected,
    #[error("an upload is already in flight")]
    Busy,
    #[error("{0} does not use an OAuth connect step")]
    NoAuthFlow(String),
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error("upload rejected: authorization expired")]
    Unauthorized,
    #[error("upload failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A serialized session log ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait UploadBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether uploads need a bearer token from the connect step.
    fn needs_token(&self) -> bool;

    /// One upload attempt. No retries.
    async fn upload(&self, file: &UploadFile, token: Option<&str>) -> Result<(), UploadError>;
}

async fn check_response(resp: reqwest::Response) -> Result<(), UploadError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(UploadError::Unauthorized);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(UploadError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Overwrite,
    Add,
}

/// `Dropbox-API-Arg` header contents.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DropboxArg {
    pub path: String,
    pub mode: WriteMode,
    pub autorename: bool,
    pub mute: bool,
}

impl DropboxArg {
    /// JSON with every non-ASCII character escaped, as HTTP headers require.
    pub fn to_header(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut out = String::with_capacity(json.len());
        for c in json.chars() {
            if c.is_ascii() {
                out.push(c);
            } else {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
        out
    }
}

pub struct DropboxUpload {
    client: reqwest::Client,
    endpoint: String,
    folder: String,
    pub mode: WriteMode,
    pub autorename: bool,
    pub mute: bool,
}

impl DropboxUpload {
    pub fn new(folder: impl Into<String>) -> Self {
        Self::with_endpoint(DROPBOX_UPLOAD_URL, folder)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            folder: folder.into(),
            mode: WriteMode::Overwrite,
            autorename: true,
            mute: true,
        }
    }

    pub fn arg_for(&self, file_name: &str) -> DropboxArg {
        let folder = self.folder.trim_matches('/');
        let path = if folder.is_empty() {
            format!("/{}", file_name)
        } else {
            format!("/{}/{}", folder, file_name)
        };
        DropboxArg {
            path,
            mode: self.mode,
            autorename: self.autorename,
            mute: self.mute,
        }
    }
}

#[async_trait]
impl UploadBackend for DropboxUpload {
    fn name(&self) -> &str {
        "dropbox"
    }

    fn needs_token(&self) -> bool {
        true
    }

    async fn upload(&self, file: &UploadFile, token: Option<&str>) -> Result<(), UploadError> {
        let token = token.ok_or(UploadError::NotConnected)?;
        let arg = self.arg_for(&file.name);
        tracing::debug!(path = %arg.path, bytes = file.bytes.len(), "uploading to dropbox");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("Dropbox-API-Arg", arg.to_header())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(file.bytes.clone())
            .send()
            .await?;
        check_response(resp).await
    }
}

pub struct DriveUpload {
    client: reqwest::Client,
    endpoint: String,
    folder_id: Option<String>,
}

impl DriveUpload {
    pub fn new(folder_id: Option<String>) -> Self {
        Self::with_endpoint(DRIVE_UPLOAD_URL, folder_id)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, folder_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            folder_id,
        }
    }

    /// `multipart/related` body: JSON metadata part, then the file part.
    pub fn multipart_body(&self, file: &UploadFile, boundary: &str) -> Vec<u8> {
        let mut metadata = serde_json::json!({
            "name": file.name,
            "mimeType": file.mime_type,
        });
        if let Some(folder) = &self.folder_id {
            metadata["parents"] = serde_json::json!([folder]);
        }

        let mut body = Vec::with_capacity(file.bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
                b = boundary,
                m = metadata,
                t = file.mime_type,
            )
            .as_bytes(),
        );
        body.extend_from_slice(&file.bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        body
    }
}

#[async_trait]
impl UploadBackend for DriveUpload {
    fn name(&self) -> &str {
        "google-drive"
    }

    fn needs_token(&self) -> bool {
        true
    }

    async fn upload(&self, file: &UploadFile, token: Option<&str>) -> Result<(), UploadError> {
        let token = token.ok_or(UploadError::NotConnected)?;
        let boundary = format!("buyword-{:016x}", rand::random::<u64>());
        let body = self.multipart_body(file, &boundary);
        tracing::debug!(file = %file.name, bytes = file.bytes.len(), "uploading to google drive");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;
        check_response(resp).await
    }
}

/// Posts `{fileName, csvContent}` to a relay that holds the storage
/// credential server-side.
pub struct RelayUpload {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    file_name: &'a str,
    csv_content: String,
}

impl RelayUpload {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl UploadBackend for RelayUpload {
    fn name(&self) -> &str {
        "relay"
    }

    fn needs_token(&self) -> bool {
        false
    }

    async fn upload(&self, file: &UploadFile, _token: Option<&str>) -> Result<(), UploadError> {
        let request = RelayRequest {
            file_name: &file.name,
            csv_content: String::from_utf8_lossy(&file.bytes).into_owned(),
        };
        tracing::debug!(url = %self.url, file = %file.name, "uploading through relay");
        let resp = self.client.post(&self.url).json(&request).send().await?;
        check_response(resp).await
    }
}
