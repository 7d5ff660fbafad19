//! Google Drive folder import.
//!
//! ## Data Flow
//!
//! ```text
//! service-account JSON ──▶ RS256 JWT ──▶ token endpoint ──▶ bearer token
//!                                                              │
//! folder URL ──▶ extract_folder_id ──▶ walk_folder ◀───────────┘
//!                                          │  (depth-first, listing order)
//!                                          ▼
//!                       DriveFile[] ──▶ download / export ──▶ ExhibitDraft[]
//! ```
//!
//! Sub-folders are flattened into one list; each file keeps its
//! slash-joined `path` relative to the root folder. A sub-folder that cannot
//! be listed is logged and skipped; the root folder failing is an error.
//!
//! The HTTP surface lives behind [`DriveApi`]; [`GoogleDriveClient`] is the
//! real implementation.

use crate::error::{ExhibitError, SourceError};
use crate::exhibit::{ExhibitDraft, SourceKind};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use futures::future::BoxFuture;
use futures::FutureExt;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read-only Drive scope requested for the access token.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FILES_ENDPOINT: &str = "https://www.googleapis.com/drive/v3/files";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const MAX_FOLDER_DEPTH: usize = 32;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const JPEG_MIME: &str = "image/jpeg";
pub const PNG_MIME: &str = "image/png";

/// MIME types listed by default when walking a folder.
pub const DEFAULT_MIME_TYPES: &[&str] = &[PDF_MIME, GOOGLE_DOC_MIME, DOCX_MIME, JPEG_MIME, PNG_MIME];

// ── Credentials ──────────────────────────────────────────────────────────────

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The JSON key file of a Google Cloud service account.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

impl ServiceAccountKey {
    /// Parse and sanity-check a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, ExhibitError> {
        let key: Self = serde_json::from_str(json).map_err(|e| ExhibitError::InvalidCredentials {
            detail: e.to_string(),
        })?;

        if let Some(t) = key.key_type.as_deref() {
            if t != "service_account" {
                return Err(ExhibitError::InvalidCredentials {
                    detail: format!("expected type \"service_account\", found \"{t}\""),
                });
            }
        }
        if key.client_email.trim().is_empty() {
            return Err(ExhibitError::InvalidCredentials {
                detail: "client_email is empty".into(),
            });
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(ExhibitError::InvalidCredentials {
                detail: "private_key is not a PEM private key".into(),
            });
        }
        Ok(key)
    }

    /// Read and parse a key file.
    pub async fn from_file(path: &Path) -> Result<Self, ExhibitError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| ExhibitError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        Self::from_json(&json)
    }

    /// Signed JWT-bearer assertion valid from `now` for one hour.
    pub fn assertion(&self, now: i64) -> Result<String, ExhibitError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(&self.private_key).map_err(|e| {
            ExhibitError::InvalidCredentials {
                detail: format!("private_key: {e}"),
            }
        })?;

        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.private_key_id.as_deref(),
        };
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| ExhibitError::Internal(e.to_string()))?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| ExhibitError::Internal(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let signing_key = SigningKey::<Sha256>::new(private_key);
        let signature = signing_key.sign(signing_input.as_bytes());
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

// ── Folder ids ───────────────────────────────────────────────────────────────

/// Folder id from a Drive folder URL (`/folders/<id>`, `?id=<id>`) or a bare id.
pub fn extract_folder_id(folder_url: &str) -> Result<String, ExhibitError> {
    let input = folder_url.trim();
    let id = if let Some((_, rest)) = input.split_once("/folders/") {
        rest.split(['/', '?', '#']).next().unwrap_or("")
    } else if let Some((_, rest)) = input.split_once("id=") {
        rest.split(['&', '#']).next().unwrap_or("")
    } else if !input.contains('/') {
        input
    } else {
        ""
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ExhibitError::InvalidUrl {
            input: folder_url.to_string(),
        });
    }
    Ok(id.to_string())
}

// ── Files ────────────────────────────────────────────────────────────────────

/// One Drive item as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: Option<u64>,
    pub created_time: Option<String>,
    /// Slash-joined path relative to the walked root (just `name` at the top).
    pub path: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }
}

/// Drive operations needed for an import.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Every non-trashed direct child of `folder_id`; `path` is the bare name.
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, ExhibitError>;

    /// Raw content of a binary file.
    async fn download(&self, file: &DriveFile) -> Result<Vec<u8>, ExhibitError>;

    /// A Google-native document exported as PDF.
    async fn export_pdf(&self, file: &DriveFile) -> Result<Vec<u8>, ExhibitError>;
}

// ── Walking ──────────────────────────────────────────────────────────────────

/// Recursively list `folder_id`, keeping files whose MIME type is in
/// `mime_types` (all files when empty).
pub async fn walk_folder(
    api: &dyn DriveApi,
    folder_id: &str,
    mime_types: &[&str],
) -> Result<Vec<DriveFile>, ExhibitError> {
    let mut files = Vec::new();
    let root = api.list_folder(folder_id).await?;
    flatten(api, root, String::new(), mime_types, &mut files, 0).await;
    info!("Found {} files in Drive folder tree {folder_id}", files.len());
    Ok(files)
}

fn flatten<'a>(
    api: &'a dyn DriveApi,
    items: Vec<DriveFile>,
    prefix: String,
    mime_types: &'a [&'a str],
    out: &'a mut Vec<DriveFile>,
    depth: usize,
) -> BoxFuture<'a, ()> {
    async move {
        for mut item in items {
            let path = if prefix.is_empty() {
                item.name.clone()
            } else {
                format!("{prefix}/{}", item.name)
            };

            if item.is_folder() {
                if depth + 1 >= MAX_FOLDER_DEPTH {
                    warn!("Drive folder {path} is nested too deeply, skipping");
                    continue;
                }
                match api.list_folder(&item.id).await {
                    Ok(children) => flatten(api, children, path, mime_types, out, depth + 1).await,
                    Err(e) => warn!("Skipping Drive folder {path}: {e}"),
                }
                continue;
            }

            if mime_types.is_empty() || mime_types.contains(&item.mime_type.as_str()) {
                item.path = path;
                out.push(item);
            }
        }
    }
    .boxed()
}

// ── Import ───────────────────────────────────────────────────────────────────

/// Drafts produced from a folder, plus the files that were skipped.
#[derive(Debug, Default)]
pub struct DriveImport {
    pub drafts: Vec<ExhibitDraft>,
    pub skipped: Vec<SourceError>,
}

/// Walk `folder_url` and turn every importable file into a draft, in
/// traversal order.
///
/// PDFs are used as-is, Google Docs are exported as PDF, JPEG/PNG are wrapped
/// into one-page PDFs. Anything else is skipped.
pub async fn import_folder(
    api: &dyn DriveApi,
    folder_url: &str,
    mime_types: &[&str],
) -> Result<DriveImport, ExhibitError> {
    let folder_id = extract_folder_id(folder_url)?;
    let files = walk_folder(api, &folder_id, mime_types).await?;
    let mut import = DriveImport::default();

    for file in files {
        let fetched = match file.mime_type.as_str() {
            PDF_MIME | JPEG_MIME | PNG_MIME => api.download(&file).await,
            GOOGLE_DOC_MIME => api.export_pdf(&file).await,
            other => {
                warn!("Drive file {} has unsupported type {other}", file.path);
                import.skipped.push(SourceError::UnsupportedDriveType {
                    name: file.path.clone(),
                    mime_type: other.to_string(),
                });
                continue;
            }
        };

        let content = match fetched.and_then(|bytes| super::ensure_pdf(&file.name, bytes)) {
            Ok(c) => c,
            Err(e) => {
                warn!("Drive file {} skipped: {e}", file.path);
                import.skipped.push(SourceError::DriveFileSkipped {
                    name: file.path.clone(),
                    detail: e.to_string(),
                });
                continue;
            }
        };

        debug!("Imported Drive file {} ({} bytes)", file.path, content.len());
        import.drafts.push(
            ExhibitDraft::new(SourceKind::Drive, display_name(&file), content)
                .with_origin(file.path.clone()),
        );
    }
    Ok(import)
}

fn display_name(file: &DriveFile) -> String {
    if file.mime_type == GOOGLE_DOC_MIME && !file.name.to_lowercase().ends_with(".pdf") {
        format!("{}.pdf", file.name.trim_end_matches(".gdoc"))
    } else {
        file.name.clone()
    }
}

// ── HTTP client ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<RawFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    id: String,
    name: String,
    mime_type: String,
    size: Option<String>,
    created_time: Option<String>,
}

impl From<RawFile> for DriveFile {
    fn from(raw: RawFile) -> Self {
        Self {
            size: raw.size.and_then(|s| s.parse().ok()),
            path: raw.name.clone(),
            id: raw.id,
            name: raw.name,
            mime_type: raw.mime_type,
            created_time: raw.created_time,
        }
    }
}

/// Drive v3 REST client authenticated as a service account.
pub struct GoogleDriveClient {
    client: reqwest::Client,
    access_token: String,
    timeout_secs: u64,
}

impl fmt::Debug for GoogleDriveClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleDriveClient")
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GoogleDriveClient {
    /// Exchange a signed assertion for an access token.
    pub async fn connect(key: &ServiceAccountKey, timeout_secs: u64) -> Result<Self, ExhibitError> {
        let client = super::http_client(timeout_secs)?;
        let assertion = key.assertion(chrono::Utc::now().timestamp())?;

        let response = client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ExhibitError::DriveAuthFailed {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExhibitError::DriveAuthFailed {
                detail: format!("HTTP {status}: {}", body.trim()),
            });
        }
        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| ExhibitError::DriveAuthFailed {
                    detail: format!("unreadable token response: {e}"),
                })?;

        info!("Authenticated with Google Drive as {}", key.client_email);
        Ok(Self {
            client,
            access_token: token.access_token,
            timeout_secs,
        })
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        id: &str,
    ) -> Result<reqwest::Response, ExhibitError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| super::download_error(url, self.timeout_secs, e))?;
        check_status(response, id).await
    }

    async fn get_bytes(
        &self,
        url: &str,
        query: &[(&str, &str)],
        id: &str,
    ) -> Result<Vec<u8>, ExhibitError> {
        self.get(url, query, id)
            .await?
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| super::download_error(url, self.timeout_secs, e))
    }
}

/// Map Drive error statuses onto error variants.
async fn check_status(
    response: reqwest::Response,
    id: &str,
) -> Result<reqwest::Response, ExhibitError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(match status.as_u16() {
        401 => ExhibitError::DriveAuthFailed {
            detail: format!("HTTP {status}"),
        },
        403 => ExhibitError::DrivePermissionDenied { id: id.to_string() },
        404 => ExhibitError::DriveFolderNotFound {
            folder_id: id.to_string(),
        },
        _ => {
            let body = response.text().await.unwrap_or_default();
            ExhibitError::DriveApi {
                message: format!("HTTP {status} for {id}: {}", body.trim()),
            }
        }
    })
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, ExhibitError> {
        let q = format!("'{folder_id}' in parents and trashed=false");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("q", q.as_str()),
                ("fields", "nextPageToken, files(id,name,mimeType,size,createdTime)"),
                ("pageSize", "1000"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListResponse = self
                .get(FILES_ENDPOINT, &query, folder_id)
                .await?
                .json()
                .await
                .map_err(|e| ExhibitError::DriveApi {
                    message: format!("unreadable listing for {folder_id}: {e}"),
                })?;

            files.extend(page.files.into_iter().map(DriveFile::from));
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!("Listed {} items in Drive folder {folder_id}", files.len());
        Ok(files)
    }

    async fn download(&self, file: &DriveFile) -> Result<Vec<u8>, ExhibitError> {
        let url = format!("{FILES_ENDPOINT}/{}", file.id);
        self.get_bytes(&url, &[("alt", "media"), ("supportsAllDrives", "true")], &file.id)
            .await
    }

    async fn export_pdf(&self, file: &DriveFile) -> Result<Vec<u8>, ExhibitError> {
        let url = format!("{FILES_ENDPOINT}/{}/export", file.id);
        self.get_bytes(&url, &[("mimeType", PDF_MIME)], &file.id).await
    }
}
