//! Object storage uploads.
//!
//! Raw object writes against the storage surface of the identity provider's
//! base URL, keyed by dataset, version, and the encoded file name. One
//! upload per call; the caller owns batch ordering and abort policy.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use crate::{model::DEFAULT_MEDIA_TYPE, session::SessionStore};

/// Everything except the characters `encodeURIComponent` leaves alone.
const FILE_NAME_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload of {file} failed: {message}")]
    Rejected { file: String, message: String },
    #[error("Upload of {file} failed: {source}")]
    Transport {
        file: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file selected for upload, held in memory with its declared media type.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| UploadError::Read {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a file path"),
            })?;
        let bytes = fs::read(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name,
            media_type: None,
            bytes,
        })
    }

    #[must_use]
    pub fn from_bytes(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: SessionStore,
}

impl StorageClient {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        session: SessionStore,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            anon_key: anon_key.into(),
            session,
        }
    }

    /// Storage key for one uploaded file of a version.
    #[must_use]
    pub fn object_path(dataset_id: &str, version_id: &str, file_name: &str) -> String {
        let encoded = utf8_percent_encode(file_name, FILE_NAME_ENCODE);
        format!("datasets/{dataset_id}/versions/{version_id}/uploads/{encoded}")
    }

    /// Upload one file, returning the URI of the stored object.
    pub async fn upload(
        &self,
        dataset_id: &str,
        version_id: &str,
        file: &LocalFile,
    ) -> Result<String, UploadError> {
        let path = Self::object_path(dataset_id, version_id, &file.name);
        let url = format!("{}/storage/v1/object/raw/{path}", self.base_url);
        let mut request = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header(
                reqwest::header::CONTENT_TYPE,
                file.media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE),
            )
            .header("x-upsert", "true")
            .body(file.bytes.clone());
        if let Some(token) = self.session.get() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|source| UploadError::Transport {
            file: file.name.clone(),
            source,
        })?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                "Upload failed".to_string()
            } else {
                text
            };
            return Err(UploadError::Rejected {
                file: file.name.clone(),
                message,
            });
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_encodes_file_names() {
        assert_eq!(
            StorageClient::object_path("ds-1", "ver-1", "reviews.jsonl"),
            "datasets/ds-1/versions/ver-1/uploads/reviews.jsonl"
        );
        assert_eq!(
            StorageClient::object_path("ds-1", "ver-1", "my photo #1.png"),
            "datasets/ds-1/versions/ver-1/uploads/my%20photo%20%231.png"
        );
    }

    #[test]
    fn from_path_rejects_directories() {
        let err = LocalFile::from_path(Path::new("/")).unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }
}
