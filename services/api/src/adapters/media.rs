//! services/api/src/adapters/media.rs
//!
//! Implementations of the `MediaStore` port. The remote adapter posts an
//! unsigned multipart upload to the hosted media API and returns the
//! public URL from its response; the local adapter writes under a
//! kind-named directory that the server exposes as static files.

use async_trait::async_trait;
use bytes::Bytes;
use samvaad_core::domain::MediaKind;
use samvaad_core::ports::{MediaStore, PortError, PortResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

//=========================================================================================
// Remote Media Host
//=========================================================================================

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// An adapter for the hosted media API's unsigned upload endpoint.
/// Uploads land under a destination named after the media kind.
pub struct RemoteMedia {
    http: reqwest::Client,
    base: String,
    upload_preset: String,
}

impl RemoteMedia {
    pub fn new(base: String, upload_preset: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            upload_preset,
        }
    }
}

#[async_trait]
impl MediaStore for RemoteMedia {
    async fn upload(&self, data: Bytes, filename: &str, kind: MediaKind) -> PortResult<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::stream(data).file_name(filename.to_string()),
            )
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .http
            .post(format!("{}/{}/upload", self.base, kind.as_str()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("media upload request failed: {e}")))?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("bad media host response: {e}")))?;

        body.secure_url
            .ok_or_else(|| PortError::Unexpected("media upload failed".to_string()))
    }
}

//=========================================================================================
// Local (Development) Media Directory
//=========================================================================================

/// A development stand-in writing uploads to disk. The files are served
/// from the api's static route, so the returned URL is still public.
pub struct LocalMedia {
    dir: PathBuf,
    public_base: String,
}

impl LocalMedia {
    pub fn new(dir: PathBuf, public_base: String) -> Self {
        Self {
            dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMedia {
    async fn upload(&self, data: Bytes, filename: &str, kind: MediaKind) -> PortResult<String> {
        let folder = self.dir.join(kind.as_str());
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot create media directory: {e}")))?;

        let name = match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4().simple()),
            None => Uuid::new_v4().simple().to_string(),
        };
        tokio::fs::write(folder.join(&name), &data)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot write media file: {e}")))?;

        Ok(format!("{}/{}/{name}", self.public_base, kind.as_str()))
    }
}
