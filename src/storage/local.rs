use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use super::{content_type_for, ObjectStore, StorageError, StoredObject};
use crate::config::MediaConfig;
use crate::context::RequestContext;

type HmacSha256 = Hmac<Sha256>;

const MAX_EXTENSION_LEN: usize = 8;

/// Objects kept as files in one directory, downloadable through HMAC-signed expiring URLs
/// served by `GET /media/:reference`.
pub struct LocalObjectStore {
    dir: PathBuf,
    public_url: String,
    url_ttl: Duration,
    max_bytes: usize,
    signing_key: Vec<u8>,
}

impl std::fmt::Debug for LocalObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalObjectStore")
            .field("dir", &self.dir)
            .field("public_url", &self.public_url)
            .field("url_ttl", &self.url_ttl)
            .finish_non_exhaustive()
    }
}

impl LocalObjectStore {
    pub async fn new(config: &MediaConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.dir).await?;
        let signing_key = config
            .signing_secret
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
            .into_bytes();

        Ok(Self {
            dir: config.dir.clone(),
            public_url: config.public_url.clone(),
            url_ttl: config.url_ttl,
            max_bytes: config.max_bytes,
            signing_key,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_reference(reference) {
            return Err(StorageError::InvalidReference);
        }
        Ok(self.dir.join(reference))
    }

    fn sign(&self, reference: &str, expires: i64) -> Result<HmacSha256, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|_| StorageError::InvalidSignature)?;
        mac.update(reference.as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    pub fn signed_url(&self, reference: &str, expires: i64) -> Result<String, StorageError> {
        let signature = hex::encode(self.sign(reference, expires)?.finalize().into_bytes());
        Ok(format!(
            "{}/media/{reference}?expires={expires}&signature={signature}",
            self.public_url
        ))
    }

    pub fn verify_signature(&self, reference: &str, expires: i64, signature: &str) -> Result<(), StorageError> {
        let provided = hex::decode(signature).map_err(|_| StorageError::InvalidSignature)?;
        self.sign(reference, expires)?
            .verify_slice(&provided)
            .map_err(|_| StorageError::InvalidSignature)?;
        if Utc::now().timestamp() > expires {
            return Err(StorageError::Expired);
        }
        Ok(())
    }

    async fn ensure_exists(&self, reference: &str, path: &Path) -> Result<(), StorageError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(StorageError::NotFound(reference.to_string())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        ctx: &RequestContext,
        data: Bytes,
        file_name: &str,
    ) -> Result<String, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let reference = new_reference(file_name);
        let path = self.path_for(&reference)?;
        tokio::fs::write(&path, &data).await?;

        tracing::info!(
            request_id = ctx.request_id(),
            reference = %reference,
            size = data.len(),
            "object stored"
        );
        Ok(reference)
    }

    async fn fetch(&self, ctx: &RequestContext, reference: &str) -> Result<String, StorageError> {
        let path = self.path_for(reference)?;
        self.ensure_exists(reference, &path).await?;

        let ttl = i64::try_from(self.url_ttl.as_secs()).unwrap_or(i64::MAX / 2);
        let expires = Utc::now().timestamp().saturating_add(ttl);
        tracing::debug!(request_id = ctx.request_id(), reference, expires, "issued media URL");
        self.signed_url(reference, expires)
    }

    async fn delete(&self, ctx: &RequestContext, reference: &str) -> Result<(), StorageError> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(request_id = ctx.request_id(), reference, "object deleted");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(reference.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn open_signed(
        &self,
        reference: &str,
        expires: i64,
        signature: &str,
    ) -> Result<StoredObject, StorageError> {
        let path = self.path_for(reference)?;
        self.verify_signature(reference, expires, signature)?;
        self.ensure_exists(reference, &path).await?;

        let bytes = tokio::fs::read(&path).await?;
        Ok(StoredObject {
            bytes: Bytes::from(bytes),
            content_type: content_type_for(reference),
        })
    }
}

/// `<uuid>` plus the original extension when it is short and alphanumeric.
fn new_reference(file_name: &str) -> String {
    let id = Uuid::new_v4();
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn is_valid_reference(reference: &str) -> bool {
    let (stem, ext) = match reference.split_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (reference, None),
    };
    let ext_ok = ext.map_or(true, |ext| {
        !ext.is_empty()
            && ext.len() <= MAX_EXTENSION_LEN
            && ext.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    });
    ext_ok && Uuid::try_parse(stem).is_ok() && stem.len() == 36
}
