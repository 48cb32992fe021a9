//! Binary object storage for audio and images referenced by exercises and tips.

mod local;

pub use local::LocalObjectStore;

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::context::RequestContext;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object reference")]
    InvalidReference,
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("object is empty")]
    Empty,
    #[error("object exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("invalid URL signature")]
    InvalidSignature,
    #[error("URL expired")]
    Expired,
    #[error("storage I/O failure")]
    Io(#[from] std::io::Error),
}

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Stores `data` and returns an opaque reference to it.
    async fn upload(
        &self,
        ctx: &RequestContext,
        data: Bytes,
        file_name: &str,
    ) -> Result<String, StorageError>;

    /// Temporary URL through which the object can be downloaded.
    async fn fetch(&self, ctx: &RequestContext, reference: &str) -> Result<String, StorageError>;

    async fn delete(&self, ctx: &RequestContext, reference: &str) -> Result<(), StorageError>;

    /// Reads the object behind a URL previously issued by [`ObjectStore::fetch`].
    async fn open_signed(
        &self,
        reference: &str,
        expires: i64,
        signature: &str,
    ) -> Result<StoredObject, StorageError>;
}

pub(crate) fn content_type_for(reference: &str) -> &'static str {
    match reference.rsplit_once('.').map(|(_, ext)| ext) {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}
