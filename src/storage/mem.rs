//! In-memory storage, for embedded assets and for stores that already know
//! their validators (precomputed etags, explicit MIME types).

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use http::HeaderMap;

use super::disk::OnDirectory;
use super::path;
use super::{Reference, Storage, StorageInfo};
use crate::error::StorageError;

/// A stored in-memory resource.
#[derive(Debug, Clone)]
pub struct MemFile {
    data: Bytes,
    mtime: Option<SystemTime>,
    mime_type: Option<String>,
    etag: Option<String>,
}

impl MemFile {
    pub fn new(data: impl Into<Bytes>) -> MemFile {
        MemFile {
            data: data.into(),
            mtime: None,
            mime_type: None,
            etag: None,
        }
    }

    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Attach a precomputed entity tag (without quotes), as an object store
    /// with content hashes would.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Immutable map of absolute decoded paths to [`MemFile`]s.
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    files: Arc<HashMap<String, MemFile>>,
}

impl MemStorage {
    pub fn new(files: impl IntoIterator<Item = (String, MemFile)>) -> MemStorage {
        MemStorage {
            files: Arc::new(files.into_iter().collect()),
        }
    }
}

/// Memory payload inside a [`StorageInfo`].
#[derive(Debug)]
pub struct MemHandle {
    data: Option<Bytes>,
}

impl Storage for MemStorage {
    type Handle = MemHandle;
    type Reader = Cursor<Bytes>;

    async fn open(
        &self,
        reference: Reference<'_>,
        _headers: &HeaderMap,
    ) -> Result<StorageInfo<MemHandle>, StorageError> {
        let display = path::reference_display(&reference);
        let vetted = path::parse_reference(&reference, None, OnDirectory::Error)?;
        let key = format!("/{}", vetted.segments.join("/"));

        let Some(file) = self.files.get(&key) else {
            return Err(StorageError::DoesNotExist {
                reference: display,
                parts: vetted.segments,
                resolved: PathBuf::from(key),
                source: None,
            });
        };

        let mut info = StorageInfo::new(MemHandle {
            data: Some(file.data.clone()),
        });
        info.file_name = vetted.segments.last().cloned();
        info.mtime = file.mtime;
        info.size = Some(file.data.len() as u64);
        info.mime_type = file.mime_type.clone();
        info.etag = file.etag.clone();
        Ok(info)
    }

    async fn create_reader(&self, info: &mut StorageInfo<MemHandle>) -> io::Result<Cursor<Bytes>> {
        info.attached
            .data
            .take()
            .map(Cursor::new)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "reader was already created"))
    }

    async fn close(&self, info: &mut StorageInfo<MemHandle>) -> io::Result<()> {
        info.attached.data.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio::io::AsyncReadExt;

    fn storage() -> MemStorage {
        MemStorage::new([
            (
                "/data.bin".to_owned(),
                MemFile::new(&b"payload"[..])
                    .with_mime_type("application/octet-stream")
                    .with_etag("sha-afc3"),
            ),
            ("/plain.txt".to_owned(), MemFile::new(&b"text"[..])),
        ])
    }

    #[tokio::test]
    async fn serves_precomputed_validators() {
        let storage = storage();
        let mut info = storage
            .open(Reference::Path("/data.bin"), &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(info.size, Some(7));
        assert_eq!(info.etag.as_deref(), Some("sha-afc3"));
        assert_eq!(info.mime_type.as_deref(), Some("application/octet-stream"));

        let mut reader = storage.create_reader(&mut info).await.unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"payload");
        storage.close(&mut info).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_keys_do_not_exist() {
        let err = storage()
            .open(Reference::Path("/missing"), &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
    }

    #[tokio::test]
    async fn path_rules_still_apply() {
        let err = storage()
            .open(Reference::Path("/a//b"), &HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConsecutiveSlashes);
    }
}
