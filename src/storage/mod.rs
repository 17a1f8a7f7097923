//! The pluggable storage seam.
//!
//! A storage resolves an opaque reference into a [`StorageInfo`] and later
//! hands out a seekable byte reader over the resource. The response planner
//! is generic over this trait; [`disk::DiskStorage`] is the file-system
//! implementation and [`mem::MemStorage`] an in-memory one.

use std::future::Future;
use std::io;
use std::time::SystemTime;

use http::HeaderMap;
use tokio::io::AsyncRead;

use crate::body::AsyncSeekStart;
use crate::content_encoding::IDENTITY;
use crate::error::StorageError;

pub mod disk;
pub mod listing;
pub mod mem;
mod path;

pub(crate) use self::path::reference_display;

/// Opaque resource reference handed to a storage.
///
/// Path-shaped storages accept either a percent-encoded absolute path or a
/// pre-split segment list whose first element is the empty root segment.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Path(&'a str),
    Segments(&'a [String]),
}

/// Metadata and handle for an opened resource.
///
/// The planner derives validators and headers from this; `attached` is the
/// storage's private payload and feeds `create_reader`/`close`.
#[derive(Debug)]
pub struct StorageInfo<H> {
    /// Storage-specific payload (for disk: the open file and resolved path).
    pub attached: H,
    /// Name used for `Content-Disposition`.
    pub file_name: Option<String>,
    /// Modification time; drives `Last-Modified` and the derived ETag.
    pub mtime: Option<SystemTime>,
    /// Total byte length. `None` means the response streams without a
    /// `Content-Length` and range requests are not applicable.
    pub size: Option<u64>,
    /// Additional `Vary` header value contributed by the storage.
    pub vary: Option<String>,
    /// Selected content coding; `identity` when no variant applies.
    pub content_encoding: String,
    /// MIME type override; consulted before any resolver.
    pub mime_type: Option<String>,
    /// Charset override accompanying `mime_type`.
    pub mime_type_charset: Option<String>,
    /// Precomputed entity tag, for stores that track content hashes.
    pub etag: Option<String>,
}

impl<H> StorageInfo<H> {
    pub fn new(attached: H) -> StorageInfo<H> {
        StorageInfo {
            attached,
            file_name: None,
            mtime: None,
            size: None,
            vary: None,
            content_encoding: IDENTITY.to_owned(),
            mime_type: None,
            mime_type_charset: None,
            etag: None,
        }
    }

    /// Modification time in milliseconds since the epoch, when known.
    pub fn mtime_millis(&self) -> Option<u128> {
        self.mtime
            .and_then(|mtime| mtime.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|since| since.as_millis())
    }
}

/// A backing store the response planner can serve from.
///
/// `open` resolves a reference or fails with a tagged [`StorageError`];
/// `create_reader` turns the opened resource into a seekable byte stream,
/// transferring ownership of the backing handle so that dropping the reader
/// releases it; `close` releases whatever `create_reader` has not consumed
/// and must be idempotent.
pub trait Storage: Send + Sync {
    /// Storage-private payload carried inside [`StorageInfo`].
    type Handle: Send + Sync;
    /// Byte stream over the resource.
    type Reader: AsyncRead + AsyncSeekStart + Send + Unpin + 'static;

    fn open(
        &self,
        reference: Reference<'_>,
        headers: &HeaderMap,
    ) -> impl Future<Output = Result<StorageInfo<Self::Handle>, StorageError>> + Send;

    fn create_reader(
        &self,
        info: &mut StorageInfo<Self::Handle>,
    ) -> impl Future<Output = io::Result<Self::Reader>> + Send;

    fn close(
        &self,
        info: &mut StorageInfo<Self::Handle>,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Optional capability: map a file name to a MIME type. Storages without
    /// an opinion return `None` and leave the lookup to the planner's
    /// resolver.
    fn mime_lookup(&self, file_name: &str) -> Option<String> {
        let _ = file_name;
        None
    }
}
