//! File-system storage: reference vetting, variant probing and file handle
//! lifecycle.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::HeaderMap;
use regex::Regex;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use super::listing::DirListing;
use super::path::{self, VettedPath};
use super::{Reference, Storage, StorageInfo};
use crate::content_encoding::{EncodingMapping, EncodingMappings, IDENTITY};
use crate::error::StorageError;
use crate::headers::AcceptEncoding;

/// How a reference with a trailing slash is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnDirectory {
    /// Reject with [`StorageError::TrailingSlash`].
    #[default]
    Error,
    /// Serve a generated HTML listing of the directory.
    ListFiles,
    /// Append `index.html` and serve that file.
    ServeIndex,
}

/// Storage rooted at a directory on the local file system.
///
/// ```
/// use serve_stream::storage::disk::DiskStorage;
///
/// let storage = DiskStorage::new("assets");
/// ```
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
    mappings: EncodingMappings,
    ignore: Option<Regex>,
    on_directory: OnDirectory,
}

impl DiskStorage {
    /// Create a storage serving from `root`, ignoring dotfiles and rejecting
    /// directory references.
    pub fn new(root: impl Into<PathBuf>) -> DiskStorage {
        DiskStorage {
            root: root.into(),
            mappings: EncodingMappings::default(),
            ignore: Some(Regex::new(r"^\.").expect("dotfile pattern compiles")),
            on_directory: OnDirectory::default(),
        }
    }

    /// Probe for pre-encoded variants using `mappings` before falling back
    /// to the plain file.
    pub fn with_content_encoding_mappings(mut self, mappings: EncodingMappings) -> Self {
        self.mappings = mappings;
        self
    }

    /// Replace the segment ignore pattern. `None` disables ignoring.
    pub fn with_ignore_pattern(mut self, pattern: Option<Regex>) -> Self {
        self.ignore = pattern;
        self
    }

    pub fn on_directory(mut self, mode: OnDirectory) -> Self {
        self.on_directory = mode;
        self
    }

    fn resolve(&self, segments: &[String]) -> PathBuf {
        let mut resolved = self.root.clone();
        for segment in segments {
            resolved.push(segment);
        }
        resolved
    }

    async fn open_plain(
        &self,
        display: String,
        vetted: VettedPath,
        resolved: PathBuf,
    ) -> Result<StorageInfo<DiskHandle>, StorageError> {
        let meta = match fs::metadata(&resolved).await {
            Ok(meta) => meta,
            Err(err) => return Err(open_failure(display, vetted.segments, resolved, err)),
        };
        if meta.is_dir() {
            return Err(StorageError::IsDirectory {
                reference: display,
                parts: vetted.segments,
                resolved,
            });
        }

        let file = match File::open(&resolved).await {
            Ok(file) => file,
            Err(err) => return Err(open_failure(display, vetted.segments, resolved, err)),
        };

        Ok(file_info(
            file, &meta, &vetted, resolved, IDENTITY, /* negotiated */ false,
        ))
    }

    /// Probe variant paths in negotiated preference order. The first
    /// non-directory that opens wins; a directory behind the identity path is
    /// surfaced, any other directory variant is skipped.
    async fn open_variant(
        &self,
        display: String,
        vetted: VettedPath,
        resolved: PathBuf,
        mapping: &EncodingMapping,
        headers: &HeaderMap,
    ) -> Result<StorageInfo<DiskHandle>, StorageError> {
        let path_str = resolved.to_string_lossy().into_owned();
        let accept = AcceptEncoding::from_headers(headers);
        let candidates = mapping.candidates(&accept);

        let mut last_err: Option<io::Error> = None;
        for candidate in candidates {
            let Some(encoded) = mapping.encoded_path(&path_str, candidate.replacement) else {
                continue;
            };
            let encoded_path = PathBuf::from(encoded);

            let meta = match fs::metadata(&encoded_path).await {
                Ok(meta) => meta,
                Err(err) => {
                    tracing::debug!(
                        variant = candidate.name,
                        path = %encoded_path.display(),
                        "variant probe missed"
                    );
                    last_err = Some(err);
                    continue;
                }
            };

            if meta.is_dir() {
                if candidate.name == IDENTITY {
                    return Err(StorageError::IsDirectory {
                        reference: display,
                        parts: vetted.segments,
                        resolved: encoded_path,
                    });
                }
                continue;
            }

            match File::open(&encoded_path).await {
                Ok(file) => {
                    return Ok(file_info(
                        file,
                        &meta,
                        &vetted,
                        encoded_path,
                        candidate.name,
                        /* negotiated */ true,
                    ));
                }
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            }
        }

        Err(StorageError::DoesNotExist {
            reference: display,
            parts: vetted.segments,
            resolved,
            source: last_err,
        })
    }

    async fn open_listing(
        &self,
        display: String,
        vetted: VettedPath,
        resolved: PathBuf,
    ) -> Result<StorageInfo<DiskHandle>, StorageError> {
        let meta = match fs::metadata(&resolved).await {
            Ok(meta) => meta,
            Err(err) => return Err(open_failure(display, vetted.segments, resolved, err)),
        };
        if !meta.is_dir() {
            // A trailing slash names a directory; a file here does not count.
            return Err(StorageError::DoesNotExist {
                reference: display,
                parts: vetted.segments,
                resolved,
                source: None,
            });
        }

        let base = vetted
            .segments
            .last()
            .cloned()
            .unwrap_or_else(|| "_".to_owned());
        let mut shown = String::from("/");
        for segment in &vetted.segments {
            shown.push_str(segment);
            shown.push('/');
        }

        let mut info = StorageInfo::new(DiskHandle {
            resolved,
            parts: vetted.segments,
            backing: Backing::Listing(Some(ListingSpec {
                shown,
                ignore: self.ignore.clone(),
            })),
        });
        info.file_name = Some(format!("{base}.html"));
        info.mime_type = Some("text/html".to_owned());
        info.mime_type_charset = Some("UTF-8".to_owned());
        Ok(info)
    }
}

/// Disk payload inside a [`StorageInfo`].
#[derive(Debug)]
pub struct DiskHandle {
    resolved: PathBuf,
    parts: Vec<String>,
    backing: Backing,
}

impl DiskHandle {
    /// Absolute path of the entry actually opened (the variant path when a
    /// content-encoding mapping applied).
    pub fn resolved(&self) -> &std::path::Path {
        &self.resolved
    }

    /// Decoded path segments of the reference.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

#[derive(Debug)]
enum Backing {
    File(Option<File>),
    Listing(Option<ListingSpec>),
}

#[derive(Debug)]
struct ListingSpec {
    shown: String,
    ignore: Option<Regex>,
}

fn file_info(
    file: File,
    meta: &std::fs::Metadata,
    vetted: &VettedPath,
    resolved: PathBuf,
    encoding: &str,
    negotiated: bool,
) -> StorageInfo<DiskHandle> {
    let mut info = StorageInfo::new(DiskHandle {
        resolved,
        parts: vetted.segments.clone(),
        backing: Backing::File(Some(file)),
    });
    // The disposition name stays the logical one even when a variant path
    // was opened.
    info.file_name = vetted.segments.last().cloned();
    info.mtime = meta.modified().ok();
    info.size = Some(meta.len());
    info.content_encoding = encoding.to_owned();
    if negotiated {
        info.vary = Some("Accept-Encoding".to_owned());
    }
    info
}

fn open_failure(
    reference: String,
    parts: Vec<String>,
    resolved: PathBuf,
    err: io::Error,
) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => StorageError::DoesNotExist {
            reference,
            parts,
            resolved,
            source: Some(err),
        },
        _ => StorageError::Unknown {
            reference,
            source: err,
        },
    }
}

impl Storage for DiskStorage {
    type Handle = DiskHandle;
    type Reader = DiskReader;

    async fn open(
        &self,
        reference: Reference<'_>,
        headers: &HeaderMap,
    ) -> Result<StorageInfo<DiskHandle>, StorageError> {
        let display = path::reference_display(&reference);
        let vetted = path::parse_reference(&reference, self.ignore.as_ref(), self.on_directory)?;
        let resolved = self.resolve(&vetted.segments);

        if vetted.directory {
            return self.open_listing(display, vetted, resolved).await;
        }

        let path_str = resolved.to_string_lossy().into_owned();
        if let Some(mapping) = self.mappings.find(&path_str) {
            return self
                .open_variant(display, vetted, resolved, mapping, headers)
                .await;
        }

        self.open_plain(display, vetted, resolved).await
    }

    async fn create_reader(&self, info: &mut StorageInfo<DiskHandle>) -> io::Result<DiskReader> {
        match &mut info.attached.backing {
            Backing::File(file) => file.take().map(DiskReader::File).ok_or_else(taken),
            Backing::Listing(spec) => {
                let spec = spec.take().ok_or_else(taken)?;
                let entries = fs::read_dir(&info.attached.resolved).await?;
                Ok(DiskReader::Listing(DirListing::new(
                    entries,
                    spec.shown,
                    spec.ignore,
                )))
            }
        }
    }

    async fn close(&self, info: &mut StorageInfo<DiskHandle>) -> io::Result<()> {
        match &mut info.attached.backing {
            Backing::File(file) => {
                if file.take().is_some() {
                    tracing::trace!(path = %info.attached.resolved.display(), "closed file handle");
                }
            }
            Backing::Listing(spec) => {
                spec.take();
            }
        }
        Ok(())
    }
}

fn taken() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "reader was already created")
}

/// Reader over a disk resource: a regular file or a generated listing.
#[derive(Debug)]
pub enum DiskReader {
    File(File),
    Listing(DirListing),
}

impl AsyncRead for DiskReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            DiskReader::File(file) => Pin::new(file).poll_read(cx, buf),
            DiskReader::Listing(listing) => Pin::new(listing).poll_read(cx, buf),
        }
    }
}

impl AsyncSeek for DiskReader {
    fn start_seek(self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        match self.get_mut() {
            DiskReader::File(file) => AsyncSeek::start_seek(Pin::new(file), position),
            // Listings are produced front to back and only restartable by
            // re-opening.
            DiskReader::Listing(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "directory listings are not seekable",
            )),
        }
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        match self.get_mut() {
            DiskReader::File(file) => AsyncSeek::poll_complete(Pin::new(file), cx),
            DiskReader::Listing(_) => Poll::Ready(Ok(0)),
        }
    }
}
