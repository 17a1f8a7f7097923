//! Streaming responses for static content, independent of any particular
//! HTTP server.
//!
//! Given an opaque reference (usually the percent-encoded request path) and
//! the incoming request headers, [`Streamer::prepare_response`] produces a
//! complete [`http::Response`]: status code, headers and a lazily streamed
//! body. Conditional requests (`If-None-Match`, `If-Modified-Since`,
//! `If-Range`, ...), byte ranges with multipart/byteranges framing, and
//! negotiation among pre-encoded variants (`foo.json.gz`, `foo.json.br`) are
//! all handled here; the caller only writes the result to its connection.
//!
//! The backing store is pluggable through the [`Storage`] trait. The crate
//! ships a file-system storage with path vetting and optional directory
//! listings, and an in-memory storage for embedded assets.
//!
//! # Example
//! ```no_run
//! use http::{HeaderMap, Method};
//! use serve_stream::storage::disk::DiskStorage;
//! use serve_stream::{Reference, ServeOptions, Streamer};
//!
//! # async {
//! let streamer = Streamer::new(DiskStorage::new("assets"));
//!
//! let response = streamer
//!     .prepare_response(
//!         &Method::GET,
//!         Reference::Path("/index.html"),
//!         &HeaderMap::new(),
//!         &ServeOptions::default(),
//!     )
//!     .await;
//! assert_eq!(response.status(), 200);
//! # };
//! ```
//!
//! For tower stacks and hyper servers, [`StreamService`] wraps a `Streamer`
//! as a `tower_service::Service` keyed on the request URI path.

pub use crate::body::ResponseBody;
pub use crate::conditional::Verdict;
pub use crate::content_encoding::{EncodingMapping, EncodingMappings};
pub use crate::error::{ErrorKind, StorageError};
pub use crate::mime::{GuessMimeResolver, MimeResolver};
pub use crate::options::{Override, ServeOptions};
pub use crate::range::{ByteRange, RangePlan};
pub use crate::response::{response_error, CharsetMapping, Streamer};
pub use crate::service::StreamService;
pub use crate::storage::{Reference, Storage, StorageInfo};

pub mod body;
pub mod conditional;
pub mod content_encoding;
mod error;
pub mod headers;
mod mime;
mod options;
pub mod range;
mod response;
pub mod service;
pub mod storage;
