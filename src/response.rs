//! Response planning: header assembly, conditional evaluation, range
//! dispatch and body wiring.

use std::io;
use std::sync::Arc;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Response, StatusCode};
use http_body::{Body, Empty};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::body::{AsyncReadBody, MultipartBody, RangedBody, ResponseBody};
use crate::conditional::{self, Verdict};
use crate::error::StorageError;
use crate::headers::EntityTag;
use crate::mime::{GuessMimeResolver, MimeResolver};
use crate::options::{Override, ServeOptions};
use crate::range::{self, RangePlan};
use crate::storage::{reference_display, Reference, Storage, StorageInfo};

// default capacity 64KiB
const DEFAULT_CHUNK_SIZE: usize = 65536;

const DEFAULT_CACHE_CONTROL: &str = "public, max-age=0";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_MAX_RANGES: usize = 200;

/// RFC 8187 `attr-char`: everything else is percent-encoded in `filename*`.
const EXT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Pairs a MIME matcher with the charset appended to matching types.
#[derive(Debug, Clone)]
pub struct CharsetMapping {
    pub matcher: Regex,
    pub charset: String,
}

impl CharsetMapping {
    pub fn new(matcher: Regex, charset: impl Into<String>) -> CharsetMapping {
        CharsetMapping {
            matcher,
            charset: charset.into(),
        }
    }
}

fn default_charsets() -> Vec<CharsetMapping> {
    vec![CharsetMapping::new(
        Regex::new(r"^(?:text/.+|application/(?:javascript|json))$")
            .expect("default charset pattern compiles"),
        "UTF-8",
    )]
}

/// Plans streaming responses over a [`Storage`].
///
/// ```
/// use serve_stream::storage::disk::DiskStorage;
/// use serve_stream::Streamer;
///
/// let streamer = Streamer::new(DiskStorage::new("assets")).weak_etags(true);
/// ```
#[derive(Clone)]
pub struct Streamer<S> {
    storage: S,
    chunk_size: usize,
    max_ranges: usize,
    weak_etags: bool,
    cache_control: Option<String>,
    default_content_type: Option<String>,
    charsets: Vec<CharsetMapping>,
    allowed_methods: Vec<Method>,
    mime_resolver: Arc<dyn MimeResolver>,
}

impl<S> Streamer<S> {
    pub fn new(storage: S) -> Streamer<S> {
        Streamer {
            storage,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_ranges: DEFAULT_MAX_RANGES,
            weak_etags: false,
            cache_control: Some(DEFAULT_CACHE_CONTROL.to_owned()),
            default_content_type: Some(DEFAULT_CONTENT_TYPE.to_owned()),
            charsets: default_charsets(),
            allowed_methods: vec![Method::GET, Method::HEAD],
            mime_resolver: Arc::new(GuessMimeResolver),
        }
    }

    /// Set a specific read buffer chunk size.
    ///
    /// The default capacity is 64kb.
    pub fn with_buf_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Cap the number of ranges honored per request. `0` disables range
    /// support entirely, `1` disables multipart responses.
    pub fn max_ranges(mut self, max_ranges: usize) -> Self {
        self.max_ranges = max_ranges;
        self
    }

    /// Emit `W/`-prefixed entity tags.
    pub fn weak_etags(mut self, weak: bool) -> Self {
        self.weak_etags = weak;
        self
    }

    /// Default `Cache-Control` value; `None` suppresses the header.
    pub fn cache_control(mut self, value: Option<String>) -> Self {
        self.cache_control = value;
        self
    }

    /// Fallback MIME type when no resolver has an answer; `None` suppresses
    /// `Content-Type` in that case.
    pub fn default_content_type(mut self, value: Option<String>) -> Self {
        self.default_content_type = value;
        self
    }

    /// Replace the charset table. An empty table disables charset tagging.
    pub fn default_charsets(mut self, charsets: Vec<CharsetMapping>) -> Self {
        self.charsets = charsets;
        self
    }

    pub fn allowed_methods(mut self, methods: Vec<Method>) -> Self {
        self.allowed_methods = methods;
        self
    }

    pub fn mime_resolver(mut self, resolver: Arc<dyn MimeResolver>) -> Self {
        self.mime_resolver = resolver;
        self
    }
}

impl<S: Storage> Streamer<S> {
    /// Turn a reference plus request headers into a complete response.
    ///
    /// Never fails: storage errors come back as finished 301/404/500
    /// responses with the [`StorageError`] attached, retrievable through
    /// [`response_error`].
    pub async fn prepare_response(
        &self,
        method: &Method,
        reference: Reference<'_>,
        req_headers: &HeaderMap,
        options: &ServeOptions,
    ) -> Response<ResponseBody> {
        if !self.allowed_methods.contains(method) {
            let allow = self
                .allowed_methods
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let mut headers = HeaderMap::new();
            set_header(&mut headers, header::ALLOW, &allow);
            return assemble(StatusCode::METHOD_NOT_ALLOWED, headers, empty_body());
        }

        let display_ref = reference_display(&reference);
        let mut info = match self.storage.open(reference, req_headers).await {
            Ok(info) => info,
            Err(err) => return error_response(err),
        };

        let content_type = self.resolve_content_type(&info, options);
        let etag = options.etag.apply(self.derived_etag(&info));
        let current_tag = etag.as_deref().and_then(EntityTag::parse);
        let last_modified = options
            .last_modified
            .apply(info.mtime.map(httpdate::fmt_http_date));
        let cache_control = options.cache_control.apply(self.cache_control.clone());
        let disposition = content_disposition(&info, options);

        // Validator and caching headers shared by every outcome.
        let mut base = HeaderMap::new();
        if let Some(value) = &cache_control {
            set_header(&mut base, header::CACHE_CONTROL, value);
        }
        if let Some(value) = &last_modified {
            set_header(&mut base, header::LAST_MODIFIED, value);
        }
        if let Some(value) = &etag {
            set_header(&mut base, header::ETAG, value);
        }
        if let Some(value) = &info.vary {
            set_header(&mut base, header::VARY, value);
        }

        // Entity headers for responses that carry the representation.
        let mut entity = base.clone();
        if let Some(value) = &content_type {
            set_header(&mut entity, header::CONTENT_TYPE, value);
        }
        if let Some(value) = &disposition {
            set_header(&mut entity, header::CONTENT_DISPOSITION, value);
        }
        if info.content_encoding != crate::content_encoding::IDENTITY {
            set_header(&mut entity, header::CONTENT_ENCODING, &info.content_encoding);
        }
        let accept_ranges = if self.max_ranges > 0 && info.size.is_some() {
            "bytes"
        } else {
            "none"
        };
        set_header(&mut entity, header::ACCEPT_RANGES, accept_ranges);

        // An explicit status override serves the full body as-is.
        if let Some(status) = options.status_code {
            return self.full_body(status, entity, info, display_ref).await;
        }

        match conditional::evaluate(method, req_headers, current_tag.as_ref(), info.mtime) {
            Verdict::NotModified => {
                self.close_quietly(&mut info).await;
                return assemble(StatusCode::NOT_MODIFIED, base, empty_body());
            }
            Verdict::PreconditionFailed => {
                self.close_quietly(&mut info).await;
                return assemble(StatusCode::PRECONDITION_FAILED, base, empty_body());
            }
            Verdict::Proceed => {}
        }

        if *method == Method::HEAD {
            if let Some(size) = info.size {
                set_header(&mut entity, header::CONTENT_LENGTH, &size.to_string());
            }
            self.close_quietly(&mut info).await;
            return assemble(StatusCode::OK, entity, empty_body());
        }

        let range_header = req_headers
            .get(header::RANGE)
            .and_then(|value| value.to_str().ok())
            .filter(|_| conditional::range_applies(req_headers, current_tag.as_ref(), info.mtime));

        match range::plan(
            range_header,
            info.size,
            self.max_ranges,
            content_type.as_deref(),
        ) {
            RangePlan::Full => self.full_body(StatusCode::OK, entity, info, display_ref).await,
            RangePlan::Single(byte_range) => {
                let size = info.size.expect("single ranges require a known size");
                set_header(
                    &mut entity,
                    header::CONTENT_RANGE,
                    &format!("bytes {}-{}/{}", byte_range.start, byte_range.end, size),
                );
                set_header(
                    &mut entity,
                    header::CONTENT_LENGTH,
                    &byte_range.len().to_string(),
                );
                let reader = match self.storage.create_reader(&mut info).await {
                    Ok(reader) => reader,
                    Err(err) => return self.reader_failure(info, display_ref, err).await,
                };
                let body =
                    RangedBody::new(reader, byte_range.start, byte_range.len(), self.chunk_size);
                assemble(StatusCode::PARTIAL_CONTENT, entity, body.boxed_unsync())
            }
            RangePlan::Multipart(plan) => {
                set_header(&mut entity, header::CONTENT_TYPE, &plan.content_type);
                set_header(
                    &mut entity,
                    header::CONTENT_LENGTH,
                    &plan.content_length.to_string(),
                );
                let reader = match self.storage.create_reader(&mut info).await {
                    Ok(reader) => reader,
                    Err(err) => return self.reader_failure(info, display_ref, err).await,
                };
                let body = MultipartBody::new(reader, plan, self.chunk_size);
                assemble(StatusCode::PARTIAL_CONTENT, entity, body.boxed_unsync())
            }
            RangePlan::Unsatisfiable => {
                let size = info.size.expect("unsatisfiable ranges require a known size");
                set_header(&mut base, header::CONTENT_RANGE, &format!("bytes */{size}"));
                self.close_quietly(&mut info).await;
                assemble(StatusCode::RANGE_NOT_SATISFIABLE, base, empty_body())
            }
        }
    }

    async fn full_body(
        &self,
        status: StatusCode,
        mut entity: HeaderMap,
        mut info: StorageInfo<S::Handle>,
        display_ref: String,
    ) -> Response<ResponseBody> {
        if let Some(size) = info.size {
            set_header(&mut entity, header::CONTENT_LENGTH, &size.to_string());
        }
        let reader = match self.storage.create_reader(&mut info).await {
            Ok(reader) => reader,
            Err(err) => return self.reader_failure(info, display_ref, err).await,
        };
        let body = match info.size {
            Some(size) => RangedBody::new(reader, 0, size, self.chunk_size).boxed_unsync(),
            None => AsyncReadBody::with_capacity(reader, self.chunk_size).boxed_unsync(),
        };
        assemble(status, entity, body)
    }

    async fn reader_failure(
        &self,
        mut info: StorageInfo<S::Handle>,
        display_ref: String,
        err: io::Error,
    ) -> Response<ResponseBody> {
        tracing::warn!(error = %err, reference = %display_ref, "creating the body stream failed");
        self.close_quietly(&mut info).await;
        let mut response = assemble(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            empty_body(),
        );
        response
            .extensions_mut()
            .insert(Arc::new(StorageError::unknown(display_ref, err)));
        response
    }

    async fn close_quietly(&self, info: &mut StorageInfo<S::Handle>) {
        if let Err(err) = self.storage.close(info).await {
            tracing::warn!(error = %err, "storage close failed");
        }
    }

    fn derived_etag(&self, info: &StorageInfo<S::Handle>) -> Option<String> {
        let opaque = match &info.etag {
            Some(tag) => tag.clone(),
            None => {
                let size = info.size?;
                let mtime = info.mtime_millis()?;
                format!("{size}-{mtime:x}-{}", info.content_encoding)
            }
        };
        Some(if self.weak_etags {
            format!("W/\"{opaque}\"")
        } else {
            format!("\"{opaque}\"")
        })
    }

    fn resolve_content_type(
        &self,
        info: &StorageInfo<S::Handle>,
        options: &ServeOptions,
    ) -> Option<String> {
        match &options.content_type {
            Override::Off => return None,
            Override::Custom(value) => return Some(value.clone()),
            Override::Derived => {}
        }

        let resolved: Option<(String, Option<String>)> = match &info.mime_type {
            Some(mime) => Some((mime.clone(), info.mime_type_charset.clone())),
            None => info.file_name.as_deref().and_then(|name| {
                self.storage
                    .mime_lookup(name)
                    .or_else(|| self.mime_resolver.resolve(name))
                    .map(|mime| (mime, None))
            }),
        };

        let (mime, charset) = resolved
            .or_else(|| self.default_content_type.clone().map(|mime| (mime, None)))?;

        let charset = charset.or_else(|| {
            let essence = mime.split(';').next().unwrap_or_default().trim();
            self.charsets
                .iter()
                .find(|mapping| mapping.matcher.is_match(essence))
                .map(|mapping| mapping.charset.clone())
        });

        match charset {
            Some(charset) if !mime.contains("charset=") => {
                Some(format!("{mime}; charset={charset}"))
            }
            _ => Some(mime),
        }
    }
}

/// The storage error attached to a 301/404/500 response, if any.
pub fn response_error<B>(response: &Response<B>) -> Option<&StorageError> {
    response
        .extensions()
        .get::<Arc<StorageError>>()
        .map(Arc::as_ref)
}

fn error_response(err: StorageError) -> Response<ResponseBody> {
    let status = match &err {
        StorageError::NotNormalized { .. } => StatusCode::MOVED_PERMANENTLY,
        StorageError::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::NOT_FOUND,
    };

    let mut headers = HeaderMap::new();
    if let StorageError::NotNormalized { normalized, .. } = &err {
        set_header(&mut headers, header::LOCATION, normalized);
    }

    tracing::debug!(error = %err, "storage open failed");
    let mut response = assemble(status, headers, empty_body());
    response.extensions_mut().insert(Arc::new(err));
    response
}

fn content_disposition<H>(info: &StorageInfo<H>, options: &ServeOptions) -> Option<String> {
    let disposition_type = match &options.content_disposition_type {
        Override::Off => return None,
        Override::Custom(value) => value.clone(),
        Override::Derived => "inline".to_owned(),
    };
    let file_name = match &options.content_disposition_filename {
        Override::Off => None,
        Override::Custom(value) => Some(value.clone()),
        Override::Derived => info.file_name.clone(),
    };

    Some(match file_name {
        Some(name) => format!("{disposition_type}; {}", disposition_filename(&name)),
        None => disposition_type,
    })
}

/// `filename=` parameter per RFC 6266; non-ASCII names additionally get the
/// RFC 8187 `filename*` form with an ASCII fallback.
fn disposition_filename(name: &str) -> String {
    let quoted = |value: &str| {
        format!(
            "filename=\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        )
    };

    if name.is_ascii() {
        quoted(name)
    } else {
        let fallback: String = name
            .chars()
            .map(|c| if c.is_ascii() { c } else { '?' })
            .collect();
        format!(
            "{}; filename*=UTF-8''{}",
            quoted(&fallback),
            utf8_percent_encode(name, EXT_VALUE)
        )
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "dropping unrepresentable header value"),
    }
}

fn assemble(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

pub(crate) fn empty_body() -> ResponseBody {
    Empty::new().map_err(|err| match err {}).boxed_unsync()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::mem::{MemFile, MemStorage};
    use std::time::{Duration, SystemTime};

    fn mem_with(name: &str, file: MemFile) -> Streamer<MemStorage> {
        Streamer::new(MemStorage::new([(name.to_owned(), file)]))
    }

    fn mtime() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(1_640_995_200_123)
    }

    async fn get(streamer: &Streamer<MemStorage>, path: &str) -> Response<ResponseBody> {
        streamer
            .prepare_response(
                &Method::GET,
                Reference::Path(path),
                &HeaderMap::new(),
                &ServeOptions::default(),
            )
            .await
    }

    #[tokio::test]
    async fn derived_etag_encodes_size_mtime_and_encoding() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]).with_mtime(mtime()));
        let response = get(&streamer, "/f.txt").await;
        let expected = format!("\"5-{:x}-identity\"", 1_640_995_200_123u128);
        assert_eq!(response.headers()[header::ETAG], expected.as_str());
    }

    #[tokio::test]
    async fn weak_etags_get_prefixed() {
        let streamer =
            mem_with("/f.txt", MemFile::new(&b"world"[..]).with_mtime(mtime())).weak_etags(true);
        let response = get(&streamer, "/f.txt").await;
        let etag = response.headers()[header::ETAG].to_str().unwrap().to_owned();
        assert!(etag.starts_with("W/\""), "{etag}");
    }

    #[tokio::test]
    async fn precomputed_etags_win_over_derived() {
        let streamer = mem_with(
            "/f.txt",
            MemFile::new(&b"world"[..]).with_mtime(mtime()).with_etag("sha-1234"),
        );
        let response = get(&streamer, "/f.txt").await;
        assert_eq!(response.headers()[header::ETAG], "\"sha-1234\"");
    }

    #[tokio::test]
    async fn missing_validators_mean_no_etag() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]));
        let response = get(&streamer, "/f.txt").await;
        assert!(response.headers().get(header::ETAG).is_none());
        assert!(response.headers().get(header::LAST_MODIFIED).is_none());
    }

    #[tokio::test]
    async fn charset_is_appended_to_matching_types() {
        let streamer = mem_with("/notes.txt", MemFile::new(&b"hi"[..]));
        let response = get(&streamer, "/notes.txt").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=UTF-8"
        );
    }

    #[tokio::test]
    async fn charset_table_can_be_disabled() {
        let streamer = mem_with("/notes.txt", MemFile::new(&b"hi"[..])).default_charsets(vec![]);
        let response = get(&streamer, "/notes.txt").await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn unresolvable_names_fall_back_to_octet_stream() {
        let streamer = mem_with("/blob", MemFile::new(&b"hi"[..]));
        let response = get(&streamer, "/blob").await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn disposition_defaults_to_inline_with_filename() {
        let streamer = mem_with("/notes.txt", MemFile::new(&b"hi"[..]));
        let response = get(&streamer, "/notes.txt").await;
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "inline; filename=\"notes.txt\""
        );
    }

    #[tokio::test]
    async fn disposition_overrides_and_suppression() {
        let streamer = mem_with("/notes.txt", MemFile::new(&b"hi"[..]));
        let options = ServeOptions {
            content_disposition_type: Override::Custom("attachment".to_owned()),
            ..Default::default()
        };
        let response = streamer
            .prepare_response(
                &Method::GET,
                Reference::Path("/notes.txt"),
                &HeaderMap::new(),
                &options,
            )
            .await;
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"notes.txt\""
        );

        let options = ServeOptions {
            content_disposition_type: Override::Off,
            ..Default::default()
        };
        let response = streamer
            .prepare_response(
                &Method::GET,
                Reference::Path("/notes.txt"),
                &HeaderMap::new(),
                &options,
            )
            .await;
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    }

    #[test]
    fn non_ascii_filenames_use_the_extended_form() {
        assert_eq!(
            disposition_filename("caf\u{e9}.txt"),
            "filename=\"caf?.txt\"; filename*=UTF-8''caf%C3%A9.txt"
        );
        assert_eq!(
            disposition_filename("with\"quote"),
            "filename=\"with\\\"quote\""
        );
    }

    #[tokio::test]
    async fn status_override_skips_planning() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]).with_mtime(mtime()));
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=0-0"));
        let options = ServeOptions {
            status_code: Some(StatusCode::NOT_FOUND),
            ..Default::default()
        };
        let response = streamer
            .prepare_response(&Method::GET, Reference::Path("/f.txt"), &headers, &options)
            .await;
        // Range logic is disabled: the full body ships with the forced status.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"world");
    }

    #[tokio::test]
    async fn disallowed_methods_get_405() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]));
        let response = streamer
            .prepare_response(
                &Method::OPTIONS,
                Reference::Path("/f.txt"),
                &HeaderMap::new(),
                &ServeOptions::default(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn head_carries_headers_without_a_body() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]).with_mtime(mtime()));
        let response = streamer
            .prepare_response(
                &Method::HEAD,
                Reference::Path("/f.txt"),
                &HeaderMap::new(),
                &ServeOptions::default(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn not_modified_strips_entity_headers() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]).with_mtime(mtime()));
        let etag = get(&streamer, "/f.txt").await.headers()[header::ETAG].clone();

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, etag.clone());
        let response = streamer
            .prepare_response(
                &Method::GET,
                Reference::Path("/f.txt"),
                &headers,
                &ServeOptions::default(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[header::ETAG], etag);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn errors_are_attached_to_the_response() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..]));
        let response = get(&streamer, "/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err = response_error(&response).expect("error attached");
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
    }

    #[tokio::test]
    async fn range_support_can_be_disabled() {
        let streamer = mem_with("/f.txt", MemFile::new(&b"world"[..])).max_ranges(0);
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=0-0"));
        let response = streamer
            .prepare_response(
                &Method::GET,
                Reference::Path("/f.txt"),
                &headers,
                &ServeOptions::default(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "none");
    }
}
