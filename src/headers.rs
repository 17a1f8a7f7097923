//! Request header parsers: `Accept-Encoding`, entity-tag lists, HTTP dates
//! and `If-Range`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::header::{self, HeaderMap};

/// Quality value in thousandths, clamped to `0..=1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QValue(pub(crate) u16);

impl QValue {
    pub const ZERO: QValue = QValue(0);
    pub const ONE: QValue = QValue(1000);

    /// Parse the value of a `q=` parameter: `1`, `1.0`, `0.75`, `0.001`, up
    /// to three decimals.
    pub fn parse(value: &str) -> Option<QValue> {
        let mut chars = value.chars();
        let whole = match chars.next()? {
            '0' => 0u16,
            '1' => 1000,
            _ => return None,
        };

        match chars.next() {
            None => return Some(QValue(whole)),
            Some('.') => {}
            Some(_) => return None,
        }

        let mut q = whole;
        let mut scale = 100u16;
        for c in chars {
            let digit = c.to_digit(10)? as u16;
            if scale == 0 {
                return None;
            }
            q += digit * scale;
            scale /= 10;
        }

        (q <= 1000).then_some(QValue(q))
    }
}

/// Parsed `Accept-Encoding` preference list.
///
/// Tokens are lowercased, `x-gzip`/`x-compress` are folded into their plain
/// aliases, and unparseable entries are dropped. A missing or empty header
/// parses to an empty list, which leaves only the identity default.
#[derive(Debug, Clone, Default)]
pub struct AcceptEncoding {
    entries: Vec<(String, QValue)>,
    wildcard: Option<QValue>,
}

impl AcceptEncoding {
    pub fn from_headers(headers: &HeaderMap) -> AcceptEncoding {
        let mut accept = AcceptEncoding::default();
        for value in headers.get_all(header::ACCEPT_ENCODING) {
            if let Ok(value) = value.to_str() {
                accept.parse_value(value);
            }
        }
        accept
    }

    fn parse_value(&mut self, value: &str) {
        for entry in value.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (token, q) = match entry.split_once(';') {
                None => (entry, QValue::ONE),
                Some((token, params)) => {
                    let params = params.trim();
                    let Some(q) = params
                        .strip_prefix("q=")
                        .or_else(|| params.strip_prefix("Q="))
                        .and_then(QValue::parse)
                    else {
                        continue;
                    };
                    (token.trim(), q)
                }
            };

            if token == "*" {
                self.wildcard = Some(q);
                continue;
            }

            let token = match token.to_ascii_lowercase().as_str() {
                "x-gzip" => "gzip".to_owned(),
                "x-compress" => "compress".to_owned(),
                lowered => lowered.to_owned(),
            };
            self.entries.push((token, q));
        }
    }

    /// Quality explicitly assigned to `encoding`, if listed.
    pub fn quality(&self, encoding: &str) -> Option<QValue> {
        self.entries
            .iter()
            .find(|(token, _)| token == encoding)
            .map(|(_, q)| *q)
    }

    /// Effective quality of `encoding` after wildcard and identity defaults.
    ///
    /// `*` covers every encoding not explicitly listed; identity defaults to
    /// acceptable when neither it nor `*` says otherwise.
    pub fn effective_quality(&self, encoding: &str) -> QValue {
        if let Some(q) = self.quality(encoding) {
            return q;
        }
        if let Some(q) = self.wildcard {
            return q;
        }
        if encoding == "identity" {
            QValue::ONE
        } else {
            QValue::ZERO
        }
    }
}

/// An entity tag, stored without its surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag {
    weak: bool,
    opaque: String,
}

impl EntityTag {
    pub fn new(weak: bool, opaque: impl Into<String>) -> EntityTag {
        EntityTag {
            weak,
            opaque: opaque.into(),
        }
    }

    /// Parse one `"opaque"` or `W/"opaque"` tag.
    pub fn parse(value: &str) -> Option<EntityTag> {
        let value = value.trim();
        let (weak, rest) = match value.strip_prefix("W/").or_else(|| value.strip_prefix("w/")) {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let rest = rest.strip_prefix('"')?.strip_suffix('"')?;
        if rest.contains('"') {
            return None;
        }
        Some(EntityTag::new(weak, rest))
    }

    /// Strong comparison: equal opaque data and neither side weak.
    pub fn strong_eq(&self, other: &EntityTag) -> bool {
        !self.weak && !other.weak && self.opaque == other.opaque
    }

    /// Weak comparison: equal opaque data, weakness ignored.
    pub fn weak_eq(&self, other: &EntityTag) -> bool {
        self.opaque == other.opaque
    }
}

impl std::fmt::Display for EntityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.opaque)
        } else {
            write!(f, "\"{}\"", self.opaque)
        }
    }
}

/// A parsed `If-Match` / `If-None-Match` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagList {
    Any,
    Tags(Vec<EntityTag>),
}

impl TagList {
    /// Parse a comma-separated entity-tag list. Unparseable members are
    /// dropped; a value with no usable members parses to `None`.
    pub fn parse(value: &str) -> Option<TagList> {
        if value.trim() == "*" {
            return Some(TagList::Any);
        }
        let tags: Vec<EntityTag> = value.split(',').filter_map(EntityTag::parse).collect();
        if tags.is_empty() {
            None
        } else {
            Some(TagList::Tags(tags))
        }
    }

    pub fn from_headers(headers: &HeaderMap, name: header::HeaderName) -> Option<TagList> {
        let value = headers.get(name)?.to_str().ok()?;
        TagList::parse(value)
    }

    pub fn any_strong_match(&self, current: &EntityTag) -> bool {
        match self {
            TagList::Any => true,
            TagList::Tags(tags) => tags.iter().any(|tag| tag.strong_eq(current)),
        }
    }

    pub fn any_weak_match(&self, current: &EntityTag) -> bool {
        match self {
            TagList::Any => true,
            TagList::Tags(tags) => tags.iter().any(|tag| tag.weak_eq(current)),
        }
    }
}

/// A parsed `If-Range` value: a single entity tag or an HTTP date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfRange {
    Tag(EntityTag),
    Date(SystemTime),
}

impl IfRange {
    pub fn from_headers(headers: &HeaderMap) -> Option<IfRange> {
        let value = headers.get(header::IF_RANGE)?.to_str().ok()?;
        let trimmed = value.trim();
        if trimmed.starts_with('"') || trimmed.starts_with("W/") || trimmed.starts_with("w/") {
            EntityTag::parse(trimmed).map(IfRange::Tag)
        } else {
            httpdate::parse_http_date(trimmed).ok().map(IfRange::Date)
        }
    }
}

/// Parse an HTTP-date request header such as `If-Modified-Since`.
pub fn date_header(headers: &HeaderMap, name: header::HeaderName) -> Option<SystemTime> {
    let value = headers.get(name)?.to_str().ok()?;
    httpdate::parse_http_date(value.trim()).ok()
}

/// Seconds since the epoch, for whole-second date comparisons. HTTP dates
/// only carry seconds, so sub-second modification times must not defeat
/// revalidation.
pub(crate) fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
