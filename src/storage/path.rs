//! Reference parsing and path vetting for path-shaped storages.
//!
//! A reference is either a percent-encoded absolute path or a pre-split
//! segment list. Both forms are reduced to decoded, validated segments before
//! anything touches the backing store.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use super::disk::OnDirectory;
use super::Reference;
use crate::error::StorageError;

/// Everything outside of RFC 3986 `pchar` gets percent-encoded when building
/// the canonical form of a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// A reference that passed every path rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VettedPath {
    /// Decoded, non-empty segments relative to the storage root.
    pub segments: Vec<String>,
    /// The reference named a directory and the storage is in listing mode.
    pub directory: bool,
}

/// First character of `segment` that the path rules reject.
///
/// The class covers separators, characters that break header values or shell
/// round-trips, and the C0/C1 control ranges.
pub(crate) fn forbidden_char(segment: &str) -> Option<char> {
    segment.chars().find(|c| {
        matches!(c,
            '/' | '?' | '<' | '>' | '\\' | ':' | '*' | '|' | '"'
            | '\u{0000}'..='\u{001f}'
            | '\u{0080}'..='\u{009f}')
    })
}

pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Display form of a reference, used in error payloads.
pub(crate) fn reference_display(reference: &Reference<'_>) -> String {
    match reference {
        Reference::Path(path) => (*path).to_owned(),
        Reference::Segments(parts) => parts.join("/"),
    }
}

/// Parse and vet a reference against the path rules.
///
/// String references are additionally checked for canonical percent-encoding:
/// a decodable reference whose canonical re-encoding (after `.`/`..`
/// resolution) differs from the input is rejected with
/// [`StorageError::NotNormalized`], which callers turn into a redirect.
pub(crate) fn parse_reference(
    reference: &Reference<'_>,
    ignore: Option<&Regex>,
    on_directory: OnDirectory,
) -> Result<VettedPath, StorageError> {
    let display = reference_display(reference);

    let segments = match reference {
        Reference::Path(path) => {
            let Some(rest) = path.strip_prefix('/') else {
                return Err(StorageError::MalformedPath {
                    reference: display,
                    reason: "path must start with '/'".to_owned(),
                });
            };

            let mut decoded = Vec::new();
            for raw in rest.split('/') {
                match decode_segment(raw) {
                    Ok(segment) => decoded.push(segment),
                    Err(reason) => {
                        return Err(StorageError::MalformedPath {
                            reference: display,
                            reason,
                        })
                    }
                }
            }

            // Resolve `.`/`..` lexically, clamping at the root.
            let mut normalized: Vec<String> = Vec::with_capacity(decoded.len());
            for segment in decoded {
                match segment.as_str() {
                    "." => {}
                    ".." => {
                        normalized.pop();
                    }
                    _ => normalized.push(segment),
                }
            }

            let canonical = canonical_form(&normalized);
            if canonical != *path {
                return Err(StorageError::NotNormalized {
                    reference: display,
                    normalized: canonical,
                });
            }

            normalized
        }
        Reference::Segments(parts) => {
            if parts.first().map(String::as_str) != Some("") {
                return Err(StorageError::InvalidPath {
                    reference: display,
                    reason: "first element must be the empty root segment".to_owned(),
                });
            }
            let segments: Vec<String> = parts[1..].to_vec();
            if let Some(segment) = segments.iter().find(|s| *s == "." || *s == "..") {
                return Err(StorageError::InvalidPath {
                    reference: display,
                    reason: format!("segment {segment:?} is not allowed"),
                });
            }
            segments
        }
    };

    vet_segments(display, segments, ignore, on_directory)
}

fn vet_segments(
    reference: String,
    mut segments: Vec<String>,
    ignore: Option<&Regex>,
    on_directory: OnDirectory,
) -> Result<VettedPath, StorageError> {
    // An empty segment anywhere but the last position means `//` appeared.
    if segments
        .iter()
        .rev()
        .skip(1)
        .any(|segment| segment.is_empty())
    {
        return Err(StorageError::ConsecutiveSlashes {
            reference,
            parts: segments,
        });
    }

    let trailing_slash = segments.last().is_some_and(|s| s.is_empty());
    if trailing_slash {
        segments.pop();
    }

    let rejected = segments
        .iter()
        .find_map(|s| forbidden_char(s).map(|found| (s.clone(), found)));
    if let Some((segment, found)) = rejected {
        return Err(StorageError::ForbiddenCharacter {
            reference,
            parts: segments,
            segment,
            found,
        });
    }

    if let Some(ignore) = ignore {
        let ignored = segments.iter().find(|s| ignore.is_match(s)).cloned();
        if let Some(segment) = ignored {
            return Err(StorageError::IgnoredFile {
                reference,
                parts: segments,
                segment,
            });
        }
    }

    let mut directory = false;
    if trailing_slash {
        match on_directory {
            OnDirectory::Error => {
                return Err(StorageError::TrailingSlash {
                    reference,
                    untrailed_parts: segments,
                })
            }
            OnDirectory::ListFiles => directory = true,
            OnDirectory::ServeIndex => segments.push("index.html".to_owned()),
        }
    }

    Ok(VettedPath {
        segments,
        directory,
    })
}

fn decode_segment(raw: &str) -> Result<String, String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return Err(format!("invalid percent escape in segment {raw:?}"));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| format!("segment {raw:?} is not valid UTF-8 after decoding"))
}

fn canonical_form(segments: &[String]) -> String {
    let mut out = String::from("/");
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(&encode_segment(segment));
    }
    out
}
