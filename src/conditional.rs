//! Conditional request evaluation per RFC 9110 §13.2.
//!
//! Preconditions are checked in the mandated order; a missing validator on
//! the resource side makes the matching precondition pass.

use std::time::SystemTime;

use http::header;
use http::{HeaderMap, Method};

use crate::headers::{self, EntityTag, IfRange, TagList};

/// Outcome of precondition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Serve the representation (200/206 path).
    Proceed,
    /// 304, empty body.
    NotModified,
    /// 412, empty body.
    PreconditionFailed,
}

/// Evaluate `If-Match`, `If-Unmodified-Since`, `If-None-Match` and
/// `If-Modified-Since` against the current validators.
pub fn evaluate(
    method: &Method,
    headers: &HeaderMap,
    etag: Option<&EntityTag>,
    mtime: Option<SystemTime>,
) -> Verdict {
    let is_read = *method == Method::GET || *method == Method::HEAD;

    if let Some(if_match) = TagList::from_headers(headers, header::IF_MATCH) {
        if let Some(etag) = etag {
            if !if_match.any_strong_match(etag) {
                return Verdict::PreconditionFailed;
            }
        }
    }

    if let Some(since) = headers::date_header(headers, header::IF_UNMODIFIED_SINCE) {
        if let Some(mtime) = mtime {
            if headers::unix_seconds(mtime) > headers::unix_seconds(since) {
                return Verdict::PreconditionFailed;
            }
        }
    }

    if let Some(if_none_match) = TagList::from_headers(headers, header::IF_NONE_MATCH) {
        if let Some(etag) = etag {
            if if_none_match.any_weak_match(etag) {
                return if is_read {
                    Verdict::NotModified
                } else {
                    Verdict::PreconditionFailed
                };
            }
        }
        // If-None-Match was evaluated; If-Modified-Since must be ignored.
        return Verdict::Proceed;
    }

    if is_read {
        if let Some(since) = headers::date_header(headers, header::IF_MODIFIED_SINCE) {
            if let Some(mtime) = mtime {
                if headers::unix_seconds(mtime) <= headers::unix_seconds(since) {
                    return Verdict::NotModified;
                }
            }
        }
    }

    Verdict::Proceed
}

/// Whether a `Range` header may be honored given `If-Range`.
///
/// No `If-Range` means yes. An entity-tag `If-Range` must strongly match the
/// current ETag; a date form must equal the modification time. Otherwise the
/// range is dropped and the full representation served.
pub fn range_applies(
    headers: &HeaderMap,
    etag: Option<&EntityTag>,
    mtime: Option<SystemTime>,
) -> bool {
    match IfRange::from_headers(headers) {
        None => true,
        Some(IfRange::Tag(tag)) => etag.is_some_and(|current| tag.strong_eq(current)),
        Some(IfRange::Date(date)) => mtime.is_some_and(|mtime| {
            headers::unix_seconds(mtime) == headers::unix_seconds(date)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;
    use std::time::{Duration, UNIX_EPOCH};

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn tag() -> EntityTag {
        EntityTag::new(false, "5-1f4-identity")
    }

    fn mtime() -> SystemTime {
        // Sat, 01 Jan 2022 00:00:00 GMT
        UNIX_EPOCH + Duration::from_secs(1_640_995_200)
    }

    const MTIME_DATE: &str = "Sat, 01 Jan 2022 00:00:00 GMT";
    const EARLIER_DATE: &str = "Fri, 31 Dec 2021 00:00:00 GMT";
    const LATER_DATE: &str = "Sun, 02 Jan 2022 00:00:00 GMT";

    #[test]
    fn no_preconditions_proceed() {
        let verdict = evaluate(&Method::GET, &HeaderMap::new(), Some(&tag()), Some(mtime()));
        assert_eq!(verdict, Verdict::Proceed);
    }

    #[test]
    fn if_match_mismatch_fails() {
        let headers = headers(&[(header::IF_MATCH, "\"other\"")]);
        let verdict = evaluate(&Method::GET, &headers, Some(&tag()), None);
        assert_eq!(verdict, Verdict::PreconditionFailed);

        // A missing current ETag lets the precondition pass.
        let verdict = evaluate(&Method::GET, &headers, None, None);
        assert_eq!(verdict, Verdict::Proceed);
    }

    #[test]
    fn if_match_weak_tags_never_match() {
        let headers = headers(&[(header::IF_MATCH, "W/\"5-1f4-identity\"")]);
        let verdict = evaluate(&Method::GET, &headers, Some(&tag()), None);
        assert_eq!(verdict, Verdict::PreconditionFailed);
    }

    #[test]
    fn if_match_star_accepts_existing() {
        let headers = headers(&[(header::IF_MATCH, "*")]);
        let verdict = evaluate(&Method::GET, &headers, Some(&tag()), None);
        assert_eq!(verdict, Verdict::Proceed);
    }

    #[test]
    fn if_unmodified_since() {
        let fails = headers(&[(header::IF_UNMODIFIED_SINCE, EARLIER_DATE)]);
        assert_eq!(
            evaluate(&Method::GET, &fails, None, Some(mtime())),
            Verdict::PreconditionFailed
        );

        let passes = headers(&[(header::IF_UNMODIFIED_SINCE, MTIME_DATE)]);
        assert_eq!(
            evaluate(&Method::GET, &passes, None, Some(mtime())),
            Verdict::Proceed
        );

        // No modification time: precondition passes.
        assert_eq!(
            evaluate(&Method::GET, &fails, None, None),
            Verdict::Proceed
        );
    }

    #[test]
    fn if_none_match_matches() {
        let headers = headers(&[(header::IF_NONE_MATCH, "\"5-1f4-identity\"")]);
        assert_eq!(
            evaluate(&Method::GET, &headers, Some(&tag()), None),
            Verdict::NotModified
        );
        assert_eq!(
            evaluate(&Method::HEAD, &headers, Some(&tag()), None),
            Verdict::NotModified
        );
        // Non-read methods get 412 instead of 304.
        assert_eq!(
            evaluate(&Method::POST, &headers, Some(&tag()), None),
            Verdict::PreconditionFailed
        );
    }

    #[test]
    fn if_none_match_uses_weak_comparison() {
        let headers = headers(&[(header::IF_NONE_MATCH, "W/\"5-1f4-identity\"")]);
        assert_eq!(
            evaluate(&Method::GET, &headers, Some(&tag()), None),
            Verdict::NotModified
        );
    }

    #[test]
    fn if_none_match_suppresses_if_modified_since() {
        let headers = headers(&[
            (header::IF_NONE_MATCH, "\"other\""),
            (header::IF_MODIFIED_SINCE, LATER_DATE),
        ]);
        assert_eq!(
            evaluate(&Method::GET, &headers, Some(&tag()), Some(mtime())),
            Verdict::Proceed
        );
    }

    #[test]
    fn if_modified_since() {
        let not_modified = headers(&[(header::IF_MODIFIED_SINCE, LATER_DATE)]);
        assert_eq!(
            evaluate(&Method::GET, &not_modified, None, Some(mtime())),
            Verdict::NotModified
        );

        let same_second = headers(&[(header::IF_MODIFIED_SINCE, MTIME_DATE)]);
        assert_eq!(
            evaluate(&Method::GET, &same_second, None, Some(mtime())),
            Verdict::NotModified
        );

        let modified = headers(&[(header::IF_MODIFIED_SINCE, EARLIER_DATE)]);
        assert_eq!(
            evaluate(&Method::GET, &modified, None, Some(mtime())),
            Verdict::Proceed
        );

        // Only GET and HEAD revalidate this way.
        assert_eq!(
            evaluate(&Method::POST, &not_modified, None, Some(mtime())),
            Verdict::Proceed
        );
    }

    #[test]
    fn if_range_gates_ranges() {
        assert!(range_applies(&HeaderMap::new(), Some(&tag()), None));

        let matching = headers(&[(header::IF_RANGE, "\"5-1f4-identity\"")]);
        assert!(range_applies(&matching, Some(&tag()), None));

        let stale = headers(&[(header::IF_RANGE, "\"old\"")]);
        assert!(!range_applies(&stale, Some(&tag()), None));

        // Weak tags can never validate a range request.
        let weak = headers(&[(header::IF_RANGE, "W/\"5-1f4-identity\"")]);
        assert!(!range_applies(&weak, Some(&tag()), None));

        let same_date = headers(&[(header::IF_RANGE, MTIME_DATE)]);
        assert!(range_applies(&same_date, None, Some(mtime())));

        let other_date = headers(&[(header::IF_RANGE, EARLIER_DATE)]);
        assert!(!range_applies(&other_date, None, Some(mtime())));
    }
}
