//! Byte-range planning: `Range` header parsing, clamping, and the
//! multipart/byteranges framing layout.
//!
//! A syntactically broken header is ignored (the full content is served);
//! a parseable header whose ranges cannot be satisfied yields a 416 plan.

use std::fmt::Write;

use bytes::Bytes;
use rand::Rng;

/// Inclusive byte interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// What the response body will cover.
#[derive(Debug)]
pub enum RangePlan {
    /// Serve the whole resource with status 200.
    Full,
    /// One satisfiable range, status 206.
    Single(ByteRange),
    /// Two or more satisfiable ranges, status 206 with multipart framing.
    Multipart(MultipartPlan),
    /// Status 416 with `Content-Range: bytes */<size>`.
    Unsatisfiable,
}

/// Precomputed multipart/byteranges layout. The header block of every part
/// and the closing delimiter are fixed up front so the framed length is
/// known before the first byte is streamed.
#[derive(Debug)]
pub struct MultipartPlan {
    pub boundary: String,
    pub parts: Vec<MultipartPart>,
    pub tail: Bytes,
    /// Exact framed byte length, used for `Content-Length`.
    pub content_length: u64,
    /// Top-level `Content-Type` value carrying the boundary.
    pub content_type: String,
}

#[derive(Debug)]
pub struct MultipartPart {
    pub range: ByteRange,
    /// Delimiter line plus part headers, up to and including the blank line.
    pub header: Bytes,
}

/// Plan the response extent for a request.
///
/// `part_content_type` is the entity's `Content-Type` value, echoed into
/// each part's header block when multipart framing is needed.
pub fn plan(
    header: Option<&str>,
    size: Option<u64>,
    max_ranges: usize,
    part_content_type: Option<&str>,
) -> RangePlan {
    let (Some(header), Some(size)) = (header, size) else {
        return RangePlan::Full;
    };
    if max_ranges == 0 {
        return RangePlan::Full;
    }

    let Some(specs) = parse_specs(header) else {
        return RangePlan::Full;
    };
    if specs.len() > max_ranges {
        // Degrade to the full content rather than refusing the request.
        return RangePlan::Full;
    }

    let mut whole_request_unsatisfiable = false;
    let mut ranges: Vec<ByteRange> = Vec::with_capacity(specs.len());
    for spec in specs {
        match spec {
            RangeSpec::FromTo(start, end) => {
                if start >= size {
                    whole_request_unsatisfiable = true;
                } else if start <= end {
                    ranges.push(ByteRange {
                        start,
                        end: end.min(size - 1),
                    });
                }
            }
            RangeSpec::From(start) => {
                if start >= size {
                    whole_request_unsatisfiable = true;
                } else {
                    ranges.push(ByteRange {
                        start,
                        end: size - 1,
                    });
                }
            }
            RangeSpec::Suffix(len) => {
                if len > 0 && size > 0 {
                    ranges.push(ByteRange {
                        start: size.saturating_sub(len),
                        end: size - 1,
                    });
                }
            }
        }
    }

    if whole_request_unsatisfiable || ranges.is_empty() {
        return RangePlan::Unsatisfiable;
    }
    if ranges.len() == 1 {
        return RangePlan::Single(ranges[0]);
    }
    RangePlan::Multipart(MultipartPlan::build(ranges, size, part_content_type))
}

#[derive(Debug, Clone, Copy)]
enum RangeSpec {
    FromTo(u64, u64),
    From(u64),
    Suffix(u64),
}

/// Syntactic parse of a `Range` value. `None` means the header is malformed
/// or uses a unit other than `bytes` and must be ignored wholesale.
fn parse_specs(header: &str) -> Option<Vec<RangeSpec>> {
    let ranges = header.trim().strip_prefix("bytes=")?;

    let mut specs = Vec::new();
    for piece in ranges.split(',') {
        let piece = piece.trim();
        let (left, right) = piece.split_once('-')?;
        let spec = match (left.is_empty(), right.is_empty()) {
            (true, false) => RangeSpec::Suffix(right.parse().ok()?),
            (false, true) => RangeSpec::From(left.parse().ok()?),
            (false, false) => RangeSpec::FromTo(left.parse().ok()?, right.parse().ok()?),
            (true, true) => return None,
        };
        specs.push(spec);
    }

    if specs.is_empty() {
        return None;
    }
    Some(specs)
}

impl MultipartPlan {
    fn build(ranges: Vec<ByteRange>, size: u64, part_content_type: Option<&str>) -> MultipartPlan {
        let boundary = generate_boundary();
        let mut content_length = 0u64;

        let parts: Vec<MultipartPart> = ranges
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                let mut header = String::new();
                if i > 0 {
                    header.push_str("\r\n");
                }
                let _ = write!(header, "--{boundary}\r\n");
                if let Some(content_type) = part_content_type {
                    let _ = write!(header, "content-type: {content_type}\r\n");
                }
                let _ = write!(
                    header,
                    "content-range: bytes {}-{}/{}\r\n\r\n",
                    range.start, range.end, size
                );

                content_length += header.len() as u64 + range.len();
                MultipartPart {
                    range,
                    header: Bytes::from(header),
                }
            })
            .collect();

        let tail = Bytes::from(format!("\r\n--{boundary}--"));
        content_length += tail.len() as u64;

        MultipartPlan {
            content_type: format!("multipart/byteranges; boundary={boundary}"),
            boundary,
            parts,
            tail,
            content_length,
        }
    }
}

const BOUNDARY_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
const BOUNDARY_LEN: usize = 32;

/// Fresh random boundary token per response.
fn generate_boundary() -> String {
    let mut rng = rand::thread_rng();
    (0..BOUNDARY_LEN)
        .map(|_| BOUNDARY_CHARS[rng.gen_range(0..BOUNDARY_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(header: &str, size: u64) -> ByteRange {
        match plan(Some(header), Some(size), 200, None) {
            RangePlan::Single(range) => range,
            other => panic!("expected single range for {header:?}, got {other:?}"),
        }
    }

    #[test]
    fn no_header_or_unknown_size_serves_full() {
        assert!(matches!(plan(None, Some(5), 200, None), RangePlan::Full));
        assert!(matches!(
            plan(Some("bytes=0-0"), None, 200, None),
            RangePlan::Full
        ));
    }

    #[test]
    fn single_ranges() {
        assert_eq!(single("bytes=0-0", 5), ByteRange { start: 0, end: 0 });
        assert_eq!(single("bytes=1-", 5), ByteRange { start: 1, end: 4 });
        assert_eq!(single("bytes=-3", 9), ByteRange { start: 6, end: 8 });
        // Suffix longer than the resource covers it entirely.
        assert_eq!(single("bytes=-100", 9), ByteRange { start: 0, end: 8 });
        // End is clamped to the last byte.
        assert_eq!(single("bytes=2-999", 5), ByteRange { start: 2, end: 4 });
    }

    #[test]
    fn start_past_the_end_is_unsatisfiable() {
        assert!(matches!(
            plan(Some("bytes=7-7"), Some(5), 200, None),
            RangePlan::Unsatisfiable
        ));
        assert!(matches!(
            plan(Some("bytes=5-"), Some(5), 200, None),
            RangePlan::Unsatisfiable
        ));
        // One out-of-bounds start poisons the whole request.
        assert!(matches!(
            plan(Some("bytes=0-1,9-"), Some(5), 200, None),
            RangePlan::Unsatisfiable
        ));
    }

    #[test]
    fn empty_suffix_is_unsatisfiable() {
        assert!(matches!(
            plan(Some("bytes=-0"), Some(5), 200, None),
            RangePlan::Unsatisfiable
        ));
    }

    #[test]
    fn inverted_range_is_dropped_not_fatal() {
        assert!(matches!(
            plan(Some("bytes=4-2"), Some(5), 200, None),
            RangePlan::Unsatisfiable
        ));
        assert_eq!(single("bytes=4-2,1-1", 5), ByteRange { start: 1, end: 1 });
    }

    #[test]
    fn malformed_headers_are_ignored() {
        for header in [
            "test=1-1",
            "bytes=a-b",
            "bytes=1",
            "bytes=-",
            "bytes=",
            "bytes=1-2;3-4",
            "octets=1-2",
        ] {
            assert!(
                matches!(plan(Some(header), Some(5), 200, None), RangePlan::Full),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn too_many_ranges_degrade_to_full() {
        assert!(matches!(
            plan(Some("bytes=0-0,1-1,2-2"), Some(5), 2, None),
            RangePlan::Full
        ));
        // max_ranges of one disables multipart but keeps single ranges.
        assert!(matches!(
            plan(Some("bytes=0-0,2-2"), Some(5), 1, None),
            RangePlan::Full
        ));
        assert!(matches!(
            plan(Some("bytes=0-0"), Some(5), 1, None),
            RangePlan::Single(_)
        ));
        assert!(matches!(
            plan(Some("bytes=0-0"), Some(5), 0, None),
            RangePlan::Full
        ));
    }

    #[test]
    fn multipart_preserves_order_without_coalescing() {
        let plan = match plan(
            Some("bytes=2-2,0-4,0-1"),
            Some(5),
            200,
            Some("text/plain"),
        ) {
            RangePlan::Multipart(plan) => plan,
            other => panic!("expected multipart, got {other:?}"),
        };
        let ranges: Vec<ByteRange> = plan.parts.iter().map(|p| p.range).collect();
        assert_eq!(
            ranges,
            [
                ByteRange { start: 2, end: 2 },
                ByteRange { start: 0, end: 4 },
                ByteRange { start: 0, end: 1 },
            ]
        );
    }

    #[test]
    fn multipart_framing_layout() {
        let plan = match plan(Some("bytes=0-0,2-2"), Some(5), 200, Some("text/plain")) {
            RangePlan::Multipart(plan) => plan,
            other => panic!("expected multipart, got {other:?}"),
        };

        let boundary = &plan.boundary;
        assert_eq!(
            plan.content_type,
            format!("multipart/byteranges; boundary={boundary}")
        );

        let first = std::str::from_utf8(&plan.parts[0].header).unwrap();
        assert_eq!(
            first,
            format!("--{boundary}\r\ncontent-type: text/plain\r\ncontent-range: bytes 0-0/5\r\n\r\n")
        );
        let second = std::str::from_utf8(&plan.parts[1].header).unwrap();
        assert!(second.starts_with(&format!("\r\n--{boundary}\r\n")));
        assert_eq!(std::str::from_utf8(&plan.tail).unwrap(), format!("\r\n--{boundary}--"));

        // Content-Length matches the framed emission byte for byte.
        let framed: u64 = plan
            .parts
            .iter()
            .map(|p| p.header.len() as u64 + p.range.len())
            .sum::<u64>()
            + plan.tail.len() as u64;
        assert_eq!(plan.content_length, framed);
    }

    #[test]
    fn boundary_shape() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_eq!(a.len(), BOUNDARY_LEN);
        assert!(a.bytes().all(|c| BOUNDARY_CHARS.contains(&c)));
        assert_ne!(a, b);
    }
}
