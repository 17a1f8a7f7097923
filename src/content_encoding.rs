//! Content-encoding variant mappings and negotiation.
//!
//! A mapping pairs a path matcher with an ordered list of encodings and the
//! substitution patterns that derive each variant's path. Negotiation picks
//! the client's best acceptable encoding among them; the storage then probes
//! the derived paths in that order.

use regex::{Captures, Regex};

use crate::headers::{AcceptEncoding, QValue};

/// Label of the no-op encoding.
pub const IDENTITY: &str = "identity";

#[derive(Debug, Clone)]
struct EncodingPref {
    name: String,
    replacement: String,
    order: usize,
}

/// One matcher plus its encoding preference table, normalized at
/// construction: names are lowercased and an identity entry is synthesized
/// (replacement `$&`, ranked last) when the input does not list one, so
/// identity always stays a candidate.
#[derive(Debug, Clone)]
pub struct EncodingMapping {
    matcher: Regex,
    prefs: Vec<EncodingPref>,
}

impl EncodingMapping {
    pub fn new<N, R>(matcher: Regex, encodings: impl IntoIterator<Item = (N, R)>) -> EncodingMapping
    where
        N: Into<String>,
        R: Into<String>,
    {
        let mut prefs: Vec<EncodingPref> = encodings
            .into_iter()
            .enumerate()
            .map(|(order, (name, replacement))| EncodingPref {
                name: name.into().to_ascii_lowercase(),
                replacement: replacement.into(),
                order,
            })
            .collect();

        if !prefs.iter().any(|pref| pref.name == IDENTITY) {
            prefs.push(EncodingPref {
                name: IDENTITY.to_owned(),
                replacement: "$&".to_owned(),
                order: prefs.len(),
            });
        }

        EncodingMapping { matcher, prefs }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Encodings acceptable to the client, best first: quality descending,
    /// declared order breaking ties. Zero-quality encodings are dropped,
    /// identity included.
    pub fn candidates(&self, accept: &AcceptEncoding) -> Vec<Candidate<'_>> {
        let mut ranked: Vec<(QValue, &EncodingPref)> = self
            .prefs
            .iter()
            .filter_map(|pref| {
                let q = accept.effective_quality(&pref.name);
                (q > QValue::ZERO).then_some((q, pref))
            })
            .collect();
        ranked.sort_by(|(qa, pa), (qb, pb)| qb.cmp(qa).then(pa.order.cmp(&pb.order)));

        ranked
            .into_iter()
            .map(|(_, pref)| Candidate {
                name: &pref.name,
                replacement: &pref.replacement,
            })
            .collect()
    }

    /// Derive the variant path for `replacement`, or `None` when the matcher
    /// no longer matches.
    ///
    /// Only the first match is rewritten. The replacement string understands
    /// `$&` (whole match), `$N` (capture group) and `$$` (literal dollar);
    /// anything else after `$` is kept literally.
    pub fn encoded_path(&self, path: &str, replacement: &str) -> Option<String> {
        let caps = self.matcher.captures(path)?;
        let matched = caps.get(0).expect("capture group 0 always exists");

        let mut out = String::with_capacity(path.len() + replacement.len());
        out.push_str(&path[..matched.start()]);
        expand_replacement(&caps, replacement, &mut out);
        out.push_str(&path[matched.end()..]);
        Some(out)
    }
}

/// Candidate encoding in negotiated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub replacement: &'a str,
}

/// Ordered set of mappings; the first whose matcher accepts the path wins.
#[derive(Debug, Clone, Default)]
pub struct EncodingMappings {
    mappings: Vec<EncodingMapping>,
}

impl EncodingMappings {
    pub fn new(mappings: Vec<EncodingMapping>) -> EncodingMappings {
        EncodingMappings { mappings }
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn find(&self, path: &str) -> Option<&EncodingMapping> {
        self.mappings.iter().find(|mapping| mapping.matches(path))
    }
}

fn expand_replacement(caps: &Captures<'_>, replacement: &str, out: &mut String) {
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('&') => {
                chars.next();
                out.push_str(caps.get(0).map_or("", |m| m.as_str()));
            }
            Some(d) if d.is_ascii_digit() => {
                let mut index = chars.next().unwrap().to_digit(10).unwrap() as usize;
                // Two-digit group references bind greedily when the group exists.
                if let Some(d2) = chars.peek().copied().filter(char::is_ascii_digit) {
                    let wide = index * 10 + d2.to_digit(10).unwrap() as usize;
                    if caps.get(wide).is_some() {
                        chars.next();
                        index = wide;
                    }
                }
                match caps.get(index) {
                    Some(m) => out.push_str(m.as_str()),
                    // Out-of-range references stay literal.
                    None => {
                        out.push('$');
                        out.push_str(&index.to_string());
                    }
                }
            }
            _ => out.push('$'),
        }
    }
}
