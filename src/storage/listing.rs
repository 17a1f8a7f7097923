//! Lazily generated HTML directory listings.
//!
//! The listing is produced fragment by fragment as the body is drained, so a
//! large directory never sits in memory. Only `&` needs HTML-escaping: every
//! other markup-relevant character is already excluded from entry names by
//! the forbidden-character rule.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Buf, Bytes};
use regex::Regex;
use tokio::fs::ReadDir;
use tokio::io::{AsyncRead, ReadBuf};

use super::path::{encode_segment, forbidden_char};

/// Streaming HTML listing over a directory's entries.
#[derive(Debug)]
pub struct DirListing {
    entries: ReadDir,
    shown: String,
    ignore: Option<Regex>,
    pending: Bytes,
    state: ListingState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingState {
    Header,
    Entries,
    Footer,
    Eof,
}

impl DirListing {
    /// `shown` is the request path displayed in the page title, e.g. `/sub/`.
    pub(crate) fn new(entries: ReadDir, shown: String, ignore: Option<Regex>) -> DirListing {
        DirListing {
            entries,
            shown,
            ignore,
            pending: Bytes::new(),
            state: ListingState::Header,
        }
    }

    /// Move to the next fragment; `Ok(false)` means the listing is finished.
    fn poll_fragment(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<bool>> {
        loop {
            match self.state {
                ListingState::Header => {
                    let shown = escape_amp(&self.shown);
                    self.pending = Bytes::from(format!(
                        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\">\
                         <title>Index of {shown}</title></head>\n<body>\n\
                         <h1>Index of {shown}</h1>\n<ul>\n"
                    ));
                    self.state = ListingState::Entries;
                    return Poll::Ready(Ok(true));
                }
                ListingState::Entries => match ready!(self.entries.poll_next_entry(cx))? {
                    Some(entry) => {
                        let name = entry.file_name();
                        let Some(name) = name.to_str() else {
                            continue;
                        };
                        if forbidden_char(name).is_some() {
                            continue;
                        }
                        if self.ignore.as_ref().is_some_and(|re| re.is_match(name)) {
                            continue;
                        }
                        let href = escape_amp(&encode_segment(name));
                        let text = escape_amp(name);
                        self.pending =
                            Bytes::from(format!("<li><a href=\"{href}\">{text}</a></li>\n"));
                        return Poll::Ready(Ok(true));
                    }
                    None => {
                        self.state = ListingState::Footer;
                    }
                },
                ListingState::Footer => {
                    self.pending = Bytes::from_static(b"</ul>\n</body>\n</html>\n");
                    self.state = ListingState::Eof;
                    return Poll::Ready(Ok(true));
                }
                ListingState::Eof => return Poll::Ready(Ok(false)),
            }
        }
    }
}

impl AsyncRead for DirListing {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let take = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending[..take]);
                this.pending.advance(take);
                return Poll::Ready(Ok(()));
            }
            if !ready!(this.poll_fragment(cx))? {
                return Poll::Ready(Ok(()));
            }
        }
    }
}

fn escape_amp(value: &str) -> String {
    value.replace('&', "&amp;")
}
