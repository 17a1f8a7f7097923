//! Response body implementations.
//!
//! All bodies produce one chunk per poll, bounded by the configured chunk
//! size, so the sink's readiness is the only thing driving reads from the
//! backing store.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use http::HeaderMap;
use http_body::combinators::UnsyncBoxBody;
use http_body::{Body, SizeHint};
use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::io::{poll_read_buf, ReaderStream};

use crate::range::{MultipartPart, MultipartPlan};

/// The boxed body type every response carries.
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// [`AsyncSeek`] narrowed to seeking from the start, which is all a range
/// body ever needs. Automatically available for any seekable reader.
pub trait AsyncSeekStart {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()>;

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T: AsyncSeek> AsyncSeekStart for T {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        AsyncSeek::start_seek(self, io::SeekFrom::Start(position))
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncSeek::poll_complete(self, cx).map_ok(|_| ())
    }
}

/// Adapter that turns an `impl AsyncRead` into an `impl Body`, for content
/// whose length is unknown up front (directory listings, sizeless storages).
#[pin_project]
#[derive(Debug)]
pub struct AsyncReadBody<T> {
    #[pin]
    reader: ReaderStream<T>,
}

impl<T> AsyncReadBody<T>
where
    T: AsyncRead,
{
    pub(crate) fn with_capacity(read: T, capacity: usize) -> Self {
        Self {
            reader: ReaderStream::with_capacity(read, capacity),
        }
    }
}

impl<T> Body for AsyncReadBody<T>
where
    T: AsyncRead,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        self.project().reader.poll_next(cx)
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }
}

/// Body serving one contiguous interval of a seekable reader: the whole
/// resource or a single requested range.
#[derive(Debug)]
pub struct RangedBody<R> {
    reader: R,
    chunk_size: usize,
    length: u64,
    state: RangedState,
}

#[derive(Debug)]
enum RangedState {
    Seek { start: u64, remaining: u64 },
    Seeking { remaining: u64 },
    Reading { remaining: u64 },
    Done,
}

impl<R> RangedBody<R>
where
    R: AsyncRead + AsyncSeekStart + Unpin,
{
    pub(crate) fn new(reader: R, start: u64, length: u64, chunk_size: usize) -> Self {
        let state = if start == 0 {
            // Fresh readers sit at offset zero already.
            RangedState::Reading { remaining: length }
        } else {
            RangedState::Seek {
                start,
                remaining: length,
            }
        };
        RangedBody {
            reader,
            chunk_size,
            length,
            state,
        }
    }
}

impl<R> Body for RangedBody<R>
where
    R: AsyncRead + AsyncSeekStart + Unpin,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        let this = self.get_mut();
        loop {
            match this.state {
                RangedState::Seek { start, remaining } => {
                    if let Err(err) = Pin::new(&mut this.reader).start_seek(start) {
                        this.state = RangedState::Done;
                        return Poll::Ready(Some(Err(err)));
                    }
                    this.state = RangedState::Seeking { remaining };
                }
                RangedState::Seeking { remaining } => {
                    if let Err(err) = ready!(Pin::new(&mut this.reader).poll_complete(cx)) {
                        this.state = RangedState::Done;
                        return Poll::Ready(Some(Err(err)));
                    }
                    this.state = RangedState::Reading { remaining };
                }
                RangedState::Reading { remaining } => {
                    if remaining == 0 {
                        this.state = RangedState::Done;
                        return Poll::Ready(None);
                    }
                    let chunk = ready!(poll_chunk(
                        &mut this.reader,
                        cx,
                        this.chunk_size,
                        remaining
                    ));
                    match chunk {
                        Ok(chunk) => {
                            this.state = RangedState::Reading {
                                remaining: remaining - chunk.len() as u64,
                            };
                            return Poll::Ready(Some(Ok(chunk)));
                        }
                        Err(err) => {
                            this.state = RangedState::Done;
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
                RangedState::Done => return Poll::Ready(None),
            }
        }
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.state, RangedState::Done)
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length)
    }
}

/// multipart/byteranges body over one seekable reader.
///
/// Parts are served strictly one after another: the next seek is issued only
/// once the previous part's bytes are fully emitted, so at most one backing
/// read is in flight.
#[derive(Debug)]
pub struct MultipartBody<R> {
    reader: R,
    chunk_size: usize,
    parts: std::collections::VecDeque<MultipartPart>,
    tail: Option<Bytes>,
    content_length: u64,
    state: MultipartState,
}

#[derive(Debug)]
enum MultipartState {
    NextPart,
    Seeking { remaining: u64 },
    Reading { remaining: u64 },
    Done,
}

impl<R> MultipartBody<R>
where
    R: AsyncRead + AsyncSeekStart + Unpin,
{
    pub(crate) fn new(reader: R, plan: MultipartPlan, chunk_size: usize) -> Self {
        MultipartBody {
            reader,
            chunk_size,
            parts: plan.parts.into(),
            tail: Some(plan.tail),
            content_length: plan.content_length,
            state: MultipartState::NextPart,
        }
    }

    fn fail(&mut self, err: io::Error) -> Poll<Option<Result<Bytes, io::Error>>> {
        self.state = MultipartState::Done;
        self.tail = None;
        Poll::Ready(Some(Err(err)))
    }
}

impl<R> Body for MultipartBody<R>
where
    R: AsyncRead + AsyncSeekStart + Unpin,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        let this = self.get_mut();
        loop {
            match this.state {
                MultipartState::NextPart => match this.parts.pop_front() {
                    Some(part) => {
                        if let Err(err) = Pin::new(&mut this.reader).start_seek(part.range.start)
                        {
                            return this.fail(err);
                        }
                        this.state = MultipartState::Seeking {
                            remaining: part.range.len(),
                        };
                        return Poll::Ready(Some(Ok(part.header)));
                    }
                    None => {
                        this.state = MultipartState::Done;
                        match this.tail.take() {
                            Some(tail) => return Poll::Ready(Some(Ok(tail))),
                            None => return Poll::Ready(None),
                        }
                    }
                },
                MultipartState::Seeking { remaining } => {
                    if let Err(err) = ready!(Pin::new(&mut this.reader).poll_complete(cx)) {
                        return this.fail(err);
                    }
                    this.state = MultipartState::Reading { remaining };
                }
                MultipartState::Reading { remaining } => {
                    if remaining == 0 {
                        this.state = MultipartState::NextPart;
                        continue;
                    }
                    match ready!(poll_chunk(&mut this.reader, cx, this.chunk_size, remaining)) {
                        Ok(chunk) => {
                            this.state = MultipartState::Reading {
                                remaining: remaining - chunk.len() as u64,
                            };
                            return Poll::Ready(Some(Ok(chunk)));
                        }
                        Err(err) => return this.fail(err),
                    }
                }
                MultipartState::Done => return Poll::Ready(None),
            }
        }
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.content_length)
    }
}

/// Read at most `min(chunk_size, remaining)` bytes. An immediate EOF is an
/// error here: the planner promised more bytes than the store can deliver.
fn poll_chunk<R: AsyncRead + Unpin>(
    reader: &mut R,
    cx: &mut Context<'_>,
    chunk_size: usize,
    remaining: u64,
) -> Poll<io::Result<Bytes>> {
    let capacity = chunk_size.min(usize::try_from(remaining).unwrap_or(usize::MAX));
    let mut buf = BytesMut::with_capacity(capacity);
    let read = ready!(poll_read_buf(Pin::new(reader), cx, &mut buf))?;
    if read == 0 {
        return Poll::Ready(Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "backing store ended before the planned range",
        )));
    }
    Poll::Ready(Ok(buf.freeze()))
}
