//! `tower_service::Service` adapter over a [`Streamer`].
//!
//! The core stays framework-agnostic; this thin layer extracts the reference
//! from the request URI so the planner can be mounted directly in tower
//! stacks and hyper servers.

use std::convert::Infallible;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::{Request, Response};
use tower_service::Service;

use crate::body::ResponseBody;
use crate::options::ServeOptions;
use crate::response::Streamer;
use crate::storage::{Reference, Storage};

/// Serves every request through [`Streamer::prepare_response`], using the
/// request's URI path as the storage reference.
#[derive(Clone)]
pub struct StreamService<S> {
    streamer: Streamer<S>,
    options: ServeOptions,
}

impl<S> StreamService<S> {
    pub fn new(streamer: Streamer<S>) -> StreamService<S> {
        StreamService {
            streamer,
            options: ServeOptions::default(),
        }
    }

    /// Apply the same per-request overrides to every response.
    pub fn with_options(mut self, options: ServeOptions) -> Self {
        self.options = options;
        self
    }
}

impl<S, ReqBody> Service<Request<ReqBody>> for StreamService<S>
where
    S: Storage + Clone + Send + Sync + 'static,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let streamer = self.streamer.clone();
        let options = self.options.clone();
        // The planner only needs the request head; the body is dropped here.
        let (parts, _body) = req.into_parts();

        Box::pin(async move {
            let response = streamer
                .prepare_response(
                    &parts.method,
                    Reference::Path(parts.uri.path()),
                    &parts.headers,
                    &options,
                )
                .await;
            Ok(response)
        })
    }
}
