// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The `/drain` endpoint: reads one Logplex batch, classifies every line and queues the
//! resulting events on the lane owning their drain token.
//!
//! Lines of one batch are processed strictly in order, so events from one batch reach a
//! queue in the order they were framed. A full queue suspends the request until the lane's
//! forwarder catches up, which slows the upstream router down for that lane.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, AUTHORIZATION, CONNECTION};
use hyper::{http, Method, Request, StatusCode};
use tracing::{debug, error, warn};

use crate::auth::{self, Credentials};
use crate::classifier::{classify, Classification};
use crate::config::Config;
use crate::constants::{DRAIN_TOKEN_HEADER, TOKEN_PREFIX};
use crate::errors::EnqueueError;
use crate::events::Event;
use crate::framing::{FrameReader, LogFrame};
use crate::http_utils::{
    empty_response, log_and_create_http_response, verify_request_content_length, HttpResponse,
};
use crate::lanes::Lanes;
use crate::metrics::Context;
use crate::recycler::ConnectionRecycler;

pub struct DrainHandler {
    lanes: Arc<Lanes>,
    recycler: Arc<ConnectionRecycler>,
    credentials: Option<Credentials>,
    enqueue_timeout: Option<Duration>,
    max_content_length: usize,
    debug: bool,
}

impl DrainHandler {
    #[must_use]
    pub fn new(config: &Config, lanes: Arc<Lanes>, recycler: Arc<ConnectionRecycler>) -> Self {
        DrainHandler {
            lanes,
            recycler,
            credentials: config.credentials.clone(),
            enqueue_timeout: config.enqueue_timeout,
            max_content_length: config.max_request_content_length,
            debug: config.debug,
        }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> http::Result<HttpResponse>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut ctx = Context::new();
        let response = self.handle_with_context(req, &mut ctx).await;
        ctx.log();
        response
    }

    async fn handle_with_context<B>(
        &self,
        req: Request<B>,
        ctx: &mut Context,
    ) -> http::Result<HttpResponse>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if req.method() != Method::POST {
            ctx.count("errors.drain.wrong.method", 1);
            return log_and_create_http_response(
                &format!("Drain: method {} not allowed", req.method()),
                StatusCode::METHOD_NOT_ALLOWED,
            );
        }

        if let Some(credentials) = &self.credentials {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok());
            if let Err(e) = auth::check(header, credentials) {
                ctx.count("errors.auth.failure", 1);
                return log_and_create_http_response(
                    &format!("Drain: {e}"),
                    StatusCode::FORBIDDEN,
                );
            }
        }

        if let Some(response) =
            verify_request_content_length(req.headers(), self.max_content_length, "Drain")
        {
            return response;
        }

        let token = req
            .headers()
            .get(DRAIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = match Limited::new(req.into_body(), self.max_content_length)
            .collect()
            .await
        {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => {
                return log_and_create_http_response(
                    "Drain: Payload too large",
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Drain: Unable to read request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        self.process_batch(&body, token.as_deref(), ctx).await;

        let mut response = empty_response(StatusCode::NO_CONTENT)?;
        if self.recycler.take() {
            debug!("recycling connection");
            response
                .headers_mut()
                .insert(CONNECTION, HeaderValue::from_static("close"));
        }
        Ok(response)
    }

    /// Classifies and queues every line of `body`. `token` is the drain token the batch was
    /// sent under; a line whose sender name is itself a token replaces it for that line and
    /// all following ones.
    pub async fn process_batch(&self, body: &[u8], token: Option<&str>, ctx: &mut Context) {
        ctx.count("batch", 1);
        let start = Instant::now();
        let mut source_drain = token.filter(|t| !t.is_empty()).map(str::to_string);

        for frame in FrameReader::new(body) {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) if e.is_recoverable() => {
                    ctx.count("errors.frame.header", 1);
                    debug!("skipping line: {e}");
                    continue;
                }
                Err(e) => {
                    ctx.count("errors.frame.length", 1);
                    warn!("dropping the rest of the batch: {e}");
                    break;
                }
            };
            ctx.count("lines.total", 1);

            if frame.header.name.starts_with(TOKEN_PREFIX) {
                source_drain = Some(frame.header.name.to_string());
            }
            let Some(source) = source_drain.as_deref() else {
                ctx.count("errors.token.missing", 1);
                continue;
            };

            let classification = classify(&frame, source);
            ctx.count(classification.counter(), 1);
            match classification {
                Classification::Event(event) => self.enqueue(event, source, ctx).await,
                Classification::UserLine => {
                    if self.debug {
                        debug!("Unknown User Line - {}", describe(&frame));
                    }
                }
                Classification::UnknownPlatformLine => {
                    if self.debug {
                        debug!("Unknown Heroku Line - {}", describe(&frame));
                    }
                }
                Classification::Skipped(e) => debug!("skipping line: {e}"),
            }
        }

        ctx.measure_since("lines.parse.time", start);
    }

    async fn enqueue(&self, event: Event, source: &str, ctx: &mut Context) {
        let Some(lane) = self.lanes.get(source) else {
            ctx.count("errors.enqueue.closed", 1);
            error!("no lane available for {source}");
            return;
        };
        match lane.enqueue_timeout(event, self.enqueue_timeout).await {
            Ok(()) => {}
            Err(e @ EnqueueError::Timeout { .. }) => {
                ctx.count("errors.enqueue.timeout", 1);
                warn!("dropping event for {source}: {e}");
            }
            Err(e @ EnqueueError::Closed(_)) => {
                ctx.count("errors.enqueue.closed", 1);
                error!("dropping event for {source}: {e}");
            }
        }
    }
}

fn describe(frame: &LogFrame<'_>) -> String {
    let header = &frame.header;
    format!(
        "Header: PRI: {}, Time: {}, Hostname: {}, Name: {}, ProcId: {}, MsgId: {} - Body: {}",
        header.prival_version,
        header.time,
        header.hostname,
        header.name,
        header.procid,
        header.msgid,
        String::from_utf8_lossy(frame.body)
    )
}
