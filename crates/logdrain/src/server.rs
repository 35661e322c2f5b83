// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{http, Method, Request, Response, StatusCode};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::drain::DrainHandler;
use crate::http_utils::HttpResponse;

pub const DRAIN_ENDPOINT_PATH: &str = "/drain";
pub const HEALTH_ENDPOINT_PATH: &str = "/health";

pub struct DrainServer {
    handler: Arc<DrainHandler>,
}

impl DrainServer {
    #[must_use]
    pub fn new(handler: DrainHandler) -> Self {
        DrainServer {
            handler: Arc::new(handler),
        }
    }

    /// Binds `0.0.0.0:<port>` and serves until `cancel` fires.
    pub async fn start(&self, port: u16, cancel: CancellationToken) -> io::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(&addr).await?;
        info!("drain listening on {addr}");
        self.serve(listener, cancel).await
    }

    /// Serves connections accepted on `listener` until `cancel` fires.
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> io::Result<()> {
        let handler = Arc::clone(&self.handler);
        let service = service_fn(move |req| {
            let handler = Arc::clone(&handler);
            async move { endpoint_handler(&handler, req).await }
        });

        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("drain server stopping");
                    joinset.abort_all();
                    return Ok(());
                }
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e);
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        error!("Connection handler panicked: {e:?}");
                        continue;
                    }
                    Ok(()) | Err(_) => continue,
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    debug!("Connection error: {e}");
                }
            });
        }
    }
}

async fn endpoint_handler(
    handler: &DrainHandler,
    req: Request<hyper::body::Incoming>,
) -> http::Result<HttpResponse> {
    match (req.method(), req.uri().path()) {
        (_, DRAIN_ENDPOINT_PATH) => handler.handle(req).await,
        (&Method::GET | &Method::HEAD, HEALTH_ENDPOINT_PATH) => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from_static(b"OK"))),
        _ => {
            let mut not_found = Response::default();
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            Ok(not_found)
        }
    }
}
