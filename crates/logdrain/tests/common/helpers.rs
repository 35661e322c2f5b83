// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::time::timeout;

/// Send an HTTP request over TCP and return the response status, headers and body
pub async fn send_tcp_request(
    addr: &str,
    uri: &str,
    method: &str,
    headers: &[(&str, &str)],
    body: Option<String>,
) -> Result<(Response<()>, String), Box<dyn std::error::Error>> {
    let stream = timeout(Duration::from_secs(2), tokio::net::TcpStream::connect(addr)).await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut request_builder = Request::builder().uri(uri).method(method);
    for (name, value) in headers {
        request_builder = request_builder.header(*name, *value);
    }

    let body = body.unwrap_or_default();
    request_builder = request_builder.header("Content-Length", body.len().to_string());
    let request = request_builder.body(Full::new(Bytes::from(body)))?;

    let response = timeout(Duration::from_secs(2), sender.send_request(request)).await??;
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok((
        Response::from_parts(parts, ()),
        String::from_utf8_lossy(&body).into_owned(),
    ))
}
