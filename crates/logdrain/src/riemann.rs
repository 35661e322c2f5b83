// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Riemann client speaking protocol buffers over TCP.
//!
//! Every message is a 4-byte big-endian length followed by an encoded [`proto::Msg`]. The
//! server answers each message with a `Msg` whose `ok` flag acknowledges it.

use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::errors::SinkError;
use crate::sink::{Metric, MetricSink, SinkEvent};

/// Upper bound on a single frame read from the wire.
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

pub mod proto {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Attribute {
        #[prost(string, required, tag = "1")]
        pub key: String,
        #[prost(string, optional, tag = "2")]
        pub value: Option<String>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Event {
        #[prost(int64, optional, tag = "1")]
        pub time: Option<i64>,
        #[prost(string, optional, tag = "2")]
        pub state: Option<String>,
        #[prost(string, optional, tag = "3")]
        pub service: Option<String>,
        #[prost(string, optional, tag = "4")]
        pub host: Option<String>,
        #[prost(string, optional, tag = "5")]
        pub description: Option<String>,
        #[prost(string, repeated, tag = "7")]
        pub tags: Vec<String>,
        #[prost(float, optional, tag = "8")]
        pub ttl: Option<f32>,
        #[prost(message, repeated, tag = "9")]
        pub attributes: Vec<Attribute>,
        #[prost(int64, optional, tag = "10")]
        pub time_micros: Option<i64>,
        #[prost(sint64, optional, tag = "13")]
        pub metric_sint64: Option<i64>,
        #[prost(double, optional, tag = "14")]
        pub metric_d: Option<f64>,
        #[prost(float, optional, tag = "15")]
        pub metric_f: Option<f32>,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Msg {
        #[prost(bool, optional, tag = "2")]
        pub ok: Option<bool>,
        #[prost(string, optional, tag = "3")]
        pub error: Option<String>,
        #[prost(message, repeated, tag = "6")]
        pub events: Vec<Event>,
    }
}

impl From<&SinkEvent> for proto::Event {
    fn from(event: &SinkEvent) -> Self {
        let (metric_sint64, metric_d) = match event.metric {
            Some(Metric::Int(n)) => (Some(n), None),
            Some(Metric::Float(f)) => (None, Some(f)),
            None => (None, None),
        };
        proto::Event {
            time: Some(event.time),
            state: event.state.clone(),
            service: Some(event.service.clone()),
            host: Some(event.host.clone()),
            description: Some(event.description.clone()),
            ttl: Some(event.ttl),
            attributes: event
                .attributes
                .iter()
                .map(|(key, value)| proto::Attribute {
                    key: key.clone(),
                    value: Some(value.clone()),
                })
                .collect(),
            metric_sint64,
            metric_d,
            ..Default::default()
        }
    }
}

/// Writes one length-prefixed message.
pub async fn write_msg<W>(writer: &mut W, msg: &proto::Msg) -> Result<(), SinkError>
where
    W: AsyncWrite + Unpin,
{
    let payload = msg.encode_to_vec();
    let len = u32::try_from(payload.len())
        .map_err(|_| SinkError::Rejected(format!("message of {} bytes", payload.len())))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed message.
pub async fn read_msg<R>(reader: &mut R) -> Result<proto::Msg, SinkError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_MESSAGE_LEN {
        return Err(SinkError::Rejected(format!(
            "response of {len} bytes exceeds {MAX_MESSAGE_LEN}"
        )));
    }
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf).await?;
    Ok(proto::Msg::decode(buf.as_slice())?)
}

#[derive(Debug)]
pub struct RiemannClient {
    address: String,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl RiemannClient {
    /// Dials `address`; `timeout` bounds the dial and every later round trip.
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self, SinkError> {
        let stream = dial(address, timeout).await?;
        Ok(RiemannClient {
            address: address.to_string(),
            timeout,
            stream: Some(stream),
        })
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

async fn dial(address: &str, timeout: Duration) -> Result<TcpStream, SinkError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
        .await
        .map_err(|_| SinkError::Timeout(timeout))??;
    stream.set_nodelay(true)?;
    debug!("connected to riemann at {address}");
    Ok(stream)
}

async fn round_trip(stream: &mut TcpStream, msg: &proto::Msg) -> Result<proto::Msg, SinkError> {
    write_msg(stream, msg).await?;
    read_msg(stream).await
}

#[async_trait]
impl MetricSink for RiemannClient {
    async fn send(&mut self, event: &SinkEvent) -> Result<(), SinkError> {
        let timeout = self.timeout;
        let stream = self.stream.as_mut().ok_or(SinkError::NotConnected)?;
        let msg = proto::Msg {
            events: vec![proto::Event::from(event)],
            ..Default::default()
        };

        let response = match tokio::time::timeout(timeout, round_trip(stream, &msg)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.stream = None;
                return Err(e);
            }
            Err(_) => {
                // The reply may still arrive later and would be read as the answer to
                // the next message.
                self.stream = None;
                return Err(SinkError::Timeout(timeout));
            }
        };

        if response.ok == Some(true) {
            Ok(())
        } else {
            Err(SinkError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "no acknowledgement".to_string()),
            ))
        }
    }

    async fn reconnect(&mut self) -> Result<(), SinkError> {
        self.stream = None;
        self.stream = Some(dial(&self.address, self.timeout).await?);
        Ok(())
    }
}
