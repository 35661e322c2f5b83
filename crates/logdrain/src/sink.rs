// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::SinkError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Int(i64),
    Float(f64),
}

/// One metric event as handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEvent {
    pub host: String,
    pub service: String,
    pub state: Option<String>,
    pub metric: Option<Metric>,
    /// Seconds.
    pub ttl: f32,
    /// Unix seconds.
    pub time: i64,
    pub description: String,
    pub attributes: BTreeMap<String, String>,
}

/// Destination for forwarded events. A sink is owned by exactly one forwarder.
#[async_trait]
pub trait MetricSink: Send {
    /// Delivers one event, waiting for the sink's acknowledgement.
    async fn send(&mut self, event: &SinkEvent) -> Result<(), SinkError>;

    /// Replaces the underlying connection.
    async fn reconnect(&mut self) -> Result<(), SinkError>;
}
