// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-lane consumer turning typed events into metric events.
//!
//! A forwarder drains the five queues of one channel group and delivers every resulting
//! event to its own sink. Delivery failures never stop the loop: the event is dropped,
//! one reconnect is attempted and the next event proceeds either way.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::byte_size::ByteSize;
use crate::chan_group::ChannelGroupReceiver;
use crate::constants::EVENT_TTL_SECS;
use crate::events::{dyno_type, DynoError, DynoLoadMsg, DynoMemMsg, Event, RouterError, RouterMsg};
use crate::metrics::Context;
use crate::sink::{Metric, MetricSink, SinkEvent};

const MICROS_PER_SEC: i64 = 1_000_000;
/// log-runtime-metrics reports sizes in megabytes.
const BYTES_PER_MB: f64 = 1e6;

#[derive(Debug, Default)]
pub struct ForwarderStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl ForwarderStats {
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub struct Forwarder<S> {
    prefix: String,
    receiver: ChannelGroupReceiver,
    sink: S,
    stats: Arc<ForwarderStats>,
}

impl<S: MetricSink> Forwarder<S> {
    /// `prefix` is prepended to every event host.
    pub fn new(receiver: ChannelGroupReceiver, sink: S, prefix: &str) -> Self {
        Forwarder {
            prefix: prefix.to_string(),
            receiver,
            sink,
            stats: Arc::new(ForwarderStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ForwarderStats> {
        Arc::clone(&self.stats)
    }

    /// Runs until every queue of the lane is closed and drained, then hands back the sink.
    pub async fn run(mut self) -> S {
        while let Some(event) = self.receiver.recv().await {
            for sink_event in build_events(&event, &self.prefix) {
                self.deliver(&sink_event).await;
            }
        }
        info!(
            "channel group {} closed, forwarder stopping after {} delivered and {} dropped events",
            self.receiver.name(),
            self.stats.delivered(),
            self.stats.dropped()
        );
        self.sink
    }

    async fn deliver(&mut self, event: &SinkEvent) {
        let start = Instant::now();
        debug!("sending {event:?}");

        match self.sink.send(event).await {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("delivery error, trying to reconnect: {e}");
                match self.sink.reconnect().await {
                    Ok(()) => info!("reconnected!"),
                    Err(e) => error!("reconnection failed: {e}"),
                }
            }
        }

        let mut ctx = Context::new();
        ctx.add("source", self.receiver.name())
            .measure_since("riemann_poster.time", start);
        debug!("{ctx}");
    }
}

/// The running forwarders of every lane. None of them is expected to stop while the drain
/// is serving, since that would leave its lane without a consumer.
#[derive(Default)]
pub struct ForwarderSet {
    tasks: JoinSet<String>,
}

impl ForwarderSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<S: MetricSink + 'static>(&mut self, forwarder: Forwarder<S>) {
        let lane = forwarder.receiver.name().to_string();
        debug!("starting forwarder for {lane}");
        self.tasks.spawn(async move {
            forwarder.run().await;
            lane
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for the first forwarder to stop and describes why. Pends forever when the set
    /// is empty.
    pub async fn stopped(&mut self) -> String {
        let reason = match self.tasks.join_next().await {
            Some(Ok(lane)) => format!("forwarder for {lane} stopped"),
            Some(Err(e)) if e.is_panic() => format!("forwarder panicked: {e}"),
            Some(Err(e)) => format!("forwarder task failed: {e}"),
            None => std::future::pending().await,
        };
        error!("{reason}");
        reason
    }
}

/// Builds the metric events for one typed event. Memory samples fan out to three events;
/// everything else maps to exactly one.
#[must_use]
pub fn build_events(event: &Event, prefix: &str) -> Vec<SinkEvent> {
    match event {
        Event::RouterMsg(msg) => vec![router_msg(msg, prefix)],
        Event::RouterError(err) => vec![router_error(err, prefix)],
        Event::DynoError(err) => vec![dyno_error(err, prefix)],
        Event::DynoMemMsg(msg) => dyno_mem(msg, prefix),
        Event::DynoLoadMsg(msg) => vec![dyno_load(msg, prefix)],
    }
}

fn base(host: String, service: String, timestamp: i64) -> SinkEvent {
    SinkEvent {
        host,
        service,
        state: None,
        metric: None,
        ttl: EVENT_TTL_SECS,
        time: timestamp / MICROS_PER_SEC,
        description: String::new(),
        attributes: BTreeMap::new(),
    }
}

fn attributes<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn router_msg(msg: &RouterMsg, prefix: &str) -> SinkEvent {
    SinkEvent {
        metric: Some(Metric::Int(msg.connect + msg.service)),
        description: format!(
            "{} {} in {}ms by {}\n\nHost: {}\nRequest: {}",
            msg.method, msg.path, msg.service, msg.dyno, msg.host, msg.request_id
        ),
        attributes: attributes([
            ("method", msg.method.clone()),
            ("path", msg.path.clone()),
            ("status", msg.status.to_string()),
            ("request_host", msg.host.clone()),
            ("request_id", msg.request_id.clone()),
            ("fwd", msg.fwd.clone()),
            ("dyno", msg.dyno.clone()),
            ("bytes", msg.bytes.to_string()),
            ("logplex_source_id", msg.source_drain.clone()),
        ]),
        ..base(
            format!("{prefix}router"),
            format!("{} heroku latency", msg.host),
            msg.timestamp,
        )
    }
}

fn router_error(err: &RouterError, prefix: &str) -> SinkEvent {
    SinkEvent {
        state: Some("error".to_string()),
        description: format!(
            "Error {} ({}) at {} for {}",
            err.code, err.desc, err.at, err.host
        ),
        attributes: attributes([
            ("at", err.at.clone()),
            ("method", err.method.clone()),
            ("path", err.path.clone()),
            ("status", err.status.to_string()),
            ("host", err.host.clone()),
            ("request_id", err.request_id.clone()),
            ("fwd", err.fwd.clone()),
            ("dyno", err.dyno.clone()),
            ("bytes", err.bytes.to_string()),
            ("logplex_source_id", err.source_drain.clone()),
        ]),
        ..base(
            format!("{prefix}router"),
            "heroku_request_error".to_string(),
            err.timestamp,
        )
    }
}

fn dyno_error(err: &DynoError, prefix: &str) -> SinkEvent {
    SinkEvent {
        state: Some("error".to_string()),
        metric: Some(Metric::Int(i64::from(err.code))),
        description: format!("Error R{} ({}) on {}", err.code, err.message, err.dyno),
        attributes: attributes([
            ("dyno", err.dyno.clone()),
            ("dyno_type", dyno_type(&err.dyno).to_string()),
            ("logplex_source_id", err.source_drain.clone()),
        ]),
        ..base(
            format!("{prefix}{}", err.dyno),
            "heroku_dyno_error".to_string(),
            err.timestamp,
        )
    }
}

fn dyno_mem(msg: &DynoMemMsg, prefix: &str) -> Vec<SinkEvent> {
    let host = format!("{prefix}{}", msg.source);
    let attrs = attributes([
        ("logplex_source_id", msg.source_drain.clone()),
        ("dyno", msg.dyno.clone()),
    ]);

    let total = msg.memory_total * BYTES_PER_MB;
    let swap = msg.memory_swap * BYTES_PER_MB;

    vec![
        SinkEvent {
            metric: Some(Metric::Float(total)),
            description: format!(
                "{} used ({} RSS, {} swap, {} cached)",
                ByteSize(total),
                ByteSize(msg.memory_rss * BYTES_PER_MB),
                ByteSize(swap),
                ByteSize(msg.memory_cache * BYTES_PER_MB),
            ),
            attributes: attrs.clone(),
            ..base(host.clone(), "memory".to_string(), msg.timestamp)
        },
        SinkEvent {
            metric: Some(Metric::Float(swap)),
            description: format!("{} of swap used", ByteSize(swap)),
            attributes: attrs.clone(),
            ..base(host.clone(), "memory_swap".to_string(), msg.timestamp)
        },
        SinkEvent {
            metric: Some(Metric::Int(msg.memory_pgpgin + msg.memory_pgpgout)),
            description: format!(
                "{} page ins, {} page outs",
                msg.memory_pgpgin, msg.memory_pgpgout
            ),
            attributes: attrs,
            ..base(host, "memory_swap_pagecount".to_string(), msg.timestamp)
        },
    ]
}

fn dyno_load(msg: &DynoLoadMsg, prefix: &str) -> SinkEvent {
    SinkEvent {
        metric: Some(Metric::Float(msg.load_avg_1m)),
        description: format!(
            "load {:.2} {:.2} {:.2}",
            msg.load_avg_1m, msg.load_avg_5m, msg.load_avg_15m
        ),
        attributes: attributes([
            ("logplex_source_id", msg.source_drain.clone()),
            ("dyno", msg.dyno.clone()),
        ]),
        ..base(
            format!("{prefix}{}", msg.source),
            "load".to_string(),
            msg.timestamp,
        )
    }
}
