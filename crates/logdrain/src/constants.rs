// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Capacity of every queue in a channel group.
pub const POINT_CHANNEL_CAPACITY: usize = 100_000;
/// Virtual nodes per lane on the hash ring.
pub const HASH_RING_REPLICATION: usize = 20;
pub const DEFAULT_LANES: usize = 1;

pub const DEFAULT_PORT: u16 = 5000;
pub const MAX_REQUEST_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

pub const RECYCLE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(10);
pub const SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Time-to-live attached to every Riemann event, in seconds.
pub const EVENT_TTL_SECS: f32 = 300.0;

/// Sender name used by the platform for its own log lines.
pub const HEROKU: &str = "heroku";
/// Sender names carrying a drain token override start with this prefix.
pub const TOKEN_PREFIX: &str = "t.";
pub const ROUTER_PROCID: &str = "router";

/// Router lines carrying an H-series error code.
pub const KEY_CODE_H: &[u8] = b"code=H";
/// Dyno errors use `Error R<code> (<message>)` instead of logfmt.
pub const DYNO_ERROR_SENTINEL: &[u8] = b"Error R";
pub const DYNO_MEM_MSG_SENTINEL: &[u8] = b"sample#memory_total";
pub const DYNO_LOAD_MSG_SENTINEL: &[u8] = b"sample#load_avg_1m";

/// Layout of the syslog timestamp emitted by Logplex. The microsecond fraction is required.
pub const LOGPLEX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%6f+00:00";

pub const DRAIN_TOKEN_HEADER: &str = "Logplex-Drain-Token";
pub const APP_NAME: &str = "logdrain";
