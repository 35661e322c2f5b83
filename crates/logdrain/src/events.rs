// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Typed events produced by the classifier.
//!
//! Every event carries the line's timestamp in microseconds since the epoch and the drain
//! token it arrived under.

use crate::constants::DYNO_ERROR_SENTINEL;
use crate::errors::{ClassifyError, DecodeError};
use crate::logfmt::Pairs;

/// A standard router access line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterMsg {
    pub timestamp: i64,
    pub source_drain: String,

    pub method: String,
    pub path: String,
    pub host: String,
    pub request_id: String,
    pub fwd: String,
    pub dyno: String,
    pub connect: i64,
    pub service: i64,
    pub status: i64,
    pub bytes: i64,
}

/// A router line carrying an H-series error code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterError {
    pub timestamp: i64,
    pub source_drain: String,

    pub at: String,
    pub code: String,
    pub desc: String,
    pub method: String,
    pub host: String,
    pub fwd: String,
    pub dyno: String,
    pub path: String,
    pub request_id: String,
    pub connect: i64,
    pub service: i64,
    pub status: i64,
    pub bytes: i64,
    pub sock: String,
}

/// `Error R14 (Memory quota exceeded)` style runtime errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynoError {
    pub timestamp: i64,
    pub source_drain: String,

    pub dyno: String,
    pub code: u16,
    pub message: String,
}

/// log-runtime-metrics memory sample. Sizes are in megabytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynoMemMsg {
    pub timestamp: i64,
    pub source_drain: String,

    pub source: String,
    pub dyno: String,
    pub memory_total: f64,
    pub memory_rss: f64,
    pub memory_cache: f64,
    pub memory_swap: f64,
    pub memory_pgpgin: i64,
    pub memory_pgpgout: i64,
}

/// log-runtime-metrics load sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynoLoadMsg {
    pub timestamp: i64,
    pub source_drain: String,

    pub source: String,
    pub dyno: String,
    pub load_avg_1m: f64,
    pub load_avg_5m: f64,
    pub load_avg_15m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RouterMsg(RouterMsg),
    RouterError(RouterError),
    DynoError(DynoError),
    DynoMemMsg(DynoMemMsg),
    DynoLoadMsg(DynoLoadMsg),
}

/// One queue per kind in every channel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    DynoErrors,
    DynoMemMsgs,
    DynoLoadMsgs,
    RouterMsgs,
    RouterErrors,
}

impl EventKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DynoErrors => "DynoErrors",
            EventKind::DynoMemMsgs => "DynoMemMsgs",
            EventKind::DynoLoadMsgs => "DynoLoadMsgs",
            EventKind::RouterMsgs => "RouterMsgs",
            EventKind::RouterErrors => "RouterErrors",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::RouterMsg(_) => EventKind::RouterMsgs,
            Event::RouterError(_) => EventKind::RouterErrors,
            Event::DynoError(_) => EventKind::DynoErrors,
            Event::DynoMemMsg(_) => EventKind::DynoMemMsgs,
            Event::DynoLoadMsg(_) => EventKind::DynoLoadMsgs,
        }
    }

    #[must_use]
    pub fn source_drain(&self) -> &str {
        match self {
            Event::RouterMsg(e) => &e.source_drain,
            Event::RouterError(e) => &e.source_drain,
            Event::DynoError(e) => &e.source_drain,
            Event::DynoMemMsg(e) => &e.source_drain,
            Event::DynoLoadMsg(e) => &e.source_drain,
        }
    }
}

impl RouterMsg {
    pub fn decode(pairs: &Pairs<'_>, timestamp: i64, source_drain: &str) -> Result<Self, DecodeError> {
        Ok(RouterMsg {
            timestamp,
            source_drain: source_drain.to_string(),
            method: pairs.string("method"),
            path: pairs.string("path"),
            host: pairs.string("host"),
            request_id: pairs.string("request_id"),
            fwd: pairs.string("fwd"),
            dyno: pairs.string("dyno"),
            connect: pairs.int("connect")?,
            service: pairs.int("service")?,
            status: pairs.int("status")?,
            bytes: pairs.int("bytes")?,
        })
    }
}

impl RouterError {
    pub fn decode(pairs: &Pairs<'_>, timestamp: i64, source_drain: &str) -> Result<Self, DecodeError> {
        Ok(RouterError {
            timestamp,
            source_drain: source_drain.to_string(),
            at: pairs.string("at"),
            code: pairs.string("code"),
            desc: pairs.string("desc"),
            method: pairs.string("method"),
            host: pairs.string("host"),
            fwd: pairs.string("fwd"),
            dyno: pairs.string("dyno"),
            path: pairs.string("path"),
            request_id: pairs.string("request_id"),
            connect: pairs.int("connect")?,
            service: pairs.int("service")?,
            status: pairs.int("status")?,
            bytes: pairs.int("bytes")?,
            sock: pairs.string("sock"),
        })
    }
}

impl DynoMemMsg {
    pub fn decode(pairs: &Pairs<'_>, timestamp: i64, source_drain: &str) -> Result<Self, DecodeError> {
        Ok(DynoMemMsg {
            timestamp,
            source_drain: source_drain.to_string(),
            source: pairs.string("source"),
            dyno: pairs.string("dyno"),
            memory_total: pairs.float("sample#memory_total")?,
            memory_rss: pairs.float("sample#memory_rss")?,
            memory_cache: pairs.float("sample#memory_cache")?,
            memory_swap: pairs.float("sample#memory_swap")?,
            memory_pgpgin: pairs.int("sample#memory_pgpgin")?,
            memory_pgpgout: pairs.int("sample#memory_pgpgout")?,
        })
    }
}

impl DynoLoadMsg {
    pub fn decode(pairs: &Pairs<'_>, timestamp: i64, source_drain: &str) -> Result<Self, DecodeError> {
        Ok(DynoLoadMsg {
            timestamp,
            source_drain: source_drain.to_string(),
            source: pairs.string("source"),
            dyno: pairs.string("dyno"),
            load_avg_1m: pairs.float("sample#load_avg_1m")?,
            load_avg_5m: pairs.float("sample#load_avg_5m")?,
            load_avg_15m: pairs.float("sample#load_avg_15m")?,
        })
    }
}

impl DynoError {
    /// Parses `Error R<code> (<message>)`. Anything after the closing parenthesis is
    /// ignored; a message without parentheses is taken verbatim.
    pub fn parse(body: &[u8], timestamp: i64, source_drain: &str, dyno: &str) -> Result<Self, ClassifyError> {
        let malformed = || ClassifyError::DynoError(String::from_utf8_lossy(body).into_owned());
        let rest = body.strip_prefix(DYNO_ERROR_SENTINEL).ok_or_else(malformed)?;
        let rest = String::from_utf8_lossy(rest);

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let code = rest[..digits].parse::<u16>().map_err(|_| malformed())?;

        let tail = rest[digits..].trim();
        let message = match tail.strip_prefix('(') {
            Some(inner) => inner.split(')').next().unwrap_or_default(),
            None => tail,
        };

        Ok(DynoError {
            timestamp,
            source_drain: source_drain.to_string(),
            dyno: dyno.to_string(),
            code,
            message: message.to_string(),
        })
    }
}

/// Dynos are reported as `<type>.<n>`; returns `<type>`.
#[must_use]
pub fn dyno_type(dyno: &str) -> &str {
    dyno.split('.').next().unwrap_or(dyno)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logfmt;

    #[test]
    fn test_decode_router_msg() {
        let pairs = logfmt::parse(
            "at=info method=POST path=/login host=app.example.com request_id=abc fwd=1.2.3.4 dyno=web.2 connect=2ms service=40ms status=302 bytes=15",
        )
        .unwrap();
        let msg = RouterMsg::decode(&pairs, 42, "t.abc").unwrap();
        assert_eq!(msg.method, "POST");
        assert_eq!(msg.dyno, "web.2");
        assert_eq!(msg.connect, 2);
        assert_eq!(msg.service, 40);
        assert_eq!(msg.status, 302);
        assert_eq!(msg.timestamp, 42);
        assert_eq!(msg.source_drain, "t.abc");
    }

    #[test]
    fn test_decode_router_error_rejects_bad_numbers() {
        let pairs = logfmt::parse("at=error code=H12 status=five").unwrap();
        assert!(RouterError::decode(&pairs, 0, "t.abc").is_err());
    }

    #[test]
    fn test_parse_dyno_error() {
        let err = DynoError::parse(b"Error R14 (Memory quota exceeded)", 7, "t.abc", "web.1").unwrap();
        assert_eq!(err.code, 14);
        assert_eq!(err.message, "Memory quota exceeded");
        assert_eq!(err.dyno, "web.1");

        let err = DynoError::parse(b"Error R10 (Boot timeout) -> Web process failed", 7, "t.abc", "web.1")
            .unwrap();
        assert_eq!(err.code, 10);
        assert_eq!(err.message, "Boot timeout");
    }

    #[test]
    fn test_parse_dyno_error_without_code() {
        assert!(DynoError::parse(b"Error R (nothing)", 0, "t.abc", "web.1").is_err());
        assert!(DynoError::parse(b"Warning R14", 0, "t.abc", "web.1").is_err());
    }

    #[test]
    fn test_dyno_type() {
        assert_eq!(dyno_type("web.1"), "web");
        assert_eq!(dyno_type("worker"), "worker");
        assert_eq!(dyno_type(""), "");
    }

    #[test]
    fn test_event_kind() {
        let event = Event::DynoLoadMsg(DynoLoadMsg::default());
        assert_eq!(event.kind(), EventKind::DynoLoadMsgs);
        assert_eq!(EventKind::RouterErrors.to_string(), "RouterErrors");
    }
}
