// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns one framed log line into a typed event.
//!
//! Only platform-owned lines are structured: the sender name must be `heroku` or a drain
//! token override (`t.` prefix). Router lines are split into access logs and H-series
//! errors; other platform lines are dyno runtime errors or log-runtime-metrics samples.
//! Classification never fails the batch; the worst outcome is a skipped line.

use chrono::NaiveDateTime;

use crate::constants::{
    DYNO_ERROR_SENTINEL, DYNO_LOAD_MSG_SENTINEL, DYNO_MEM_MSG_SENTINEL, HEROKU, KEY_CODE_H,
    LOGPLEX_TIME_FORMAT, ROUTER_PROCID, TOKEN_PREFIX,
};
use crate::errors::ClassifyError;
use crate::events::{DynoError, DynoLoadMsg, DynoMemMsg, Event, EventKind, RouterError, RouterMsg};
use crate::framing::LogFrame;
use crate::logfmt;

#[derive(Debug, PartialEq)]
pub enum Classification {
    Event(Event),
    /// Application output, which this pipeline doesn't structure.
    UserLine,
    /// Platform line matching none of the known shapes.
    UnknownPlatformLine,
    Skipped(ClassifyError),
}

impl Classification {
    /// Name of the counter incremented for this outcome.
    #[must_use]
    pub fn counter(&self) -> &'static str {
        match self {
            Classification::Event(event) => match event.kind() {
                EventKind::RouterMsgs => "lines.router",
                EventKind::RouterErrors => "lines.router.error",
                EventKind::DynoErrors => "lines.dyno.error",
                EventKind::DynoMemMsgs => "lines.dyno.mem",
                EventKind::DynoLoadMsgs => "lines.dyno.load",
            },
            Classification::UserLine => "lines.unknown.user",
            Classification::UnknownPlatformLine => "lines.unknown.heroku",
            Classification::Skipped(ClassifyError::Timestamp(_)) => "errors.time.parse",
            Classification::Skipped(ClassifyError::Decode(_)) => "errors.logfmt.decode",
            Classification::Skipped(ClassifyError::DynoError(_)) => "errors.dyno_error.parse",
        }
    }
}

/// Whether the sender name marks a line emitted by the platform itself.
#[must_use]
pub fn is_platform(name: &str) -> bool {
    name == HEROKU || name.starts_with(TOKEN_PREFIX)
}

/// Parses the Logplex timestamp into microseconds since the epoch.
pub fn parse_timestamp(time: &str) -> Result<i64, ClassifyError> {
    NaiveDateTime::parse_from_str(time, LOGPLEX_TIME_FORMAT)
        .map(|t| t.and_utc().timestamp_micros())
        .map_err(|_| ClassifyError::Timestamp(time.to_string()))
}

/// Classifies a line received under `source_drain`.
#[must_use]
pub fn classify(frame: &LogFrame<'_>, source_drain: &str) -> Classification {
    let header = &frame.header;
    if !is_platform(header.name) {
        return Classification::UserLine;
    }

    let timestamp = match parse_timestamp(header.time) {
        Ok(ts) => ts,
        Err(e) => return Classification::Skipped(e),
    };

    match classify_platform(frame, timestamp, source_drain) {
        Ok(Some(event)) => Classification::Event(event),
        Ok(None) => Classification::UnknownPlatformLine,
        Err(e) => Classification::Skipped(e),
    }
}

fn classify_platform(
    frame: &LogFrame<'_>,
    timestamp: i64,
    source_drain: &str,
) -> Result<Option<Event>, ClassifyError> {
    let body = frame.body;

    if frame.header.procid == ROUTER_PROCID {
        let text = String::from_utf8_lossy(body);
        let pairs = logfmt::parse(&text)?;
        let event = if contains(body, KEY_CODE_H) {
            Event::RouterError(RouterError::decode(&pairs, timestamp, source_drain)?)
        } else {
            Event::RouterMsg(RouterMsg::decode(&pairs, timestamp, source_drain)?)
        };
        return Ok(Some(event));
    }

    if body.starts_with(DYNO_ERROR_SENTINEL) {
        let err = DynoError::parse(body, timestamp, source_drain, frame.header.procid)?;
        return Ok(Some(Event::DynoError(err)));
    }

    if contains(body, DYNO_MEM_MSG_SENTINEL) {
        let text = String::from_utf8_lossy(body);
        let pairs = logfmt::parse(&text)?;
        let msg = DynoMemMsg::decode(&pairs, timestamp, source_drain)?;
        return Ok(Some(Event::DynoMemMsg(msg)));
    }

    if contains(body, DYNO_LOAD_MSG_SENTINEL) {
        let text = String::from_utf8_lossy(body);
        let pairs = logfmt::parse(&text)?;
        let msg = DynoLoadMsg::decode(&pairs, timestamp, source_drain)?;
        return Ok(Some(Event::DynoLoadMsg(msg)));
    }

    Ok(None)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
