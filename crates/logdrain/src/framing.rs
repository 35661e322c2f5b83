// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reader for Logplex's octet-counted syslog frames.
//!
//! A drain batch is a sequence of `<octet-count> SP <syslog line>` frames, where the line
//! is `<PRI>VERSION TIMESTAMP HOSTNAME APP-NAME PROCID MSGID MSG`.

use crate::errors::FrameError;

/// Syslog envelope of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub prival_version: &'a str,
    pub time: &'a str,
    pub hostname: &'a str,
    pub name: &'a str,
    pub procid: &'a str,
    pub msgid: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFrame<'a> {
    pub header: Header<'a>,
    pub body: &'a [u8],
}

/// Iterates over the frames of a batch. After an unrecoverable error the reader yields
/// the error once and then stops.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> FrameReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        FrameReader {
            buf,
            pos: 0,
            done: false,
        }
    }

    fn next_frame(&mut self) -> Result<&'a [u8], FrameError> {
        let rest = &self.buf[self.pos..];
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || rest.get(digits) != Some(&b' ') {
            let shown = rest.iter().take(16).copied().collect::<Vec<u8>>();
            return Err(FrameError::InvalidLength(
                String::from_utf8_lossy(&shown).into_owned(),
            ));
        }

        let raw_count = String::from_utf8_lossy(&rest[..digits]);
        let count = raw_count
            .parse::<usize>()
            .map_err(|_| FrameError::InvalidLength(raw_count.to_string()))?;

        let start = digits + 1;
        let available = rest.len() - start;
        if count > available {
            return Err(FrameError::Truncated {
                expected: count,
                available,
            });
        }

        self.pos += start + count;
        Ok(&rest[start..start + count])
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<LogFrame<'a>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= self.buf.len() {
            self.done = true;
            return None;
        }

        match self.next_frame() {
            Ok(frame) => Some(parse_line(frame)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Splits one syslog line into header and body.
pub fn parse_line(line: &[u8]) -> Result<LogFrame<'_>, FrameError> {
    let mut parts = line.splitn(7, |b| *b == b' ');

    let header = Header {
        prival_version: field(&mut parts, "priority")?,
        time: field(&mut parts, "timestamp")?,
        hostname: field(&mut parts, "hostname")?,
        name: field(&mut parts, "name")?,
        procid: field(&mut parts, "procid")?,
        msgid: field(&mut parts, "msgid")?,
    };
    let body = parts.next().unwrap_or_default();
    let body = body.strip_suffix(b"\n").unwrap_or(body);

    Ok(LogFrame { header, body })
}

fn field<'a, I>(parts: &mut I, name: &str) -> Result<&'a str, FrameError>
where
    I: Iterator<Item = &'a [u8]>,
{
    let raw = parts
        .next()
        .ok_or_else(|| FrameError::MalformedHeader(format!("missing {name}")))?;
    std::str::from_utf8(raw).map_err(|_| FrameError::MalformedHeader(format!("{name} is not UTF-8")))
}

/// Encodes one syslog line as an octet-counted frame.
#[must_use]
pub fn frame(line: &str) -> String {
    format!("{} {}", line.len(), line)
}
