// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoder for `key=value` encoded log bodies.
//!
//! Supports bare values (`status=200`), quoted values with backslash escapes
//! (`desc="Request timeout"`) and bare keys (`flag`, decoded as an empty value). Numeric
//! accessors accept unit suffixes such as `23ms`, `512.3MB` or `100pages`, keeping the
//! leading number.

use std::borrow::Cow;

use crate::errors::DecodeError;

#[derive(Debug, Default)]
pub struct Pairs<'a> {
    pairs: Vec<(&'a str, Cow<'a, str>)>,
}

/// Splits a logfmt line into key/value pairs, in order of appearance.
pub fn parse(line: &str) -> Result<Pairs<'_>, DecodeError> {
    let mut pairs = Vec::new();
    let bytes = line.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let key_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let key = &line[key_start..pos];

        if pos >= bytes.len() || bytes[pos] != b'=' {
            if !key.is_empty() {
                pairs.push((key, Cow::Borrowed("")));
            }
            continue;
        }
        pos += 1; // '='

        let value = if pos < bytes.len() && bytes[pos] == b'"' {
            let (value, next) = quoted(line, pos + 1)
                .ok_or_else(|| DecodeError::UnterminatedQuote(key.to_string()))?;
            pos = next;
            value
        } else {
            let value_start = pos;
            while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            Cow::Borrowed(&line[value_start..pos])
        };

        // A stray `=value` has no key to attach to.
        if !key.is_empty() {
            pairs.push((key, value));
        }
    }

    Ok(Pairs { pairs })
}

/// Reads a quoted value starting right after the opening quote. Returns the unescaped
/// value and the position after the closing quote.
fn quoted(line: &str, start: usize) -> Option<(Cow<'_, str>, usize)> {
    let bytes = line.as_bytes();
    let mut pos = start;
    let mut owned: Option<String> = None;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => {
                let value = match owned {
                    Some(s) => Cow::Owned(s),
                    None => Cow::Borrowed(&line[start..pos]),
                };
                return Some((value, pos + 1));
            }
            b'\\' if pos + 1 < bytes.len() => {
                let escaped = line[pos + 1..].chars().next()?;
                let buf = owned.get_or_insert_with(|| line[start..pos].to_string());
                buf.push(escaped);
                pos += 1 + escaped.len_utf8();
            }
            _ => {
                let ch = line[pos..].chars().next()?;
                if let Some(buf) = owned.as_mut() {
                    buf.push(ch);
                }
                pos += ch.len_utf8();
            }
        }
    }
    None
}

impl<'a> Pairs<'a> {
    /// Value of the last occurrence of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// String value, empty when missing.
    pub fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Integer value, 0 when missing or empty.
    pub fn int(&self, key: &str) -> Result<i64, DecodeError> {
        match self.get(key) {
            None | Some("") => Ok(0),
            Some(raw) => numeric_prefix(raw)
                .and_then(|n| n.parse::<i64>().ok())
                .ok_or_else(|| invalid(key, raw)),
        }
    }

    /// Float value, 0.0 when missing or empty.
    pub fn float(&self, key: &str) -> Result<f64, DecodeError> {
        match self.get(key) {
            None | Some("") => Ok(0.0),
            Some(raw) => numeric_prefix(raw)
                .and_then(|n| n.parse::<f64>().ok())
                .ok_or_else(|| invalid(key, raw)),
        }
    }
}

fn invalid(key: &str, value: &str) -> DecodeError {
    DecodeError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Leading `[+-]?digits[.digits]` of a value, without any unit suffix.
fn numeric_prefix(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        if frac > end + 1 {
            end = frac;
        }
    }
    if end == digits_start {
        return None;
    }
    Some(&raw[..end])
}
