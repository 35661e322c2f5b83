// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-request and per-interval measurements, emitted as a single l2met log line:
//!
//! ```text
//! app=logdrain source=t.abc123 count#batch=1 count#lines.total=3 measure#lines.parse.time=0.412ms
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::constants::APP_NAME;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Context {
    tags: Vec<(String, String)>,
    counts: BTreeMap<String, i64>,
    samples: BTreeMap<String, String>,
    measures: BTreeMap<String, Duration>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Context::default()
    }

    /// Adds a plain `key=value` pair.
    pub fn add(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    /// Increments counter `name` by `n`.
    pub fn count(&mut self, name: &str, n: i64) -> &mut Self {
        *self.counts.entry(name.to_string()).or_default() += n;
        self
    }

    /// Records the latest value of `name`.
    pub fn sample(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.samples.insert(name.to_string(), value.to_string());
        self
    }

    pub fn measure(&mut self, name: &str, elapsed: Duration) -> &mut Self {
        *self.measures.entry(name.to_string()).or_default() += elapsed;
        self
    }

    pub fn measure_since(&mut self, name: &str, start: Instant) -> &mut Self {
        self.measure(name, start.elapsed())
    }

    #[must_use]
    pub fn get_count(&self, name: &str) -> i64 {
        self.counts.get(name).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.samples.is_empty() && self.measures.is_empty()
    }

    pub fn log(&self) {
        info!("{self}");
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app={APP_NAME}")?;
        for (key, value) in &self.tags {
            write!(f, " {key}={value}")?;
        }
        for (name, n) in &self.counts {
            write!(f, " count#{name}={n}")?;
        }
        for (name, value) in &self.samples {
            write!(f, " sample#{name}={value}")?;
        }
        for (name, elapsed) in &self.measures {
            write!(f, " measure#{name}={:.3}ms", elapsed.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate() {
        let mut ctx = Context::new();
        ctx.count("lines.total", 1).count("lines.total", 2);
        assert_eq!(ctx.get_count("lines.total"), 3);
        assert_eq!(ctx.get_count("batch"), 0);
    }

    #[test]
    fn test_renders_l2met_line() {
        let mut ctx = Context::new();
        ctx.add("source", "riemann.0")
            .count("lines.total", 3)
            .count("batch", 1)
            .sample("points.RouterMsgs.pending", 7)
            .measure("lines.parse.time", Duration::from_micros(1500));
        assert_eq!(
            ctx.to_string(),
            "app=logdrain source=riemann.0 count#batch=1 count#lines.total=3 \
             sample#points.RouterMsgs.pending=7 measure#lines.parse.time=1.500ms"
        );
    }

    #[test]
    fn test_empty() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());
        ctx.add("source", "x");
        assert!(ctx.is_empty());
        ctx.count("batch", 1);
        assert!(!ctx.is_empty());
        assert_eq!(Context::new().to_string(), "app=logdrain");
    }
}
