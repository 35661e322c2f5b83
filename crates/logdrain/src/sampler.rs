// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic logging of queue backlogs, one l2met line per lane.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::lanes::Lanes;
use crate::metrics::Context;

/// Pending counts of every queue of every lane, one context per lane.
#[must_use]
pub fn sample_lanes(lanes: &Lanes) -> Vec<Context> {
    lanes
        .groups()
        .iter()
        .map(|group| {
            let mut ctx = Context::new();
            ctx.add("source", group.name());
            for (kind, depth) in group.sample().iter() {
                ctx.sample(&format!("points.{kind}.pending"), depth);
            }
            ctx
        })
        .collect()
}

/// Logs [`sample_lanes`] every `period` until `cancel` fires.
pub async fn run_sampler(lanes: Arc<Lanes>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // first tick is immediate
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("queue depth sampler stopped");
                return;
            }
            _ = interval.tick() => {
                for ctx in sample_lanes(&lanes) {
                    ctx.log();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, RouterMsg};
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_sample_lanes() {
        let (lanes, _receivers) = Lanes::new("riemann", 2, 10, 20, None);
        lanes.groups()[1]
            .enqueue(Event::RouterMsg(RouterMsg::default()))
            .await
            .unwrap();

        let samples: Vec<String> = sample_lanes(&lanes).iter().map(ToString::to_string).collect();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].starts_with("app=logdrain source=riemann.0 "));
        assert!(samples[0].contains("sample#points.RouterMsgs.pending=0"));
        assert!(samples[1].contains("sample#points.RouterMsgs.pending=1"));
        assert!(samples[1].contains("sample#points.DynoErrors.pending=0"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_run_sampler_logs_every_period() {
        let (lanes, _receivers) = Lanes::new("riemann", 1, 10, 20, None);
        let sampler = run_sampler(
            Arc::new(lanes),
            Duration::from_secs(10),
            CancellationToken::new(),
        );

        assert!(tokio::time::timeout(Duration::from_secs(11), sampler)
            .await
            .is_err());
        assert!(logs_contain("source=riemann.0"));
        assert!(logs_contain("sample#points.DynoMemMsgs.pending=0"));
    }

    #[tokio::test]
    async fn test_run_sampler_stops_on_cancel() {
        let (lanes, _receivers) = Lanes::new("riemann", 1, 10, 20, None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(
            Duration::from_secs(1),
            run_sampler(Arc::new(lanes), Duration::from_secs(10), cancel),
        )
        .await
        .unwrap();
    }
}
