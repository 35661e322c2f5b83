// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic signal asking one drain request to close its connection, so long-lived
//! keep-alive connections get rebalanced across instances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ConnectionRecycler {
    pending: AtomicBool,
}

impl ConnectionRecycler {
    /// Starts a task raising the signal every `period` until `cancel` fires.
    #[must_use]
    pub fn spawn(period: Duration, cancel: CancellationToken) -> Arc<Self> {
        let recycler = Arc::new(ConnectionRecycler::default());
        let ticker = Arc::clone(&recycler);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick is immediate
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("connection recycler stopped");
                        break;
                    }
                    _ = interval.tick() => ticker.signal(),
                }
            }
        });
        recycler
    }

    /// Raises the signal. Raising it again before it is taken has no effect.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Consumes the signal. Returns true for exactly one caller per raised signal.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_taken_once() {
        let recycler = ConnectionRecycler::default();
        assert!(!recycler.take());
        recycler.signal();
        recycler.signal();
        assert!(recycler.take());
        assert!(!recycler.take());
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_raised_every_period() {
        let cancel = CancellationToken::new();
        let recycler = ConnectionRecycler::spawn(Duration::from_secs(300), cancel.clone());

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(!recycler.take());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(recycler.take());
        assert!(!recycler.take());

        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(!recycler.take());
    }
}
