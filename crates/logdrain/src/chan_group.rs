// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One processing lane: five bounded queues, one per event kind.
//!
//! The sending half is shared by every ingress request and applies backpressure: a full
//! queue suspends the producer until the forwarder makes room. The receiving half is
//! owned by the lane's forwarder.

use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::errors::EnqueueError;
use crate::events::{DynoError, DynoLoadMsg, DynoMemMsg, Event, EventKind, RouterError, RouterMsg};
use crate::hash_ring::Lane;

#[derive(Debug, Clone)]
pub struct ChannelGroup {
    name: String,
    dyno_errors: Sender<DynoError>,
    dyno_mem_msgs: Sender<DynoMemMsg>,
    dyno_load_msgs: Sender<DynoLoadMsg>,
    router_msgs: Sender<RouterMsg>,
    router_errors: Sender<RouterError>,
}

#[derive(Debug)]
pub struct ChannelGroupReceiver {
    name: String,
    dyno_errors: Receiver<DynoError>,
    dyno_mem_msgs: Receiver<DynoMemMsg>,
    dyno_load_msgs: Receiver<DynoLoadMsg>,
    router_msgs: Receiver<RouterMsg>,
    router_errors: Receiver<RouterError>,
}

/// Pending events per queue at the time of sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDepths([(EventKind, usize); 5]);

impl QueueDepths {
    #[must_use]
    pub fn get(&self, kind: EventKind) -> usize {
        self.0
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, depth)| *depth)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventKind, usize)> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, depth)| depth).sum()
    }
}

impl ChannelGroup {
    /// Creates a lane whose five queues each hold at most `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0, like [`tokio::sync::mpsc::channel`].
    #[must_use]
    pub fn new(name: &str, capacity: usize) -> (ChannelGroup, ChannelGroupReceiver) {
        let (dyno_errors_tx, dyno_errors_rx) = mpsc::channel(capacity);
        let (dyno_mem_msgs_tx, dyno_mem_msgs_rx) = mpsc::channel(capacity);
        let (dyno_load_msgs_tx, dyno_load_msgs_rx) = mpsc::channel(capacity);
        let (router_msgs_tx, router_msgs_rx) = mpsc::channel(capacity);
        let (router_errors_tx, router_errors_rx) = mpsc::channel(capacity);

        let group = ChannelGroup {
            name: name.to_string(),
            dyno_errors: dyno_errors_tx,
            dyno_mem_msgs: dyno_mem_msgs_tx,
            dyno_load_msgs: dyno_load_msgs_tx,
            router_msgs: router_msgs_tx,
            router_errors: router_errors_tx,
        };
        let receiver = ChannelGroupReceiver {
            name: name.to_string(),
            dyno_errors: dyno_errors_rx,
            dyno_mem_msgs: dyno_mem_msgs_rx,
            dyno_load_msgs: dyno_load_msgs_rx,
            router_msgs: router_msgs_rx,
            router_errors: router_errors_rx,
        };
        (group, receiver)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues the event on its kind's queue, waiting for room if it is full.
    pub async fn enqueue(&self, event: Event) -> Result<(), EnqueueError> {
        let sent = match event {
            Event::DynoError(e) => self.dyno_errors.send(e).await.is_ok(),
            Event::DynoMemMsg(e) => self.dyno_mem_msgs.send(e).await.is_ok(),
            Event::DynoLoadMsg(e) => self.dyno_load_msgs.send(e).await.is_ok(),
            Event::RouterMsg(e) => self.router_msgs.send(e).await.is_ok(),
            Event::RouterError(e) => self.router_errors.send(e).await.is_ok(),
        };
        if sent {
            Ok(())
        } else {
            Err(EnqueueError::Closed(self.name.clone()))
        }
    }

    /// Like [`ChannelGroup::enqueue`], but gives up after `timeout` when one is set. The
    /// event is dropped on timeout.
    pub async fn enqueue_timeout(
        &self,
        event: Event,
        timeout: Option<Duration>,
    ) -> Result<(), EnqueueError> {
        let Some(timeout) = timeout else {
            return self.enqueue(event).await;
        };
        tokio::time::timeout(timeout, self.enqueue(event))
            .await
            .map_err(|_| EnqueueError::Timeout {
                lane: self.name.clone(),
                timeout,
            })?
    }

    /// Current backlog of every queue. Never blocks.
    #[must_use]
    pub fn sample(&self) -> QueueDepths {
        fn pending<T>(tx: &Sender<T>) -> usize {
            tx.max_capacity() - tx.capacity()
        }
        QueueDepths([
            (EventKind::DynoErrors, pending(&self.dyno_errors)),
            (EventKind::DynoMemMsgs, pending(&self.dyno_mem_msgs)),
            (EventKind::DynoLoadMsgs, pending(&self.dyno_load_msgs)),
            (EventKind::RouterMsgs, pending(&self.router_msgs)),
            (EventKind::RouterErrors, pending(&self.router_errors)),
        ])
    }
}

impl Lane for ChannelGroup {
    fn name(&self) -> &str {
        &self.name
    }
}

impl ChannelGroupReceiver {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next event on any queue. Ready queues are polled in random order so
    /// no kind starves the others. Returns `None` once every queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        tokio::select! {
            Some(e) = self.dyno_errors.recv() => Some(Event::DynoError(e)),
            Some(e) = self.dyno_mem_msgs.recv() => Some(Event::DynoMemMsg(e)),
            Some(e) = self.dyno_load_msgs.recv() => Some(Event::DynoLoadMsg(e)),
            Some(e) = self.router_msgs.recv() => Some(Event::RouterMsg(e)),
            Some(e) = self.router_errors.recv() => Some(Event::RouterError(e)),
            else => None,
        }
    }
}
