// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The routing table shared by every request: all channel groups, placed on a hash ring.
//! Built once at startup and never modified afterwards.

use crate::chan_group::{ChannelGroup, ChannelGroupReceiver};
use crate::hash_ring::{HashFn, HashRing};

#[derive(Debug)]
pub struct Lanes {
    ring: HashRing<ChannelGroup>,
}

impl Lanes {
    /// Creates `count` lanes named `<prefix>.<i>`, each with queues of `capacity`. The
    /// receivers are returned in lane order, one per forwarder.
    #[must_use]
    pub fn new(
        prefix: &str,
        count: usize,
        capacity: usize,
        replicas: usize,
        hash: Option<HashFn>,
    ) -> (Lanes, Vec<ChannelGroupReceiver>) {
        let mut groups = Vec::with_capacity(count);
        let mut receivers = Vec::with_capacity(count);
        for i in 0..count {
            let (group, receiver) = ChannelGroup::new(&format!("{prefix}.{i}"), capacity);
            groups.push(group);
            receivers.push(receiver);
        }

        let mut ring = HashRing::new(replicas, hash);
        ring.add(groups);
        (Lanes { ring }, receivers)
    }

    /// Lane responsible for `source_drain`. `None` only when there are no lanes.
    #[must_use]
    pub fn get(&self, source_drain: &str) -> Option<&ChannelGroup> {
        self.ring.get(source_drain)
    }

    #[must_use]
    pub fn groups(&self) -> &[ChannelGroup] {
        self.ring.lanes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups().is_empty()
    }
}
