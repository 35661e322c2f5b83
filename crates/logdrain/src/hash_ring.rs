// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Consistent hashing of drain tokens onto lanes.
//!
//! Every lane owns `replicas` virtual nodes on a ring of `u32` hashes. A key belongs to the
//! first virtual node clockwise from its own hash, so the same token always lands on the
//! same lane for a given set of lanes.

/// Hash function used both for virtual nodes and for lookup keys.
pub type HashFn = fn(&[u8]) -> u32;

/// Anything placed on the ring must expose a stable name to derive its virtual nodes from.
pub trait Lane {
    fn name(&self) -> &str;
}

/// Default ring hash: CRC-32 (IEEE).
#[must_use]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[derive(Debug)]
pub struct HashRing<L> {
    hash: HashFn,
    replicas: usize,
    /// Virtual nodes as (hash, index into `lanes`), sorted by hash.
    nodes: Vec<(u32, usize)>,
    lanes: Vec<L>,
}

impl<L: Lane> HashRing<L> {
    /// Creates an empty ring. `hash` defaults to [`crc32`] when `None`. Every lane gets
    /// at least one virtual node, so a `replicas` of 0 is treated as 1.
    #[must_use]
    pub fn new(replicas: usize, hash: Option<HashFn>) -> Self {
        HashRing {
            hash: hash.unwrap_or(crc32),
            replicas: replicas.max(1),
            nodes: Vec::new(),
            lanes: Vec::new(),
        }
    }

    /// Returns true if no lane has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of virtual nodes on the ring.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn lanes(&self) -> &[L] {
        &self.lanes
    }

    /// Adds lanes to the ring, `replicas` virtual nodes each.
    pub fn add<I>(&mut self, lanes: I)
    where
        I: IntoIterator<Item = L>,
    {
        for lane in lanes {
            let index = self.lanes.len();
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{i}{}", lane.name()).as_bytes());
                self.nodes.push((hash, index));
            }
            self.lanes.push(lane);
        }
        self.nodes.sort_by_key(|(hash, _)| *hash);
    }

    /// Gets the lane owning the closest virtual node at or after the key's hash.
    pub fn get(&self, key: &str) -> Option<&L> {
        if self.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let position = self.nodes.partition_point(|(node, _)| *node < hash);

        // Past the last virtual node means we cycled back to the first one.
        let (_, index) = self.nodes.get(position).unwrap_or(&self.nodes[0]);
        self.lanes.get(*index)
    }
}
