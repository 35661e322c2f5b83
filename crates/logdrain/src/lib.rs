// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logplex drain ingestion and Riemann metrics forwarding.
//!
//! Batches of syslog frames arrive over HTTP, every line is classified into one of five
//! typed events, events are routed to a lane by consistent hashing of the drain token and
//! each lane's forwarder turns them into Riemann events.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod auth;
pub mod byte_size;
pub mod chan_group;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod drain;
pub mod errors;
pub mod events;
pub mod forwarder;
pub mod framing;
pub mod hash_ring;
pub mod http_utils;
pub mod lanes;
pub mod logfmt;
pub mod metrics;
pub mod recycler;
pub mod riemann;
pub mod sampler;
pub mod server;
pub mod sink;
