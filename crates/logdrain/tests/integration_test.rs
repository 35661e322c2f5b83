// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::helpers::send_tcp_request;
use common::mock_riemann::MockRiemann;
use logdrain::{
    config::Config,
    constants::DRAIN_TOKEN_HEADER,
    drain::DrainHandler,
    forwarder::{Forwarder, ForwarderStats},
    framing::frame,
    lanes::Lanes,
    recycler::ConnectionRecycler,
    riemann::RiemannClient,
    server::DrainServer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const ROUTER_LINE: &str = "<158>1 2014-07-02T20:35:11.026490+00:00 host heroku router - at=info method=GET path=/ host=example.com request_id=r1 fwd=1.1.1.1 dyno=web.1 connect=1ms service=22ms status=200 bytes=512";

struct Pipeline {
    addr: String,
    lanes: Arc<Lanes>,
    stats: Vec<(String, Arc<ForwarderStats>)>,
    cancel: CancellationToken,
}

impl Pipeline {
    async fn start(config: Config) -> Self {
        let (lanes, receivers) = Lanes::new(
            "riemann",
            config.lanes,
            config.channel_capacity,
            config.hash_ring_replicas,
            None,
        );
        let lanes = Arc::new(lanes);

        let mut stats = Vec::new();
        for receiver in receivers {
            let name = receiver.name().to_string();
            let client = RiemannClient::connect(&config.riemann_address, config.sink_timeout)
                .await
                .expect("Failed to connect to mock riemann");
            let forwarder = Forwarder::new(receiver, client, &config.riemann_prefix);
            stats.push((name, forwarder.stats()));
            tokio::spawn(forwarder.run());
        }

        let cancel = CancellationToken::new();
        let recycler = ConnectionRecycler::spawn(config.recycle_interval, cancel.clone());
        let server = DrainServer::new(DrainHandler::new(&config, Arc::clone(&lanes), recycler));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server_cancel = cancel.clone();
        tokio::spawn(async move { server.serve(listener, server_cancel).await });

        Pipeline {
            addr,
            lanes,
            stats,
            cancel,
        }
    }

    fn stats_for(&self, token: &str) -> Arc<ForwarderStats> {
        let lane = self.lanes.get(token).unwrap().name();
        self.stats
            .iter()
            .find(|(name, _)| name == lane)
            .map(|(_, stats)| Arc::clone(stats))
            .unwrap()
    }

    async fn post_drain(&self, token: &str, body: String) -> u16 {
        let (response, _) = send_tcp_request(
            &self.addr,
            "/drain",
            "POST",
            &[(DRAIN_TOKEN_HEADER, token)],
            Some(body),
        )
        .await
        .expect("Failed to send drain request");
        response.status().as_u16()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn config_for(riemann: &MockRiemann, lanes: usize) -> Config {
    Config {
        riemann_address: riemann.address(),
        lanes,
        channel_capacity: 64,
        sink_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_router_line_is_delivered_as_latency_metric() {
    let riemann = MockRiemann::start(0).await;
    let pipeline = Pipeline::start(config_for(&riemann, 2)).await;

    let status = pipeline.post_drain("t.abc123", frame(ROUTER_LINE)).await;
    assert_eq!(status, 204);

    let events = riemann.wait_for_events(1).await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(event
        .service
        .as_deref()
        .unwrap()
        .ends_with("heroku latency"));
    assert_eq!(event.metric_sint64, Some(23));
    assert_eq!(event.host.as_deref(), Some("router"));
    assert_eq!(event.ttl, Some(300.0));
    assert!(event.attributes.iter().any(|attr| attr.key == "logplex_source_id"
        && attr.value.as_deref() == Some("t.abc123")));

    let token_lane = pipeline.stats_for("t.abc123");
    wait_until(|| token_lane.delivered() == 1).await;
    let total: u64 = pipeline.stats.iter().map(|(_, s)| s.delivered()).sum();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_rejected_event_is_dropped_and_forwarding_continues() {
    let riemann = MockRiemann::start(1).await;
    let pipeline = Pipeline::start(config_for(&riemann, 1)).await;

    let slow_line = ROUTER_LINE.replace("service=22ms", "service=99ms");
    let body = format!("{}{}", frame(ROUTER_LINE), frame(&slow_line));
    assert_eq!(pipeline.post_drain("t.abc123", body).await, 204);

    let events = riemann.wait_for_events(1).await;
    assert_eq!(events[0].metric_sint64, Some(100));

    let stats = pipeline.stats_for("t.abc123");
    wait_until(|| stats.delivered() == 1).await;
    assert_eq!(stats.dropped(), 1);
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let riemann = MockRiemann::start(0).await;
    let pipeline = Pipeline::start(config_for(&riemann, 1)).await;

    let (response, body) = send_tcp_request(&pipeline.addr, "/health", "GET", &[], None)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(body, "OK");

    let (response, _) = send_tcp_request(&pipeline.addr, "/nope", "GET", &[], None)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let (response, _) = send_tcp_request(&pipeline.addr, "/drain", "GET", &[], None)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 405);
}
