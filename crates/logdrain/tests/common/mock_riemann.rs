// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Minimal Riemann server recording every event it receives

use logdrain::riemann::{proto, read_msg, write_msg};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct MockRiemann {
    pub addr: SocketAddr,
    pub received_events: Arc<Mutex<Vec<proto::Event>>>,
}

impl MockRiemann {
    /// Start a mock Riemann server on a random port, rejecting the first `reject_first`
    /// messages it receives
    pub async fn start(reject_first: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock riemann");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let received_events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = received_events.clone();
        let remaining_rejections = Arc::new(AtomicUsize::new(reject_first));

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let events = events_clone.clone();
                let rejections = remaining_rejections.clone();

                tokio::spawn(async move {
                    while let Ok(msg) = read_msg(&mut stream).await {
                        let reject = rejections
                            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                            .is_ok();
                        let reply = if reject {
                            proto::Msg {
                                ok: Some(false),
                                error: Some("rejected by mock".to_string()),
                                ..Default::default()
                            }
                        } else {
                            events.lock().unwrap().extend(msg.events);
                            proto::Msg {
                                ok: Some(true),
                                ..Default::default()
                            }
                        };
                        if write_msg(&mut stream, &reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        MockRiemann {
            addr,
            received_events,
        }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn get_events(&self) -> Vec<proto::Event> {
        self.received_events.lock().unwrap().clone()
    }

    /// Wait until at least `count` events were acknowledged
    pub async fn wait_for_events(&self, count: usize) -> Vec<proto::Event> {
        for _ in 0..200 {
            let events = self.get_events();
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} events, got {}",
            self.get_events().len()
        );
    }
}
