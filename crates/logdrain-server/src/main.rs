// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logdrain::{
    config::Config,
    drain::DrainHandler,
    forwarder::{Forwarder, ForwarderSet},
    lanes::Lanes,
    recycler::ConnectionRecycler,
    riemann::RiemannClient,
    sampler::run_sampler,
    server::DrainServer,
};

const LANE_PREFIX: &str = "riemann";

#[tokio::main]
pub async fn main() {
    let mut log_level = env::var("LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let debug_enabled = env::var("DEBUG").is_ok_and(|val| val.eq_ignore_ascii_case("true"));
    if debug_enabled && log_level != "trace" {
        log_level = "debug".to_string();
    }

    let env_filter = format!("h2=off,hyper=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on drain startup: {e}");
            process::exit(1);
        }
    };

    let (lanes, receivers) = Lanes::new(
        LANE_PREFIX,
        config.lanes,
        config.channel_capacity,
        config.hash_ring_replicas,
        None,
    );
    let lanes = Arc::new(lanes);

    let mut forwarders = ForwarderSet::new();
    for receiver in receivers {
        let client = match RiemannClient::connect(&config.riemann_address, config.sink_timeout).await {
            Ok(client) => client,
            Err(e) => {
                error!(
                    "Unable to connect to riemann at {} for {}: {e}",
                    config.riemann_address,
                    receiver.name()
                );
                process::exit(1);
            }
        };
        forwarders.spawn(Forwarder::new(receiver, client, &config.riemann_prefix));
    }

    let cancel = CancellationToken::new();
    tokio::spawn(run_sampler(
        Arc::clone(&lanes),
        config.sample_interval,
        cancel.clone(),
    ));
    let recycler = ConnectionRecycler::spawn(config.recycle_interval, cancel.clone());

    let server = DrainServer::new(DrainHandler::new(&config, lanes, recycler));

    info!(
        "Starting drain with {} lanes forwarding to {}",
        config.lanes, config.riemann_address
    );

    tokio::select! {
        res = server.start(config.port, cancel.clone()) => {
            if let Err(e) = res {
                error!("Drain server failed: {e}");
                cancel.cancel();
                process::exit(1);
            }
        }
        reason = forwarders.stopped() => {
            error!("Shutting down, a lane lost its consumer: {reason}");
            cancel.cancel();
            process::exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
        }
    }
    cancel.cancel();
}
