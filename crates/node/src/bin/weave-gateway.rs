// Path: crates/node/src/bin/weave-gateway.rs

//! The gateway binary: telemetry up, system assembled, metrics served,
//! clean drain on ctrl-c.

use std::net::SocketAddr;
use std::path::PathBuf;
use weave_node::{load_config, Collaborators, System};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    weave_telemetry::init_tracing()?;
    weave_telemetry::prometheus::install();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WEAVE_GATEWAY_CONFIG").ok())
        .map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    let metrics_addr: SocketAddr = config
        .metrics_listen
        .parse()
        .map_err(|e| anyhow::anyhow!("bad metrics_listen {:?}: {}", config.metrics_listen, e))?;

    let system = System::build(&config, Collaborators::default()).await?;
    tracing::info!(
        target: "node",
        data_dir = %config.data_dir.display(),
        chain = %config.chain.url,
        "gateway retrieval core up"
    );

    let telemetry = tokio::spawn(weave_telemetry::http::run_server(metrics_addr));

    tokio::signal::ctrl_c().await?;
    tracing::info!(target: "node", "shutting down");
    system.shutdown().await;
    telemetry.abort();
    Ok(())
}
