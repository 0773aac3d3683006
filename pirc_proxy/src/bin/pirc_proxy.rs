use pirc_network::{config::load_config, tracing_config, transport::RpcListener};
use pirc_proxy::{config::ProxyConfig, coordinator::ProxyCoordinator};

use std::path::PathBuf;
use structopt::StructOpt;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab")]
struct Opts {
    /// Config file location
    #[structopt(short, long, default_value = "pirc_proxy.conf")]
    config: PathBuf,
}

/// Load configuration and certificates, then serve until interrupted.
///
/// Configuration problems are reported before anything is started.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let opts = Opts::from_args();

    let config: ProxyConfig = load_config(&opts.config)?;
    tracing_config::init(config.log.clone())?;

    let tls = config.tls.load_from_disk()?;

    let (call_send, call_recv) = mpsc::channel(128);
    let listener = RpcListener::new(config.listen_address, &tls, call_send)?;
    let (listen_task, _) = listener.spawn_listen_task().await?;

    let (shutdown_send, shutdown_recv) = oneshot::channel();
    let coordinator = ProxyCoordinator::new(config.connect);
    let coordinator_task = tokio::spawn(coordinator.run(call_recv, shutdown_recv));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted; shutting down");

    listener.shutdown();
    // The coordinator may already have stopped if the listener went away
    let _ = shutdown_send.send(());

    coordinator_task.await?;
    listen_task.await?;

    Ok(())
}
