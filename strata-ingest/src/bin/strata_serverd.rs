use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use strata_ingest::config::{Cli, ServerConfig};
use strata_sdk::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(cli.log_filter()))
        .init();

    let config = ServerConfig::from(&cli);
    let registry = Arc::new(Registry::new());
    let shutdown = CancellationToken::new();

    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(strata_ingest::server::run(config, registry, server_shutdown));

    let result = tokio::select! {
        result = &mut server => result,
        _ = tokio::signal::ctrl_c() => {
            shutdown.cancel();
            server.await
        }
    };

    match result {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!(error = %err, "ingest server failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "ingest server task panicked");
            ExitCode::FAILURE
        }
    }
}
