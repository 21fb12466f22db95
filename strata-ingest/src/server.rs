//! The TCP accept loop: one task per connection, each decoding
//! length-prefixed CBOR frames and routing the observations they carry
//! into a shared [`Registry`].

use std::sync::Arc;

use strata_sdk::Registry;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::IngestResult;
use crate::framing::read_frame;
use crate::wire::{decode_payload, DecodedPayload};

/// Binds `config`'s address and serves connections until `shutdown` is
/// cancelled, at which point the listener stops accepting and every
/// in-flight connection task is given a chance to drain before returning.
pub async fn run(
    config: ServerConfig,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(addr = %listener.local_addr()?, "ingest server listening");

    let mut connections = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!(%peer, "accepted connection");
                let registry = Arc::clone(&registry);
                let conn_shutdown = shutdown.clone();
                connections.spawn(async move {
                    if let Err(err) = handle_connection(stream, registry, conn_shutdown).await {
                        warn!(%peer, error = %err, "connection ended with an error");
                    }
                });
            }
            _ = shutdown.cancelled() => {
                info!("shutdown requested, no longer accepting new connections");
                break;
            }
        }
    }

    while connections.join_next().await.is_some() {}
    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
) -> IngestResult<()> {
    loop {
        let payload = tokio::select! {
            frame = read_frame(&mut stream) => frame?,
            _ = shutdown.cancelled() => return Ok(()),
        };
        let Some(payload) = payload else {
            return Ok(());
        };

        match decode_payload(&payload)? {
            DecodedPayload::Message(msg) => {
                let name = msg.name().to_string();
                if let Err(err) = registry.append_batch(&name, msg.into_observations()) {
                    warn!(signal = name, error = %err, "dropping rejected observation");
                }
            }
            DecodedPayload::UnknownType(typ) => {
                warn!(r#type = typ, "discarding frame of unrecognized type");
            }
        }
    }
}
