use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    commands::CommandDispatcher,
    config::ServerConfig,
    connection::handle_client_connection,
    rdb::{load_rdb_file, spawn_background_saver},
    replication::run_replica_link,
    state::State,
};

/// A bound server, ready to accept connections.
pub struct RedisServer {
    listener: TcpListener,
    dispatcher: CommandDispatcher,
}

impl RedisServer {
    /// Restores the snapshot named by `config`, if there is one, and binds the
    /// listener. Port 0 binds an ephemeral port; see [`RedisServer::local_addr`].
    ///
    /// # Returns
    ///
    /// * `Ok(RedisServer)` - The server, not yet accepting
    /// * `Err(anyhow::Error)` - The snapshot exists but cannot be loaded, or the port cannot be bound
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let state = Arc::new(State::new(config));
        let snapshot_path = state.config.snapshot_path();

        if let Some(snapshot) = load_rdb_file(&snapshot_path)
            .await
            .with_context(|| format!("loading snapshot {}", snapshot_path.display()))?
        {
            info!(
                keys = snapshot.key_count(),
                path = %snapshot_path.display(),
                "snapshot loaded"
            );
            state.store.load_snapshot(snapshot).await;
        }

        let address = format!("127.0.0.1:{}", state.config.port);
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("binding {}", address))?;

        Ok(Self {
            listener,
            dispatcher: CommandDispatcher::new(state),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &Arc<State> {
        self.dispatcher.state()
    }

    /// Starts the background saver and, on a replica, the link to the master,
    /// then accepts connections until the process ends.
    pub async fn run(self) -> anyhow::Result<()> {
        let state = Arc::clone(self.dispatcher.state());

        info!(address = %self.local_addr()?, role = ?state.replication.role(), "server listening");

        spawn_background_saver(Arc::clone(&state));

        if state.replication.is_replica() {
            tokio::spawn(run_replica_link(self.dispatcher.clone()));
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, address)) => {
                    tokio::spawn(handle_client_connection(
                        stream,
                        address.to_string(),
                        self.dispatcher.clone(),
                    ));
                }
                Err(error) => {
                    error!(%error, "failed to accept connection");
                }
            }
        }
    }
}
