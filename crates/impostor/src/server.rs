//! `ImpostorServer` builder and accept loop.
//!
//! This is the entry point for running a game server. It ties the
//! layers together: transport → protocol → coordinator → broadcast.

use std::sync::Arc;

use impostor_protocol::JsonCodec;
use impostor_transport::{Transport, WebSocketTransport};

use crate::broadcast::ConnectionHub;
use crate::config::ServerConfig;
use crate::coordinator::SessionCoordinator;
use crate::handler::handle_connection;
use crate::packs::WordPackSource;
use crate::ImpostorError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<W: WordPackSource> {
    pub(crate) coordinator: Arc<SessionCoordinator<ConnectionHub, W>>,
    pub(crate) hub: Arc<ConnectionHub>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use impostor::prelude::*;
///
/// # async fn run() -> Result<(), ImpostorError> {
/// let packs = InMemoryWordPacks::new(vec![WordPack {
///     id: "food".into(),
///     name: "Food".into(),
///     words: vec!["Pizza".into(), "Sushi".into()],
///     locale: "en".into(),
///     slug: "food".into(),
/// }]);
///
/// let server = ImpostorServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(packs)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ImpostorServerBuilder {
    config: ServerConfig,
}

impl ImpostorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration. Call before [`bind`](Self::bind)
    /// if both are used.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and wires up the coordinator.
    pub async fn build<W: WordPackSource>(
        self,
        packs: W,
    ) -> Result<ImpostorServer<W>, ImpostorError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let hub = Arc::new(ConnectionHub::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            Arc::clone(&hub),
            Arc::new(packs),
            self.config.game.clone(),
        ));
        let state = Arc::new(ServerState {
            coordinator,
            hub,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(ImpostorServer { transport, state })
    }
}

impl Default for ImpostorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting
/// connections.
pub struct ImpostorServer<W: WordPackSource> {
    transport: WebSocketTransport,
    state: Arc<ServerState<W>>,
}

impl<W: WordPackSource> ImpostorServer<W> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated, spawning a
    /// handler task per connection.
    pub async fn run(mut self) -> Result<(), ImpostorError> {
        tracing::info!(addr = %self.state.config.bind_addr, "impostor server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
