use log::{error, info, warn};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::broadcast::Broadcaster;
use crate::client::{ClientRegistry, ConnectionObserver, handle_client};
use crate::config::ServerConfig;
use crate::error::{ServerError, TransportError, handle_error};
use crate::middleware::LoggingObserver;
use crate::pose::{PoseSource, RandomPoseSource};

/// Accepts viewer connections and keeps the registry in step with them.
pub struct Server {
    client_registry: Arc<ClientRegistry>,
    listener: TcpListener,
    config: Arc<ServerConfig>,
    observer: Arc<dyn ConnectionObserver>,
}

impl Server {
    /// Binds the listening socket. Port 0 picks an ephemeral port.
    pub async fn bind(
        config: ServerConfig,
        client_registry: Arc<ClientRegistry>,
    ) -> Result<Self, ServerError> {
        let socket = config.socket_addr()?;

        let listener = match TcpListener::bind(socket).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(TransportError::BindFailed(socket.to_string(), e).into());
            }
        };
        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            client_registry,
            listener,
            config: Arc::new(config),
            observer: Arc::new(LoggingObserver),
        })
    }

    /// Replaces the default logging observer.
    pub fn with_observer(mut self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.client_registry)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept loop. Accept failures are logged and never end the loop.
    pub async fn start(&self) {
        info!(
            "Starting pose broadcast server on {} (max {} clients)",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".into()),
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let client_registry = Arc::clone(&self.client_registry);
                    let config = Arc::clone(&self.config);
                    let observer = Arc::clone(&self.observer);

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_client(stream, addr, client_registry, config, observer).await
                        {
                            warn!("Connection from {} ended with error", addr);
                            handle_error(&e);
                        }
                    });
                }
                Err(e) => handle_error(&TransportError::AcceptFailed(e).into()),
            }
        }
    }
}

/// Builds the pose source described by the configuration.
pub fn pose_source(config: &ServerConfig) -> Box<dyn PoseSource> {
    match config.seed {
        Some(seed) => Box::new(RandomPoseSource::with_seed(config.joints.clone(), seed)),
        None => Box::new(RandomPoseSource::new(config.joints.clone())),
    }
}

/// Runs the transport server and the broadcaster over one shared registry
/// until `shutdown` resolves.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let registry = Arc::new(ClientRegistry::new());
    let broadcaster = Broadcaster::new(
        pose_source(&config),
        Arc::clone(&registry),
        config.tick_interval(),
        config.max_consecutive_send_failures,
    );
    let server = Server::bind(config, Arc::clone(&registry)).await?;

    let broadcast_task = tokio::spawn(broadcaster.run());

    tokio::select! {
        _ = server.start() => {}
        _ = shutdown => info!("Shutdown requested"),
    }

    broadcast_task.abort();
    for session in registry.snapshot().await {
        session.mark_closed();
    }
    info!("Server stopped");
    Ok(())
}
