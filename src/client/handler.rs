use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::client::{ClientRegistry, ConnectionObserver, Session};
use crate::config::ServerConfig;
use crate::error::{ServerError, TransportError};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Drives one viewer connection from accept to close.
///
/// - Registers a `Connecting` session before the handshake, so the registry
///   cap applies to pending connections too.
/// - Once open, a writer task drains the session's outbound queue while this
///   task reads (and mostly ignores) inbound frames.
/// - Whatever ends the connection, the session finishes `Closed` and out of
///   the registry.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    config: Arc<ServerConfig>,
    observer: Arc<dyn ConnectionObserver>,
) -> Result<(), ServerError> {
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity);
    let session = Arc::new(Session::new(
        registry.next_session_id(),
        client_addr,
        outbound_tx,
    ));

    // Dropping the stream on rejection closes the TCP connection
    registry
        .try_add(Arc::clone(&session), config.max_clients)
        .await?;

    let ws = match timeout(config.handshake_timeout(), accept_async(stream)).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            discard(&registry, &session).await;
            return Err(TransportError::HandshakeFailed(client_addr, e).into());
        }
        Err(_) => {
            discard(&registry, &session).await;
            return Err(TransportError::HandshakeTimeout(client_addr).into());
        }
    };

    if !session.mark_open() {
        // Evicted while the handshake was in flight
        discard(&registry, &session).await;
        return Ok(());
    }
    observer.on_open(&session);

    let (sink, source) = ws.split();
    let (stop_tx, stop_rx) = oneshot::channel();
    let mut writer = tokio::spawn(write_loop(sink, outbound_rx, stop_rx));

    let result = tokio::select! {
        res = read_loop(source, &session, observer.as_ref()) => res,
        res = &mut writer => match res {
            Ok(res) => res,
            Err(e) => {
                warn!("Writer task for {} ended abnormally: {}", client_addr, e);
                Ok(())
            }
        },
        _ = session.closed() => {
            debug!("Session {} closed by server", session.id());
            Ok(())
        }
    };

    // Let the writer send a close frame if it is still running
    if !writer.is_finished() {
        let _ = stop_tx.send(());
        if timeout(config.close_timeout(), &mut writer).await.is_err() {
            writer.abort();
        }
    }

    discard(&registry, &session).await;
    observer.on_close(&session);

    result.map_err(ServerError::from)
}

/// Drops the session from the registry, which also marks it closed.
async fn discard(registry: &ClientRegistry, session: &Session) {
    if registry.remove(session.id()).await.is_some() {
        info!(
            "Session {} for {} removed ({} remaining)",
            session.id(),
            session.peer_addr(),
            registry.len().await
        );
    }
}

async fn read_loop(
    mut source: WsSource,
    session: &Session,
    observer: &dyn ConnectionObserver,
) -> Result<(), TransportError> {
    while let Some(frame) = source.next().await {
        match frame.map_err(TransportError::ReceiveFailed)? {
            Message::Text(text) => observer.on_message(session, text.as_str()),
            Message::Close(_) => {
                info!("Connection closed by viewer {}", session.peer_addr());
                return Ok(());
            }
            // Pings are answered by tungstenite itself
            _ => {}
        }
    }
    info!("Connection dropped by viewer {}", session.peer_addr());
    Ok(())
}

async fn write_loop(
    mut sink: WsSink,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    mut stop: oneshot::Receiver<()>,
) -> Result<(), TransportError> {
    loop {
        tokio::select! {
            payload = outbound.recv() => match payload {
                Some(payload) => sink
                    .send(Message::Text(payload))
                    .await
                    .map_err(TransportError::SendFailed)?,
                None => break,
            },
            _ = &mut stop => break,
        }
    }
    let _ = sink.close().await;
    Ok(())
}
