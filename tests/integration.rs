//! End-to-end tests against a live server using a real WebSocket client.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use pose_broadcast_server::broadcast::Broadcaster;
use pose_broadcast_server::client::{ClientRegistry, ConnectionObserver, Session, SessionId};
use pose_broadcast_server::config::ServerConfig;
use pose_broadcast_server::pose::JointSpec;
use pose_broadcast_server::server::{Server, pose_source, serve};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn test_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        tick_interval_ms: 10,
        seed: Some(1),
        joints: vec![
            JointSpec::full_turn("panda_joint1"),
            JointSpec::full_turn("panda_joint2"),
            JointSpec::new("panda_joint4", -2.0, 0.0),
        ],
        ..ServerConfig::default()
    }
}

/// Records lifecycle events for assertions.
#[derive(Default)]
struct RecordingObserver {
    opened: Mutex<Vec<SessionId>>,
    closed: Mutex<Vec<SessionId>>,
    messages: Mutex<Vec<String>>,
}

impl ConnectionObserver for RecordingObserver {
    fn on_open(&self, session: &Session) {
        self.opened.lock().unwrap().push(session.id());
    }

    fn on_close(&self, session: &Session) {
        self.closed.lock().unwrap().push(session.id());
    }

    fn on_message(&self, _session: &Session, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

/// Boot a server plus broadcaster and return its address and registry.
async fn boot_server(
    config: ServerConfig,
    observer: Arc<RecordingObserver>,
) -> (SocketAddr, Arc<ClientRegistry>) {
    let registry = Arc::new(ClientRegistry::new());
    let broadcaster = Broadcaster::new(
        pose_source(&config),
        Arc::clone(&registry),
        config.tick_interval(),
        config.max_consecutive_send_failures,
    );
    let server = Server::bind(config, Arc::clone(&registry))
        .await
        .unwrap()
        .with_observer(observer);
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move { server.start().await });
    tokio::spawn(broadcaster.run());

    (addr, registry)
}

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws, _) = timeout(TIMEOUT, connect_async(format!("ws://{addr}/")))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    ws
}

async fn next_pose(ws: &mut WsStream) -> Value {
    loop {
        let frame = timeout(TIMEOUT, ws.next())
            .await
            .expect("no frame in time")
            .expect("stream ended")
            .expect("read failed");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("frame is not JSON");
        }
    }
}

async fn wait_for_len(registry: &ClientRegistry, expected: usize) {
    timeout(TIMEOUT, async {
        while registry.len().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {} sessions", expected));
}

#[tokio::test]
async fn viewer_receives_pose_frames() {
    let (addr, _registry) = boot_server(test_config(), Arc::default()).await;
    let mut ws = connect(addr).await;

    for _ in 0..5 {
        let frame = next_pose(&mut ws).await;
        let positions = frame["jointPositions"].as_object().expect("jointPositions");
        let names: BTreeSet<_> = positions.keys().cloned().collect();
        assert_eq!(
            names,
            BTreeSet::from([
                "panda_joint1".to_string(),
                "panda_joint2".to_string(),
                "panda_joint4".to_string()
            ])
        );
        let j4 = positions["panda_joint4"].as_f64().unwrap();
        assert!((-2.0..=0.0).contains(&j4));
    }
}

#[tokio::test]
async fn every_viewer_is_served() {
    let (addr, registry) = boot_server(test_config(), Arc::default()).await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_len(&registry, 2).await;

    next_pose(&mut a).await;
    next_pose(&mut b).await;
}

#[tokio::test]
async fn disconnect_removes_the_session() {
    let observer = Arc::new(RecordingObserver::default());
    let (addr, registry) = boot_server(test_config(), Arc::clone(&observer)).await;

    let mut ws = connect(addr).await;
    wait_for_len(&registry, 1).await;
    next_pose(&mut ws).await;

    ws.close(None).await.unwrap();
    wait_for_len(&registry, 0).await;

    timeout(TIMEOUT, async {
        while observer.closed.lock().unwrap().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("on_close never fired");
    assert_eq!(*observer.opened.lock().unwrap(), *observer.closed.lock().unwrap());
}

#[tokio::test]
async fn dropped_connection_removes_the_session() {
    let (addr, registry) = boot_server(test_config(), Arc::default()).await;

    let ws = connect(addr).await;
    wait_for_len(&registry, 1).await;
    drop(ws);

    wait_for_len(&registry, 0).await;
}

#[tokio::test]
async fn server_initiated_close_reaches_the_viewer() {
    let observer = Arc::new(RecordingObserver::default());
    let (addr, registry) = boot_server(test_config(), Arc::clone(&observer)).await;

    let mut ws = connect(addr).await;
    wait_for_len(&registry, 1).await;
    next_pose(&mut ws).await;

    // Same path the broadcaster takes when it evicts a viewer
    let id = registry.snapshot().await[0].id();
    assert!(registry.remove(id).await.is_some());

    let got_close = timeout(TIMEOUT, async {
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Close(_)) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    })
    .await
    .expect("connection was never closed");
    assert!(got_close, "viewer saw no close frame");

    wait_for_len(&registry, 0).await;
    timeout(TIMEOUT, async {
        while observer.closed.lock().unwrap().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("on_close never fired");
    assert_eq!(*observer.closed.lock().unwrap(), vec![id]);
}

#[tokio::test]
async fn reconnect_creates_a_new_session() {
    let observer = Arc::new(RecordingObserver::default());
    let (addr, registry) = boot_server(test_config(), Arc::clone(&observer)).await;

    let mut first = connect(addr).await;
    wait_for_len(&registry, 1).await;
    first.close(None).await.unwrap();
    wait_for_len(&registry, 0).await;

    let mut second = connect(addr).await;
    next_pose(&mut second).await;

    let opened = observer.opened.lock().unwrap().clone();
    assert_eq!(opened.len(), 2);
    assert_ne!(opened[0], opened[1]);
}

#[tokio::test]
async fn viewers_beyond_the_limit_are_refused() {
    let config = ServerConfig {
        max_clients: 1,
        ..test_config()
    };
    let (addr, registry) = boot_server(config, Arc::default()).await;

    let mut admitted = connect(addr).await;
    wait_for_len(&registry, 1).await;

    let refused = timeout(TIMEOUT, connect_async(format!("ws://{addr}/")))
        .await
        .expect("connect timed out");
    assert!(refused.is_err());

    // the admitted viewer keeps streaming
    next_pose(&mut admitted).await;
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn inbound_text_reaches_the_observer_only() {
    let observer = Arc::new(RecordingObserver::default());
    let (addr, _registry) = boot_server(test_config(), Arc::clone(&observer)).await;

    let mut ws = connect(addr).await;
    ws.send(Message::text("hello from the viewer".to_string())).await.unwrap();

    timeout(TIMEOUT, async {
        while observer.messages.lock().unwrap().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("message never observed");
    assert_eq!(
        observer.messages.lock().unwrap()[0],
        "hello from the viewer"
    );

    // still a viewer afterwards
    next_pose(&mut ws).await;
}

#[tokio::test]
async fn serve_returns_when_shutdown_resolves() {
    let result = timeout(
        TIMEOUT,
        serve(test_config(), sleep(Duration::from_millis(50))),
    )
    .await
    .expect("serve did not stop");
    assert!(result.is_ok());
}

#[tokio::test]
async fn serve_rejects_invalid_config() {
    let config = ServerConfig {
        joints: Vec::new(),
        ..test_config()
    };
    assert!(serve(config, std::future::pending()).await.is_err());
}
