//! Shared test helpers for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use cotune_api::{AppState, build_app};
use cotune_core::config::{AppConfig, SyncConfig};
use cotune_core::message::{ClientMessage, ServerMessage, serializer};
use cotune_core::types::{Identity, Track};
use cotune_player::{ClockEngine, Player, Reaction};
use cotune_realtime::RealtimeEngine;
use cotune_realtime::connection::ConnectionHandle;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn song(n: u32) -> Track {
    let mut track = Track::new(
        format!("song-{n}"),
        format!("Song {n}"),
        "The Band",
        format!("https://cdn.example/{n}.mp3"),
    );
    track.duration = Some(240.0);
    track
}

/// A connection attached straight to the engine, speaking JSON frames.
pub struct EnginePeer {
    pub handle: Arc<ConnectionHandle>,
    rx: mpsc::Receiver<ServerMessage>,
}

impl EnginePeer {
    pub fn connect(engine: &RealtimeEngine, user: &str) -> Self {
        let (handle, rx) = engine.connections.connect(Identity::new(user));
        Self { handle, rx }
    }

    /// Sends a frame through the same path a socket would use.
    pub fn send(&self, engine: &RealtimeEngine, message: &ClientMessage) {
        let text = serializer::serialize_inbound(message).expect("serialize");
        engine.connections.handle_inbound(&self.handle.id, &text);
    }

    /// Everything queued for this connection, decoded from the wire form.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut frames = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            let text = serializer::serialize_outbound(&message).expect("serialize");
            frames.push(serializer::deserialize_outbound(&text).expect("deserialize"));
        }
        frames
    }

    pub fn disconnect(&self, engine: &RealtimeEngine) {
        engine.connections.disconnect(&self.handle.id);
    }
}

/// A player wired to an engine connection.
pub struct PlayerPeer {
    pub peer: EnginePeer,
    pub player: Player<ClockEngine>,
}

impl PlayerPeer {
    pub fn connect(engine: &RealtimeEngine, user: &str) -> Self {
        let peer = EnginePeer::connect(engine, user);
        let player = Player::new(Identity::new(user), ClockEngine::new(), &SyncConfig::default());
        Self { peer, player }
    }

    pub fn send(&self, engine: &RealtimeEngine, reaction: Reaction) {
        for message in &reaction.outbound {
            self.peer.send(engine, message);
        }
    }
}

/// Delivers server frames to players, and their replies back to the
/// engine, until nothing is in flight. Returns the frames each player saw.
pub fn pump(engine: &RealtimeEngine, peers: &mut [&mut PlayerPeer]) -> Vec<Vec<ServerMessage>> {
    let mut seen = vec![Vec::new(); peers.len()];
    loop {
        let mut delivered = false;
        for (i, peer) in peers.iter_mut().enumerate() {
            for frame in peer.peer.drain() {
                delivered = true;
                seen[i].push(frame.clone());
                let reaction = peer.player.handle_server(frame);
                peer.send(engine, reaction);
            }
        }
        if !delivered {
            return seen;
        }
    }
}

/// An axum server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub engine: Arc<RealtimeEngine>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = Arc::new(AppConfig::default());
        let engine = Arc::new(RealtimeEngine::new(config.realtime.clone()));
        let app = build_app(AppState::new(config, engine.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server error");
        });

        Self { addr, engine, task }
    }

    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Polls the engine until `condition` holds.
    pub async fn wait_until(&self, condition: impl Fn(&RealtimeEngine) -> bool) {
        tokio::time::timeout(RECV_TIMEOUT, async {
            while !condition(&self.engine) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A raw WebSocket client speaking protocol frames.
pub struct WsPeer {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsPeer {
    pub async fn connect(server: &TestServer, user: &str) -> Self {
        let url = format!("{}/ws?user_id={user}", server.ws_base());
        let (socket, _) = connect_async(url.as_str()).await.expect("ws connect");
        Self { socket }
    }

    pub async fn send(&mut self, message: &ClientMessage) {
        let text = serializer::serialize_inbound(message).expect("serialize");
        self.socket
            .send(Message::Text(text.into()))
            .await
            .expect("ws send");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.socket
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("ws send");
    }

    pub async fn recv(&mut self) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.socket.next())
                .await
                .expect("timed out waiting for frame")
                .expect("socket closed")
                .expect("ws error");
            if let Message::Text(text) = frame {
                return serializer::deserialize_outbound(text.as_str()).expect("server frame");
            }
        }
    }

    /// Skips frames until one matches.
    pub async fn recv_until(&mut self, matches: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
        loop {
            let frame = self.recv().await;
            if matches(&frame) {
                return frame;
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}
