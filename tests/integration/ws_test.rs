//! End-to-end tests over real WebSocket connections.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;

use cotune_core::message::{ClientMessage, ServerMessage};
use cotune_core::types::{Identity, PlayerState};
use cotune_player::{ClientCommand, ClientOptions, ClockEngine, CotuneClient, Notice};

use crate::helpers::{TestServer, WsPeer, song};

#[tokio::test]
async fn test_handshake_without_identity_is_refused() {
    let server = TestServer::start().await;

    let result = connect_async(format!("{}/ws", server.ws_base())).await;

    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(e) => panic!("expected HTTP 401, got {e}"),
        Ok(_) => panic!("handshake without user_id succeeded"),
    }
    assert_eq!(server.engine.registry.connection_count(), 0);
}

#[tokio::test]
async fn test_connect_announces_presence() {
    let server = TestServer::start().await;
    let mut alice = WsPeer::connect(&server, "alice").await;
    alice
        .recv_until(|f| matches!(f, ServerMessage::Activities { .. }))
        .await;

    let mut bob = WsPeer::connect(&server, "bob").await;
    let online = bob
        .recv_until(|f| matches!(f, ServerMessage::UsersOnline { .. }))
        .await;
    let ServerMessage::UsersOnline { users } = online else {
        unreachable!()
    };
    assert!(users.contains(&Identity::new("alice")));

    let joined = alice
        .recv_until(|f| matches!(f, ServerMessage::UserConnected { .. }))
        .await;
    assert_eq!(
        joined,
        ServerMessage::UserConnected {
            user_id: Identity::new("bob")
        }
    );

    bob.close().await;
    let left = alice
        .recv_until(|f| matches!(f, ServerMessage::UserDisconnected { .. }))
        .await;
    assert_eq!(
        left,
        ServerMessage::UserDisconnected {
            user_id: Identity::new("bob")
        }
    );
}

#[tokio::test]
async fn test_invalid_frame_gets_error_and_connection_survives() {
    let server = TestServer::start().await;
    let mut alice = WsPeer::connect(&server, "alice").await;

    alice.send_raw(r#"{"type":"no-such-event"}"#).await;
    let error = alice
        .recv_until(|f| matches!(f, ServerMessage::Error { .. }))
        .await;
    let ServerMessage::Error { code, .. } = error else {
        unreachable!()
    };
    assert_eq!(code, "INVALID_MESSAGE");

    alice
        .send(&ClientMessage::SendMessage {
            receiver_id: Identity::new("alice"),
            content: "still here".into(),
        })
        .await;
    alice
        .recv_until(|f| matches!(f, ServerMessage::MessageSent { .. }))
        .await;
}

#[tokio::test]
async fn test_listen_along_round_trip() {
    let server = TestServer::start().await;
    let mut host = WsPeer::connect(&server, "host").await;
    let mut listener = WsPeer::connect(&server, "listener").await;

    listener
        .send(&ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("host"),
        })
        .await;

    let joined = host
        .recv_until(|f| matches!(f, ServerMessage::ListenerJoined { .. }))
        .await;
    assert_eq!(
        joined,
        ServerMessage::ListenerJoined {
            listener_id: Identity::new("listener")
        }
    );
    let ServerMessage::RequestSync { listener_id } = host
        .recv_until(|f| matches!(f, ServerMessage::RequestSync { .. }))
        .await
    else {
        unreachable!()
    };

    let snapshot = PlayerState::new(song(3), true, 42.5);
    host.send(&ClientMessage::SyncState {
        listener_id,
        player_state: snapshot.clone(),
    })
    .await;

    let ServerMessage::Sync {
        host_user_id,
        seq,
        player_state,
    } = listener
        .recv_until(|f| matches!(f, ServerMessage::Sync { .. }))
        .await
    else {
        unreachable!()
    };
    assert_eq!(host_user_id, Identity::new("host"));
    assert_eq!(player_state, snapshot);

    let paused = PlayerState::new(song(3), false, 44.0);
    host.send(&ClientMessage::StateUpdate {
        player_state: paused.clone(),
    })
    .await;
    let update = listener
        .recv_until(|f| matches!(f, ServerMessage::Update { .. }))
        .await;
    assert_eq!(
        update,
        ServerMessage::Update {
            host_user_id: Identity::new("host"),
            seq: seq + 1,
            player_state: paused
        }
    );

    host.close().await;
    let gone = listener
        .recv_until(|f| matches!(f, ServerMessage::HostDisconnected { .. }))
        .await;
    assert_eq!(
        gone,
        ServerMessage::HostDisconnected {
            host_user_id: Identity::new("host")
        }
    );
}

#[tokio::test]
async fn test_listen_along_with_offline_host_is_rejected() {
    let server = TestServer::start().await;
    let mut listener = WsPeer::connect(&server, "listener").await;

    listener
        .send(&ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("nobody"),
        })
        .await;

    let ServerMessage::ListenAlongError { code, .. } = listener
        .recv_until(|f| matches!(f, ServerMessage::ListenAlongError { .. }))
        .await
    else {
        unreachable!()
    };
    assert_eq!(code, "HOST_OFFLINE");
}

async fn next_notice(notices: &mut mpsc::Receiver<Notice>, wanted: fn(&Notice) -> bool) -> Notice {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let notice = notices.recv().await.expect("client stopped");
            if wanted(&notice) {
                return notice;
            }
        }
    })
    .await
    .expect("timed out waiting for notice")
}

#[tokio::test]
async fn test_clients_listen_along_end_to_end() {
    let server = TestServer::start().await;

    let (host_cmd, host_rx) = mpsc::channel(8);
    let (host_notice_tx, mut host_notices) = mpsc::channel(64);
    let host = CotuneClient::new(
        ClientOptions::new(server.ws_base(), Identity::new("dj")),
        ClockEngine::new(),
        host_notice_tx,
    );
    let host_task = tokio::spawn(host.run(host_rx));
    host_cmd
        .send(ClientCommand::PlayAlbum {
            songs: vec![song(1), song(2)],
            start_index: 0,
        })
        .await
        .expect("host running");
    server
        .wait_until(|engine| engine.registry.is_online(&Identity::new("dj")))
        .await;

    let (fan_cmd, fan_rx) = mpsc::channel(8);
    let (fan_notice_tx, mut fan_notices) = mpsc::channel(64);
    let fan = CotuneClient::new(
        ClientOptions::new(server.ws_base(), Identity::new("fan")),
        ClockEngine::new(),
        fan_notice_tx,
    );
    let fan_task = tokio::spawn(fan.run(fan_rx));
    fan_cmd
        .send(ClientCommand::ListenAlong(Identity::new("dj")))
        .await
        .expect("fan running");

    let joined = next_notice(&mut host_notices, |n| {
        matches!(n, Notice::ListenerJoined(_))
    })
    .await;
    assert_eq!(joined, Notice::ListenerJoined(Identity::new("fan")));

    host_cmd.send(ClientCommand::Quit).await.expect("host running");
    host_task
        .await
        .expect("host task")
        .expect("host exits cleanly");

    let gone = next_notice(&mut fan_notices, |n| {
        matches!(n, Notice::HostDisconnected(_))
    })
    .await;
    assert_eq!(gone, Notice::HostDisconnected(Identity::new("dj")));

    fan_cmd.send(ClientCommand::Quit).await.expect("fan running");
    fan_task.await.expect("fan task").expect("fan exits cleanly");
}
