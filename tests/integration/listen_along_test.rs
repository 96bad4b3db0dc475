//! Listen-along scenarios through the engine, with real players on both ends.

use std::time::Duration;

use cotune_core::config::RealtimeConfig;
use cotune_core::message::{ClientMessage, ServerMessage};
use cotune_core::types::{Identity, PlayerState};
use cotune_player::{Notice, PlaybackEngine, PlayerStatus};
use cotune_realtime::RealtimeEngine;

use crate::helpers::{EnginePeer, PlayerPeer, pump, song};

fn engine() -> RealtimeEngine {
    RealtimeEngine::new(RealtimeConfig::default())
}

#[tokio::test(start_paused = true)]
async fn test_join_gets_targeted_sync_then_follows_pause() {
    let engine = engine();
    let mut host = PlayerPeer::connect(&engine, "host");
    let mut listener = PlayerPeer::connect(&engine, "listener");
    pump(&engine, &mut [&mut host, &mut listener]);

    let reaction = host.player.play_album(vec![song(1), song(2)], 0);
    host.send(&engine, reaction);
    pump(&engine, &mut [&mut host, &mut listener]);

    let reaction = listener
        .player
        .start_listening_along(Identity::new("host"))
        .expect("start");
    listener.send(&engine, reaction);
    let seen = pump(&engine, &mut [&mut host, &mut listener]);

    let initial = seen[1]
        .iter()
        .find_map(|frame| match frame {
            ServerMessage::Sync { player_state, .. } => Some(player_state.clone()),
            _ => None,
        })
        .expect("listener got a targeted sync");
    assert_eq!(initial.song.id, "song-1");
    assert!(initial.is_playing);
    assert!(initial.current_time < 0.01);
    assert!(
        !seen[1]
            .iter()
            .any(|frame| matches!(frame, ServerMessage::Update { .. }))
    );
    assert!(host.player.listeners().contains(&Identity::new("listener")));

    tokio::time::advance(Duration::from_secs(5)).await;
    let reaction = host.player.toggle_play();
    host.send(&engine, reaction);
    pump(&engine, &mut [&mut host, &mut listener]);

    assert!(!listener.player.engine().is_playing());
    assert!((listener.player.engine().position() - 5.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_song_change_and_heartbeat_reach_listener() {
    let engine = engine();
    let mut host = PlayerPeer::connect(&engine, "host");
    let mut listener = PlayerPeer::connect(&engine, "listener");

    let reaction = host.player.play_album(vec![song(1), song(2)], 0);
    host.send(&engine, reaction);
    let reaction = listener
        .player
        .start_listening_along(Identity::new("host"))
        .expect("start");
    listener.send(&engine, reaction);
    pump(&engine, &mut [&mut host, &mut listener]);

    tokio::time::advance(Duration::from_secs(1)).await;
    let reaction = host.player.tick();
    host.send(&engine, reaction);
    let seen = pump(&engine, &mut [&mut host, &mut listener]);
    assert!(
        seen[1]
            .iter()
            .any(|frame| matches!(frame, ServerMessage::Update { .. }))
    );

    let reaction = host.player.play_next();
    host.send(&engine, reaction);
    pump(&engine, &mut [&mut host, &mut listener]);

    assert_eq!(
        listener.player.current_song().map(|t| t.id.as_str()),
        Some("song-2")
    );
}

#[tokio::test(start_paused = true)]
async fn test_host_disconnect_tears_down_for_every_listener() {
    let engine = engine();
    let mut host = PlayerPeer::connect(&engine, "host");
    let mut first = PlayerPeer::connect(&engine, "first");
    let mut second = PlayerPeer::connect(&engine, "second");

    let reaction = host.player.play_album(vec![song(1)], 0);
    host.send(&engine, reaction);
    for listener in [&first, &second] {
        listener.peer.send(
            &engine,
            &ClientMessage::ListenAlongStart {
                host_user_id: Identity::new("host"),
            },
        );
    }
    for listener in [&mut first, &mut second] {
        listener
            .player
            .start_listening_along(Identity::new("host"))
            .expect("start");
    }
    pump(&engine, &mut [&mut host, &mut first, &mut second]);
    assert_eq!(engine.sessions.listeners_of(&Identity::new("host")).len(), 2);

    host.peer.disconnect(&engine);
    let seen = pump(&engine, &mut [&mut first, &mut second]);

    for (frames, peer) in seen.iter().zip([&first, &second]) {
        assert!(frames.contains(&ServerMessage::HostDisconnected {
            host_user_id: Identity::new("host")
        }));
        assert_eq!(peer.player.status(), PlayerStatus::Idle);
    }
    assert!(!engine.sessions.has_session(&Identity::new("host")));

    // A restart against the same id re-validates liveness.
    first.peer.send(
        &engine,
        &ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("host"),
        },
    );
    let frames = first.peer.drain();
    assert!(matches!(
        frames.as_slice(),
        [ServerMessage::ListenAlongError { code, .. }] if code == "HOST_OFFLINE"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_request_sync_goes_only_to_the_joiner() {
    let engine = engine();
    let mut host = PlayerPeer::connect(&engine, "host");
    let mut early = PlayerPeer::connect(&engine, "early");
    let mut late = PlayerPeer::connect(&engine, "late");

    let reaction = host.player.play_album(vec![song(1)], 0);
    host.send(&engine, reaction);
    let reaction = early
        .player
        .start_listening_along(Identity::new("host"))
        .expect("start");
    early.send(&engine, reaction);
    pump(&engine, &mut [&mut host, &mut early, &mut late]);

    let reaction = late
        .player
        .start_listening_along(Identity::new("host"))
        .expect("start");
    late.send(&engine, reaction);
    let seen = pump(&engine, &mut [&mut host, &mut early, &mut late]);

    let is_sync = |frame: &ServerMessage| matches!(frame, ServerMessage::Sync { .. });
    assert!(!seen[1].iter().any(is_sync));
    assert_eq!(seen[2].iter().filter(|f| is_sync(f)).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_switching_hosts_leaves_the_first() {
    let engine = engine();
    let mut alice = EnginePeer::connect(&engine, "alice");
    let mut bob = EnginePeer::connect(&engine, "bob");
    let listener = EnginePeer::connect(&engine, "listener");

    listener.send(
        &engine,
        &ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("alice"),
        },
    );
    alice.drain();
    listener.send(
        &engine,
        &ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("bob"),
        },
    );

    assert!(alice.drain().contains(&ServerMessage::ListenerLeft {
        listener_id: Identity::new("listener")
    }));
    assert!(bob.drain().contains(&ServerMessage::ListenerJoined {
        listener_id: Identity::new("listener")
    }));
    assert!(engine.sessions.listeners_of(&Identity::new("alice")).is_empty());
    assert_eq!(
        engine.sessions.hosts_followed_by(&listener.handle.id),
        vec![Identity::new("bob")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_listener_disconnect_notifies_host() {
    let engine = engine();
    let mut host = EnginePeer::connect(&engine, "host");
    let listener = EnginePeer::connect(&engine, "listener");
    let bystander = EnginePeer::connect(&engine, "bystander");

    listener.send(
        &engine,
        &ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("host"),
        },
    );
    host.drain();

    bystander.disconnect(&engine);
    assert!(
        !host
            .drain()
            .iter()
            .any(|f| matches!(f, ServerMessage::ListenerLeft { .. }))
    );

    listener.disconnect(&engine);
    assert!(host.drain().contains(&ServerMessage::ListenerLeft {
        listener_id: Identity::new("listener")
    }));
    assert!(engine.sessions.listeners_of(&Identity::new("host")).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let engine = engine();
    let mut host = EnginePeer::connect(&engine, "host");
    let listener = EnginePeer::connect(&engine, "listener");
    let stop = ClientMessage::ListenAlongStop {
        host_user_id: Identity::new("host"),
    };

    listener.send(&engine, &stop);
    assert!(
        !host
            .drain()
            .iter()
            .any(|f| matches!(f, ServerMessage::ListenerLeft { .. }))
    );

    listener.send(
        &engine,
        &ClientMessage::ListenAlongStart {
            host_user_id: Identity::new("host"),
        },
    );
    listener.send(&engine, &stop);
    listener.send(&engine, &stop);
    let left = host
        .drain()
        .into_iter()
        .filter(|f| matches!(f, ServerMessage::ListenerLeft { .. }))
        .count();
    assert_eq!(left, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_update_is_ignored_by_listener() {
    let engine = engine();
    let mut listener = PlayerPeer::connect(&engine, "listener");
    listener
        .player
        .start_listening_along(Identity::new("host"))
        .expect("start");

    let fresh = PlayerState::new(song(1), false, 30.0);
    let stale = PlayerState::new(song(1), true, 20.0);
    listener.player.handle_server(ServerMessage::Update {
        host_user_id: Identity::new("host"),
        seq: 4,
        player_state: fresh,
    });
    let reaction = listener.player.handle_server(ServerMessage::Update {
        host_user_id: Identity::new("host"),
        seq: 3,
        player_state: stale,
    });

    assert!(reaction.notices.is_empty());
    assert!(!listener.player.engine().is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_host_disconnect_notice_names_host() {
    let engine = engine();
    let mut host = PlayerPeer::connect(&engine, "dj");
    let mut listener = PlayerPeer::connect(&engine, "fan");

    let reaction = host.player.play_album(vec![song(1)], 0);
    host.send(&engine, reaction);
    let reaction = listener
        .player
        .start_listening_along(Identity::new("dj"))
        .expect("start");
    listener.send(&engine, reaction);
    pump(&engine, &mut [&mut host, &mut listener]);

    host.peer.disconnect(&engine);
    let frames = listener.peer.drain();
    let notices: Vec<Notice> = frames
        .into_iter()
        .flat_map(|frame| listener.player.handle_server(frame).notices)
        .collect();

    assert!(notices.contains(&Notice::HostDisconnected(Identity::new("dj"))));
}

#[tokio::test(start_paused = true)]
async fn test_switch_with_frame_in_flight_follows_new_host() {
    let engine = engine();
    let mut first = PlayerPeer::connect(&engine, "first");
    let mut second = PlayerPeer::connect(&engine, "second");
    let mut listener = PlayerPeer::connect(&engine, "listener");

    let reaction = first.player.play_album(vec![song(1)], 0);
    first.send(&engine, reaction);
    let reaction = second.player.play_album(vec![song(2)], 0);
    second.send(&engine, reaction);
    let reaction = listener
        .player
        .start_listening_along(Identity::new("first"))
        .expect("start");
    listener.send(&engine, reaction);
    pump(&engine, &mut [&mut first, &mut second, &mut listener]);

    // Push the first host's sequence well ahead of a fresh session.
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(1)).await;
        let reaction = first.player.tick();
        first.send(&engine, reaction);
    }
    pump(&engine, &mut [&mut first, &mut second, &mut listener]);

    // One more heartbeat is queued for the listener when it switches.
    tokio::time::advance(Duration::from_secs(1)).await;
    let reaction = first.player.tick();
    first.send(&engine, reaction);
    let reaction = listener
        .player
        .start_listening_along(Identity::new("second"))
        .expect("switch");
    listener.send(&engine, reaction);
    pump(&engine, &mut [&mut first, &mut second, &mut listener]);

    assert_eq!(
        listener.player.current_song().map(|t| t.id.as_str()),
        Some("song-2")
    );
    assert!(!first.player.listeners().contains(&Identity::new("listener")));
    assert!(second.player.listeners().contains(&Identity::new("listener")));
}
