//! Presence and activity behavior across connects and reconnects.

use cotune_core::config::RealtimeConfig;
use cotune_core::message::{ClientMessage, ServerMessage};
use cotune_core::types::Identity;
use cotune_realtime::RealtimeEngine;

use crate::helpers::EnginePeer;

#[tokio::test]
async fn test_superseded_connection_does_not_take_user_offline() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let mut watcher = EnginePeer::connect(&engine, "watcher");
    let old = EnginePeer::connect(&engine, "alice");
    let new = EnginePeer::connect(&engine, "alice");
    watcher.drain();

    old.disconnect(&engine);

    assert!(engine.registry.is_online(&Identity::new("alice")));
    assert!(
        !watcher
            .drain()
            .iter()
            .any(|f| matches!(f, ServerMessage::UserDisconnected { .. }))
    );

    new.disconnect(&engine);
    assert!(!engine.registry.is_online(&Identity::new("alice")));
    assert!(watcher.drain().contains(&ServerMessage::UserDisconnected {
        user_id: Identity::new("alice")
    }));
}

#[tokio::test]
async fn test_new_connection_sees_presence_snapshot() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let alice = EnginePeer::connect(&engine, "alice");
    alice.send(
        &engine,
        &ClientMessage::UpdateActivity {
            user_id: None,
            activity: "Playing Hurt by Johnny Cash".into(),
        },
    );

    let mut bob = EnginePeer::connect(&engine, "bob");
    let frames = bob.drain();

    let users = frames
        .iter()
        .find_map(|frame| match frame {
            ServerMessage::UsersOnline { users } => Some(users.clone()),
            _ => None,
        })
        .expect("users_online snapshot");
    assert!(users.contains(&Identity::new("alice")));
    assert!(users.contains(&Identity::new("bob")));
    assert!(frames.contains(&ServerMessage::Activities {
        activities: vec![(
            Identity::new("alice"),
            "Playing Hurt by Johnny Cash".to_string()
        )]
    }));
}

#[tokio::test]
async fn test_activity_update_is_broadcast_and_cleared_on_disconnect() {
    let engine = RealtimeEngine::new(RealtimeConfig::default());
    let mut watcher = EnginePeer::connect(&engine, "watcher");
    let alice = EnginePeer::connect(&engine, "alice");
    watcher.drain();

    alice.send(
        &engine,
        &ClientMessage::UpdateActivity {
            user_id: None,
            activity: "Idle".into(),
        },
    );
    assert!(watcher.drain().contains(&ServerMessage::ActivityUpdated {
        user_id: Identity::new("alice"),
        activity: "Idle".into(),
    }));

    alice.disconnect(&engine);
    assert!(engine.activities.get(&Identity::new("alice")).is_none());
}
