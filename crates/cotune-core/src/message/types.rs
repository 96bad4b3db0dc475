//! Client → server and server → client message definitions.
//!
//! Frames are JSON objects tagged by `type`, using the event names the web
//! client already speaks (`listen-along:start`, `player:state-update`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, Identity, MessageId, PlayerState};

/// Messages sent by a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Presence announce; re-registers this connection and resets activity.
    #[serde(rename = "user_connected")]
    UserConnected {
        /// Announced identity. The handshake identity wins on mismatch.
        user_id: Identity,
    },
    /// "Now playing" change.
    #[serde(rename = "update_activity")]
    UpdateActivity {
        /// Owner of the activity. The handshake identity wins on mismatch.
        #[serde(default)]
        user_id: Option<Identity>,
        /// Display text, not interpreted by the server.
        activity: String,
    },
    /// Point-to-point text message.
    #[serde(rename = "send_message")]
    SendMessage {
        /// Recipient identity.
        receiver_id: Identity,
        /// Message body.
        content: String,
    },
    /// Begin mirroring a host.
    #[serde(rename = "listen-along:start")]
    ListenAlongStart {
        /// Host to follow.
        host_user_id: Identity,
    },
    /// Host reply to a targeted `request-sync`.
    #[serde(rename = "listen-along:sync-state")]
    SyncState {
        /// Connection that asked for the snapshot.
        listener_id: ConnectionId,
        /// Host snapshot.
        player_state: PlayerState,
    },
    /// Host state change or heartbeat, fanned out to its listeners.
    #[serde(rename = "player:state-update")]
    StateUpdate {
        /// Host snapshot.
        player_state: PlayerState,
    },
    /// Stop mirroring a host.
    #[serde(rename = "listen-along:stop")]
    ListenAlongStop {
        /// Host being left.
        host_user_id: Identity,
    },
    /// Keepalive reply.
    #[serde(rename = "pong")]
    Pong {
        /// Echoed server timestamp.
        timestamp: i64,
    },
}

/// Messages sent by the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Identities currently online, sent once on connect.
    #[serde(rename = "users_online")]
    UsersOnline {
        /// Online identities.
        users: Vec<Identity>,
    },
    /// Activity snapshot, sent once on connect.
    #[serde(rename = "activities")]
    Activities {
        /// `(identity, descriptor)` pairs.
        activities: Vec<(Identity, String)>,
    },
    /// A user came online.
    #[serde(rename = "user_connected")]
    UserConnected {
        /// Identity that connected.
        user_id: Identity,
    },
    /// A user went offline.
    #[serde(rename = "user_disconnected")]
    UserDisconnected {
        /// Identity that disconnected.
        user_id: Identity,
    },
    /// Someone's activity changed.
    #[serde(rename = "activity_updated")]
    ActivityUpdated {
        /// Owner of the activity.
        user_id: Identity,
        /// New descriptor.
        activity: String,
    },
    /// Inbound direct message.
    #[serde(rename = "receive_message")]
    ReceiveMessage {
        /// Message relayed from the sender.
        message: DirectMessage,
    },
    /// Echo of a direct message back to its sender.
    #[serde(rename = "message_sent")]
    MessageSent {
        /// The message as relayed.
        message: DirectMessage,
    },
    /// A listen-along request was rejected.
    #[serde(rename = "listen-along:error")]
    ListenAlongError {
        /// Machine-readable code.
        code: String,
        /// User-facing text.
        message: String,
    },
    /// Sent to a host when a listener joins.
    #[serde(rename = "listen-along:listener-joined")]
    ListenerJoined {
        /// Listener identity for display.
        listener_id: Identity,
    },
    /// Sent to a host when a listener leaves.
    #[serde(rename = "listen-along:listener-left")]
    ListenerLeft {
        /// Listener identity for display.
        listener_id: Identity,
    },
    /// Asks a host for a snapshot addressed to one listener connection.
    #[serde(rename = "listen-along:request-sync")]
    RequestSync {
        /// Connection to address the reply to.
        listener_id: ConnectionId,
    },
    /// Targeted initial state. Applied unconditionally.
    #[serde(rename = "listen-along:sync")]
    Sync {
        /// Host whose session stamped `seq`.
        host_user_id: Identity,
        /// Per-session ordering stamp.
        seq: u64,
        /// Host snapshot.
        player_state: PlayerState,
    },
    /// Broadcast state change or heartbeat.
    #[serde(rename = "listen-along:update")]
    Update {
        /// Host whose session stamped `seq`.
        host_user_id: Identity,
        /// Per-session ordering stamp.
        seq: u64,
        /// Host snapshot.
        player_state: PlayerState,
    },
    /// The followed host went away; the session no longer exists.
    #[serde(rename = "listen-along:host-disconnected")]
    HostDisconnected {
        /// Host that disconnected.
        host_user_id: Identity,
    },
    /// Server keepalive.
    #[serde(rename = "ping")]
    Ping {
        /// Server timestamp (unix millis).
        timestamp: i64,
    },
    /// Generic protocol error.
    #[serde(rename = "error")]
    Error {
        /// Machine-readable code.
        code: String,
        /// Description.
        message: String,
    },
}

impl ServerMessage {
    /// Build a generic error frame.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UsersOnline { .. } => "users_online",
            Self::Activities { .. } => "activities",
            Self::UserConnected { .. } => "user_connected",
            Self::UserDisconnected { .. } => "user_disconnected",
            Self::ActivityUpdated { .. } => "activity_updated",
            Self::ReceiveMessage { .. } => "receive_message",
            Self::MessageSent { .. } => "message_sent",
            Self::ListenAlongError { .. } => "listen-along:error",
            Self::ListenerJoined { .. } => "listen-along:listener-joined",
            Self::ListenerLeft { .. } => "listen-along:listener-left",
            Self::RequestSync { .. } => "listen-along:request-sync",
            Self::Sync { .. } => "listen-along:sync",
            Self::Update { .. } => "listen-along:update",
            Self::HostDisconnected { .. } => "listen-along:host-disconnected",
            Self::Ping { .. } => "ping",
            Self::Error { .. } => "error",
        }
    }
}

/// A relayed one-to-one chat message. Not persisted by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    /// Message ID.
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Sender identity.
    pub sender_id: Identity,
    /// Recipient identity.
    pub receiver_id: Identity,
    /// Body.
    pub content: String,
    /// When the server relayed it.
    pub created_at: DateTime<Utc>,
}

impl DirectMessage {
    /// Stamp a new message.
    pub fn new(sender_id: Identity, receiver_id: Identity, content: String) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            receiver_id,
            content,
            created_at: Utc::now(),
        }
    }
}
