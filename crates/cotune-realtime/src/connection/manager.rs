//! Connection manager: connection lifecycle and inbound frame routing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cotune_core::config::RealtimeConfig;
use cotune_core::message::validator::validate_inbound;
use cotune_core::message::{ClientMessage, DirectMessage, ServerMessage, serializer};
use cotune_core::types::{ConnectionId, Identity};

use crate::metrics::RealtimeMetrics;
use crate::presence::activity::ActivityDirectory;
use crate::session::manager::ListenAlongManager;

use super::handle::ConnectionHandle;
use super::registry::ConnectionRegistry;

/// Error code for frames that are not valid JSON protocol messages.
pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";

/// Manages all live connections and routes their frames.
///
/// Frames from one connection are handled in arrival order by that
/// connection's socket task; every handler runs to completion without
/// awaiting, so no handler ever blocks another connection.
#[derive(Debug)]
pub struct ConnectionManager {
    registry: Arc<ConnectionRegistry>,
    activities: Arc<ActivityDirectory>,
    sessions: Arc<ListenAlongManager>,
    metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        registry: Arc<ConnectionRegistry>,
        activities: Arc<ActivityDirectory>,
        sessions: Arc<ListenAlongManager>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            registry,
            activities,
            sessions,
            metrics,
            config,
        }
    }

    /// Opens a connection for an authenticated identity.
    ///
    /// The identity is registered (superseding any earlier connection),
    /// every peer learns it is online, and the new connection receives the
    /// online set and the activity snapshot. Returns the handle and the
    /// receiver the socket writer drains.
    pub fn connect(
        &self,
        identity: Identity,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(identity.clone(), tx));

        self.registry.attach(handle.clone());
        self.register_identity(&handle);
        self.metrics.connection_opened();

        self.send(
            &handle,
            ServerMessage::UsersOnline {
                users: self.registry.online_set(),
            },
        );
        self.send(
            &handle,
            ServerMessage::Activities {
                activities: self.activities.snapshot(),
            },
        );

        info!(
            conn_id = %handle.id,
            user_id = %identity,
            "WebSocket connection registered"
        );

        (handle, rx)
    }

    /// Closes a connection and runs every teardown path it is part of.
    pub fn disconnect(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.registry.get(conn_id) else {
            return;
        };
        handle.mark_dead();

        let outcome = self.sessions.disconnect(&handle);
        if outcome.went_offline {
            self.activities.remove(&handle.identity);
            self.broadcast_all(&ServerMessage::UserDisconnected {
                user_id: handle.identity.clone(),
            });
        }
        self.metrics.connection_closed();

        info!(
            conn_id = %conn_id,
            user_id = %handle.identity,
            went_offline = outcome.went_offline,
            listeners_notified = outcome.listeners_notified,
            hosts_left = outcome.hosts_left.len(),
            "WebSocket connection unregistered"
        );
    }

    /// Processes an inbound frame from a client.
    pub fn handle_inbound(&self, conn_id: &ConnectionId, raw_message: &str) {
        let Some(handle) = self.registry.get(conn_id) else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };
        self.metrics.message_received();

        if let Err((code, err)) = validate_inbound(raw_message, self.config.max_message_bytes) {
            self.send(&handle, ServerMessage::error(code, err.message));
            return;
        }

        let msg = match serializer::deserialize_inbound(raw_message) {
            Ok(m) => m,
            Err(e) => {
                self.send(
                    &handle,
                    ServerMessage::error(INVALID_MESSAGE, format!("Failed to parse message: {e}")),
                );
                return;
            }
        };

        self.dispatch(&handle, msg);
    }

    /// Routes a parsed frame.
    pub fn dispatch(&self, handle: &Arc<ConnectionHandle>, msg: ClientMessage) {
        match msg {
            ClientMessage::UserConnected { user_id } => {
                self.warn_on_identity_mismatch(handle, &user_id);
                self.register_identity(handle);
                let update = self.activities.set_idle(handle.identity.clone());
                self.broadcast_all(&update);
            }
            ClientMessage::UpdateActivity { user_id, activity } => {
                if let Some(user_id) = &user_id {
                    self.warn_on_identity_mismatch(handle, user_id);
                }
                let update = self.activities.set_activity(handle.identity.clone(), activity);
                self.broadcast_all(&update);
            }
            ClientMessage::SendMessage {
                receiver_id,
                content,
            } => {
                self.relay_direct_message(handle, receiver_id, content);
            }
            ClientMessage::ListenAlongStart { host_user_id } => {
                if let Err(rejection) = self.sessions.start(handle, &host_user_id) {
                    self.send(handle, rejection.to_message());
                }
            }
            ClientMessage::SyncState {
                listener_id,
                player_state,
            } => {
                self.sessions.relay_sync(handle, listener_id, player_state);
            }
            ClientMessage::StateUpdate { player_state } => {
                let delivered = self.sessions.broadcast_state(handle, player_state);
                debug!(conn_id = %handle.id, delivered, "Host state fanned out");
            }
            ClientMessage::ListenAlongStop { host_user_id } => {
                self.sessions.stop(handle, &host_user_id);
            }
            ClientMessage::Pong { .. } => {
                handle.record_pong();
            }
        }
    }

    fn register_identity(&self, handle: &Arc<ConnectionHandle>) {
        if let Some(previous) = self.registry.register(handle.clone()) {
            info!(
                user_id = %handle.identity,
                previous_conn = %previous.id,
                conn_id = %handle.id,
                "Identity re-registered, earlier connection superseded"
            );
        }
        self.broadcast_all(&ServerMessage::UserConnected {
            user_id: handle.identity.clone(),
        });
    }

    fn warn_on_identity_mismatch(&self, handle: &ConnectionHandle, claimed: &Identity) {
        if *claimed != handle.identity {
            warn!(
                conn_id = %handle.id,
                user_id = %handle.identity,
                claimed = %claimed,
                "Frame claims a different identity, using the handshake identity"
            );
        }
    }

    fn relay_direct_message(&self, sender: &ConnectionHandle, receiver_id: Identity, content: String) {
        let message = DirectMessage::new(sender.identity.clone(), receiver_id, content);
        if let Some(receiver) = self.registry.lookup(&message.receiver_id) {
            self.send(
                &receiver,
                ServerMessage::ReceiveMessage {
                    message: message.clone(),
                },
            );
        } else {
            debug!(receiver = %message.receiver_id, "Direct message recipient offline");
        }
        self.send(sender, ServerMessage::MessageSent { message });
    }

    /// Sends a frame to every open transport.
    pub fn broadcast_all(&self, message: &ServerMessage) {
        let all = self.registry.all_connections();
        let sent = all.iter().filter(|conn| conn.send(message.clone())).count();
        self.metrics.messages_sent(sent as u64);
    }

    fn send(&self, conn: &ConnectionHandle, message: ServerMessage) -> bool {
        let sent = conn.send(message);
        if sent {
            self.metrics.messages_sent(1);
        }
        sent
    }

    /// Marks every connection dead so socket tasks wind down.
    pub fn close_all(&self) {
        let all = self.registry.all_connections();
        for conn in &all {
            conn.mark_dead();
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total number of open transports.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Returns the number of online identities.
    pub fn online_count(&self) -> usize {
        self.registry.online_count()
    }

    /// Returns the realtime configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
