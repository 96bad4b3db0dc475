//! Listen-along session manager.
//!
//! A session is keyed by host identity and holds the set of listener
//! connections mirroring that host. Sessions exist only while the host is
//! connected; an empty session is valid and is left in place until the
//! host goes away. A listener connection belongs to at most one session:
//! starting a new listen-along leaves the previous one first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use cotune_core::error::AppError;
use cotune_core::message::ServerMessage;
use cotune_core::types::{ConnectionId, Identity, PlayerState};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::metrics::RealtimeMetrics;

/// Error code when the requested host has no live connection.
pub const HOST_OFFLINE: &str = "HOST_OFFLINE";
/// Error code when a client asks to listen along to itself.
pub const SELF_LISTEN: &str = "SELF_LISTEN";

/// Why a listen-along start was refused.
#[derive(Debug, Clone)]
pub struct StartRejection {
    /// Machine-readable code sent to the requester.
    pub code: &'static str,
    /// Underlying error.
    pub error: AppError,
}

impl StartRejection {
    /// Frame reported back to the requesting connection.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::ListenAlongError {
            code: self.code.to_string(),
            message: self.error.message.clone(),
        }
    }
}

/// What a transport close changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// The identity's mapping pointed at this connection and is now gone.
    pub went_offline: bool,
    /// Listeners told that this connection's host session ended.
    pub listeners_notified: usize,
    /// Hosts this connection had been listening to.
    pub hosts_left: Vec<Identity>,
}

#[derive(Debug, Default)]
struct Session {
    /// Listener connection → listener identity (for display notices).
    listeners: HashMap<ConnectionId, Identity>,
    /// Last ordering stamp handed out for this host.
    seq: u64,
}

impl Session {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// Owns every listen-along session.
///
/// The session table sits behind one lock. Host-liveness checks on start
/// and host teardown on disconnect both run while holding it, so a start
/// can never recreate a session for a host that is concurrently leaving.
#[derive(Debug)]
pub struct ListenAlongManager {
    sessions: Mutex<HashMap<Identity, Session>>,
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<RealtimeMetrics>,
}

impl ListenAlongManager {
    /// Creates an empty session manager over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            registry,
            metrics,
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<Identity, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds `listener` to `host`'s session and asks the host for a snapshot
    /// addressed to this listener only.
    ///
    /// Repeating a start for the same pair keeps a single entry. Any other
    /// session the listener was part of is left first.
    pub fn start(
        &self,
        listener: &ConnectionHandle,
        host: &Identity,
    ) -> Result<(), StartRejection> {
        if listener.identity == *host {
            return Err(StartRejection {
                code: SELF_LISTEN,
                error: AppError::validation("You cannot listen along with yourself."),
            });
        }

        let mut sessions = self.table();

        let Some(host_conn) = self.registry.lookup(host) else {
            debug!(
                conn_id = %listener.id,
                host = %host,
                "Listen-along rejected: host offline"
            );
            return Err(StartRejection {
                code: HOST_OFFLINE,
                error: AppError::peer_offline("Host is not online."),
            });
        };

        for (other_host, session) in sessions.iter_mut() {
            if other_host == host {
                continue;
            }
            if session.listeners.remove(&listener.id).is_some() {
                self.notify_host(
                    other_host,
                    ServerMessage::ListenerLeft {
                        listener_id: listener.identity.clone(),
                    },
                );
                info!(
                    conn_id = %listener.id,
                    host = %other_host,
                    "Listener switched away from previous host"
                );
            }
        }

        sessions
            .entry(host.clone())
            .or_default()
            .listeners
            .insert(listener.id, listener.identity.clone());

        let mut sent = 0;
        if host_conn.send(ServerMessage::ListenerJoined {
            listener_id: listener.identity.clone(),
        }) {
            sent += 1;
        }
        if host_conn.send(ServerMessage::RequestSync {
            listener_id: listener.id,
        }) {
            sent += 1;
        }
        self.metrics.messages_sent(sent);
        self.metrics.session_started();
        self.metrics.sync_requested();

        info!(
            conn_id = %listener.id,
            listener = %listener.identity,
            host = %host,
            "Listener joined listen-along session"
        );
        Ok(())
    }

    /// Relays a host's reply to a `request-sync` to the one listener that
    /// asked. Replies for connections outside the host's session are
    /// dropped.
    pub fn relay_sync(
        &self,
        host: &ConnectionHandle,
        listener_id: ConnectionId,
        player_state: PlayerState,
    ) -> bool {
        let mut sessions = self.table();
        let Some(session) = sessions.get_mut(&host.identity) else {
            debug!(host = %host.identity, "Sync reply without a session, dropping");
            return false;
        };
        if !session.listeners.contains_key(&listener_id) {
            debug!(
                host = %host.identity,
                listener_conn = %listener_id,
                "Sync reply for a non-member, dropping"
            );
            return false;
        }
        let seq = session.next_seq();
        let delivered = self
            .registry
            .get(&listener_id)
            .is_some_and(|conn| {
                conn.send(ServerMessage::Sync {
                    host_user_id: host.identity.clone(),
                    seq,
                    player_state,
                })
            });
        if delivered {
            self.metrics.messages_sent(1);
            self.metrics.state_relayed(1);
        }
        delivered
    }

    /// Fans a host's state out to every listener in its session.
    ///
    /// Returns how many listener connections accepted the frame. A slow or
    /// dead listener only loses its own copy.
    pub fn broadcast_state(&self, host: &ConnectionHandle, player_state: PlayerState) -> usize {
        let mut sessions = self.table();
        let Some(session) = sessions.get_mut(&host.identity) else {
            return 0;
        };
        if session.listeners.is_empty() {
            return 0;
        }
        let seq = session.next_seq();
        let mut delivered = 0;
        for listener_id in session.listeners.keys() {
            if let Some(conn) = self.registry.get(listener_id) {
                if conn.send(ServerMessage::Update {
                    host_user_id: host.identity.clone(),
                    seq,
                    player_state: player_state.clone(),
                }) {
                    delivered += 1;
                }
            }
        }
        self.metrics.messages_sent(delivered as u64);
        self.metrics.state_relayed(delivered as u64);
        delivered
    }

    /// Removes `listener` from `host`'s session and tells the host.
    ///
    /// Stopping a session the listener was never part of changes nothing
    /// and notifies nobody.
    pub fn stop(&self, listener: &ConnectionHandle, host: &Identity) -> bool {
        let mut sessions = self.table();
        let removed = sessions
            .get_mut(host)
            .is_some_and(|session| session.listeners.remove(&listener.id).is_some());
        if removed {
            self.notify_host(
                host,
                ServerMessage::ListenerLeft {
                    listener_id: listener.identity.clone(),
                },
            );
            info!(
                conn_id = %listener.id,
                listener = %listener.identity,
                host = %host,
                "Listener left listen-along session"
            );
        }
        removed
    }

    /// Tears down everything a closing transport was part of.
    ///
    /// If the connection is the identity's current one, the identity goes
    /// offline and its host session is destroyed after telling every
    /// listener. Independently, the connection is removed from every
    /// session it was listening to and each of those hosts is told.
    pub fn disconnect(&self, conn: &ConnectionHandle) -> DisconnectOutcome {
        let mut sessions = self.table();
        let mut outcome = DisconnectOutcome {
            went_offline: self.registry.unregister(&conn.identity, &conn.id),
            ..DisconnectOutcome::default()
        };

        if outcome.went_offline {
            if let Some(session) = sessions.remove(&conn.identity) {
                for listener_id in session.listeners.keys() {
                    if let Some(listener) = self.registry.get(listener_id) {
                        if listener.send(ServerMessage::HostDisconnected {
                            host_user_id: conn.identity.clone(),
                        }) {
                            outcome.listeners_notified += 1;
                        }
                    }
                }
                self.metrics.messages_sent(outcome.listeners_notified as u64);
                self.metrics.host_torn_down();
                info!(
                    host = %conn.identity,
                    listeners = session.listeners.len(),
                    "Host disconnected, listen-along session destroyed"
                );
            }
        }

        // Listener membership is indexed by host, so this is a scan.
        for (host, session) in sessions.iter_mut() {
            if session.listeners.remove(&conn.id).is_some() {
                outcome.hosts_left.push(host.clone());
            }
        }
        for host in &outcome.hosts_left {
            self.notify_host(
                host,
                ServerMessage::ListenerLeft {
                    listener_id: conn.identity.clone(),
                },
            );
        }

        self.registry.detach(&conn.id);
        outcome
    }

    /// Listener connections currently in `host`'s session.
    pub fn listeners_of(&self, host: &Identity) -> Vec<ConnectionId> {
        self.table()
            .get(host)
            .map(|session| session.listeners.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Hosts whose sessions contain `conn_id`.
    pub fn hosts_followed_by(&self, conn_id: &ConnectionId) -> Vec<Identity> {
        self.table()
            .iter()
            .filter(|(_, session)| session.listeners.contains_key(conn_id))
            .map(|(host, _)| host.clone())
            .collect()
    }

    /// Whether a session exists for `host`.
    pub fn has_session(&self, host: &Identity) -> bool {
        self.table().contains_key(host)
    }

    /// Number of live sessions, empty ones included.
    pub fn session_count(&self) -> usize {
        self.table().len()
    }

    fn notify_host(&self, host: &Identity, msg: ServerMessage) {
        if let Some(host_conn) = self.registry.lookup(host) {
            if host_conn.send(msg) {
                self.metrics.messages_sent(1);
            }
        }
    }
}
