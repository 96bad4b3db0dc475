//! Host role: turn local engine activity into state broadcasts.

use std::time::Duration;

use tokio::time::Instant;

use cotune_core::message::ClientMessage;
use cotune_core::types::{ConnectionId, PlayerState};

use crate::engine::EngineEvent;

/// Decides when the host's state goes out.
///
/// `play`, `pause` and `ended` broadcast immediately. Position reports are
/// throttled to one heartbeat per interval, and only while playing.
#[derive(Debug)]
pub struct HostBroadcaster {
    heartbeat_interval: Duration,
    last_heartbeat: Option<Instant>,
}

impl HostBroadcaster {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            heartbeat_interval,
            last_heartbeat: None,
        }
    }

    /// Maps an engine event to an outbound `player:state-update`, if any.
    ///
    /// `snapshot` is the host's state after the event; `None` means nothing
    /// is loaded and there is nothing to share.
    pub fn on_engine_event(
        &mut self,
        event: EngineEvent,
        snapshot: Option<PlayerState>,
    ) -> Option<ClientMessage> {
        let player_state = snapshot?;
        match event {
            EngineEvent::Play | EngineEvent::Pause | EngineEvent::Ended => {
                Some(ClientMessage::StateUpdate { player_state })
            }
            EngineEvent::TimeUpdate(_) => {
                if !player_state.is_playing || !self.heartbeat_due() {
                    return None;
                }
                self.last_heartbeat = Some(Instant::now());
                Some(ClientMessage::StateUpdate { player_state })
            }
        }
    }

    /// Answers a `request-sync` once, addressed to the asking connection.
    pub fn reply_to_request(
        &self,
        listener_id: ConnectionId,
        snapshot: Option<PlayerState>,
    ) -> Option<ClientMessage> {
        snapshot.map(|player_state| ClientMessage::SyncState {
            listener_id,
            player_state,
        })
    }

    /// Forgets the throttle window, e.g. when the host role is re-entered.
    pub fn reset(&mut self) {
        self.last_heartbeat = None;
    }

    fn heartbeat_due(&self) -> bool {
        self.last_heartbeat
            .is_none_or(|at| at.elapsed() >= self.heartbeat_interval)
    }
}
