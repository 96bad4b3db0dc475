//! Client player state machine.
//!
//! [`Player`] owns the queue and the playback engine, and decides which
//! role the client is in:
//!
//! - autonomous: local controls drive the engine and every state change is
//!   broadcast to whoever is listening along
//! - listening: a host drives the engine, local controls are no-ops
//!
//! Every operation returns a [`Reaction`]: the frames to send and the
//! notices to show. The player itself never touches the network.

use std::collections::BTreeSet;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use cotune_core::config::SyncConfig;
use cotune_core::message::{ClientMessage, DirectMessage, ServerMessage};
use cotune_core::types::{ActivityDescriptor, Identity, PlayerState, Track};
use cotune_core::{AppError, AppResult};

use crate::engine::{EngineEvent, PlaybackEngine};
use crate::sync::{HostBroadcaster, ListenerSync, SyncOutcome};

/// Observable player state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Nothing loaded.
    Idle,
    Playing,
    Paused,
    /// Mirroring a host.
    Listening { host: Identity },
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ListenerJoined(Identity),
    ListenerLeft(Identity),
    /// The followed host went offline and listening stopped.
    HostDisconnected(Identity),
    ListenAlongRejected { code: String, message: String },
    DirectMessage(DirectMessage),
    ServerError { code: String, message: String },
}

/// Output of one player operation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reaction {
    /// Frames to send to the server, in order.
    pub outbound: Vec<ClientMessage>,
    pub notices: Vec<Notice>,
}

impl Reaction {
    fn send(message: ClientMessage) -> Self {
        Self {
            outbound: vec![message],
            notices: Vec::new(),
        }
    }
}

/// Attached engine observer. Dropping it detaches from the engine.
#[derive(Debug)]
struct EngineSubscription {
    rx: broadcast::Receiver<EngineEvent>,
}

impl EngineSubscription {
    fn attach<E: PlaybackEngine + ?Sized>(engine: &E) -> Self {
        Self {
            rx: engine.subscribe(),
        }
    }

    fn drain(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Engine events dropped, observer lagging");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        events
    }
}

#[derive(Debug)]
enum Role {
    Autonomous { subscription: EngineSubscription },
    Listening { sync: ListenerSync },
}

/// The client player.
#[derive(Debug)]
pub struct Player<E: PlaybackEngine> {
    identity: Identity,
    engine: E,
    queue: Vec<Track>,
    current_index: Option<usize>,
    /// Identities listening along to this client, for display.
    listeners: BTreeSet<Identity>,
    role: Role,
    broadcaster: HostBroadcaster,
    drift_tolerance: f64,
}

impl<E: PlaybackEngine> Player<E> {
    pub fn new(identity: Identity, engine: E, sync: &SyncConfig) -> Self {
        let subscription = EngineSubscription::attach(&engine);
        Self {
            identity,
            engine,
            queue: Vec::new(),
            current_index: None,
            listeners: BTreeSet::new(),
            role: Role::Autonomous { subscription },
            broadcaster: HostBroadcaster::new(sync.heartbeat_interval()),
            drift_tolerance: sync.drift_tolerance_seconds,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn status(&self) -> PlayerStatus {
        match &self.role {
            Role::Listening { sync } => PlayerStatus::Listening {
                host: sync.host().clone(),
            },
            Role::Autonomous { .. } => match self.engine.current() {
                None => PlayerStatus::Idle,
                Some(_) if self.engine.is_playing() => PlayerStatus::Playing,
                Some(_) => PlayerStatus::Paused,
            },
        }
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_song(&self) -> Option<&Track> {
        self.engine.current()
    }

    pub fn listeners(&self) -> &BTreeSet<Identity> {
        &self.listeners
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.role, Role::Listening { .. })
    }

    /// Host currently being mirrored.
    pub fn listening_to(&self) -> Option<&Identity> {
        match &self.role {
            Role::Listening { sync } => Some(sync.host()),
            Role::Autonomous { .. } => None,
        }
    }

    /// Current state as it would be sent to listeners.
    pub fn snapshot(&self) -> Option<PlayerState> {
        self.engine.current().map(|song| {
            PlayerState::new(song.clone(), self.engine.is_playing(), self.engine.position())
        })
    }

    /// Presence announce sent after every (re)connect.
    pub fn announce(&self) -> ClientMessage {
        ClientMessage::UserConnected {
            user_id: self.identity.clone(),
        }
    }

    /// Sets the queue without starting playback. The first track is loaded
    /// when nothing is loaded yet.
    pub fn initialize_queue(&mut self, songs: Vec<Track>) -> Reaction {
        if self.is_listening() {
            return Reaction::default();
        }
        if self.engine.current().is_none() {
            if let Some(first) = songs.first() {
                self.engine.load(first.clone());
            }
        }
        if self.current_index.is_none() && !songs.is_empty() {
            self.current_index = Some(0);
        }
        self.queue = songs;
        self.settle(Reaction::default())
    }

    /// Replaces the queue and starts playing at `start_index`.
    pub fn play_album(&mut self, songs: Vec<Track>, start_index: usize) -> Reaction {
        if self.is_listening() {
            return Reaction::default();
        }
        let Some(song) = songs.get(start_index).cloned() else {
            return Reaction::default();
        };
        self.queue = songs;
        self.current_index = Some(start_index);

        let mut reaction = Reaction::default();
        self.switch_to(song, &mut reaction);
        self.settle(reaction)
    }

    /// Starts playing `song`, keeping the queue position in step when the
    /// song is part of the queue.
    pub fn set_current_song(&mut self, song: Track) -> Reaction {
        if self.is_listening() {
            return Reaction::default();
        }
        let mut reaction = Reaction::default();
        self.select(song, &mut reaction);
        self.settle(reaction)
    }

    pub fn toggle_play(&mut self) -> Reaction {
        if self.is_listening() {
            return Reaction::default();
        }
        let Some(song) = self.engine.current().cloned() else {
            return Reaction::default();
        };

        let mut reaction = Reaction::default();
        if self.engine.is_playing() {
            self.engine.pause();
            reaction.outbound.push(self.activity(ActivityDescriptor::Idle));
        } else {
            self.engine.play();
            reaction
                .outbound
                .push(self.activity(ActivityDescriptor::playing(song.title, song.artist)));
        }
        self.settle(reaction)
    }

    /// Advances the queue. Past the last track playback pauses and the
    /// activity goes back to idle.
    pub fn play_next(&mut self) -> Reaction {
        if self.is_listening() {
            return Reaction::default();
        }
        let mut reaction = Reaction::default();
        self.advance(&mut reaction);
        self.settle(reaction)
    }

    pub fn play_previous(&mut self) -> Reaction {
        if self.is_listening() {
            return Reaction::default();
        }
        let previous = self
            .current_index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.queue.get(i).cloned());
        let Some(song) = previous else {
            return Reaction::default();
        };
        let mut reaction = Reaction::default();
        self.select(song, &mut reaction);
        self.settle(reaction)
    }

    /// Enters the listening role for `host`.
    ///
    /// Local controls stop having any effect and the engine observer is
    /// detached, so nothing this client plays is re-broadcast. A session
    /// with a previous host is stopped first, so a rejected start never
    /// leaves this client registered with a host it no longer follows.
    pub fn start_listening_along(&mut self, host: Identity) -> AppResult<Reaction> {
        if host == self.identity {
            return Err(AppError::validation("Cannot listen along with yourself"));
        }
        if self.listening_to() == Some(&host) {
            return Err(AppError::conflict(format!("Already listening along with {host}")));
        }

        let mut reaction = Reaction::default();
        if let Some(previous) = self.listening_to().cloned() {
            info!(from = %previous, to = %host, "Switching listen-along host");
            reaction.outbound.push(ClientMessage::ListenAlongStop {
                host_user_id: previous,
            });
        }

        info!(host = %host, "Listening along");
        self.role = Role::Listening {
            sync: ListenerSync::new(host.clone(), self.drift_tolerance),
        };
        self.listeners.clear();

        reaction
            .outbound
            .push(ClientMessage::ListenAlongStart { host_user_id: host });
        Ok(reaction)
    }

    /// Leaves the listening role. The engine is left paused and empty.
    pub fn stop_listening_along(&mut self) -> Reaction {
        let Some(host) = self.listening_to().cloned() else {
            return Reaction::default();
        };
        self.leave_listening();
        info!(host = %host, "Stopped listening along");
        Reaction::send(ClientMessage::ListenAlongStop { host_user_id: host })
    }

    pub fn add_listener(&mut self, listener: Identity) -> bool {
        self.listeners.insert(listener)
    }

    pub fn remove_listener(&mut self, listener: &Identity) -> bool {
        self.listeners.remove(listener)
    }

    /// Advances an engine without its own clock and broadcasts whatever
    /// that produced.
    pub fn tick(&mut self) -> Reaction {
        self.engine.tick();
        self.settle(Reaction::default())
    }

    /// Reacts to a server frame.
    pub fn handle_server(&mut self, message: ServerMessage) -> Reaction {
        let mut reaction = Reaction::default();
        match message {
            ServerMessage::Sync {
                host_user_id,
                seq,
                player_state,
            } => {
                if let Some(sync) = sync_for(&mut self.role, &host_user_id) {
                    let outcome = sync.apply_sync(&mut self.engine, seq, &player_state);
                    log_outcome("sync", seq, outcome);
                }
            }
            ServerMessage::Update {
                host_user_id,
                seq,
                player_state,
            } => {
                if let Some(sync) = sync_for(&mut self.role, &host_user_id) {
                    let outcome = sync.apply_update(&mut self.engine, seq, &player_state);
                    log_outcome("update", seq, outcome);
                }
            }
            ServerMessage::HostDisconnected { host_user_id } => {
                if self.listening_to() == Some(&host_user_id) {
                    warn!(host = %host_user_id, "Host disconnected, leaving listen-along");
                    self.leave_listening();
                    reaction.notices.push(Notice::HostDisconnected(host_user_id));
                }
            }
            ServerMessage::RequestSync { listener_id } => {
                if !self.is_listening() {
                    if let Some(reply) = self
                        .broadcaster
                        .reply_to_request(listener_id, self.snapshot())
                    {
                        reaction.outbound.push(reply);
                    }
                }
            }
            ServerMessage::ListenerJoined { listener_id } => {
                self.add_listener(listener_id.clone());
                reaction.notices.push(Notice::ListenerJoined(listener_id));
            }
            ServerMessage::ListenerLeft { listener_id } => {
                self.remove_listener(&listener_id);
                reaction.notices.push(Notice::ListenerLeft(listener_id));
            }
            ServerMessage::ListenAlongError { code, message } => {
                if self.is_listening() {
                    self.leave_listening();
                }
                reaction
                    .notices
                    .push(Notice::ListenAlongRejected { code, message });
            }
            ServerMessage::Ping { timestamp } => {
                reaction.outbound.push(ClientMessage::Pong { timestamp });
            }
            ServerMessage::ReceiveMessage { message } => {
                reaction.notices.push(Notice::DirectMessage(message));
            }
            ServerMessage::Error { code, message } => {
                reaction.notices.push(Notice::ServerError { code, message });
            }
            other => debug!(kind = other.kind(), "Presence frame ignored by player"),
        }
        self.settle(reaction)
    }

    fn select(&mut self, song: Track, reaction: &mut Reaction) {
        if let Some(index) = self.queue.iter().position(|s| s.id == song.id) {
            self.current_index = Some(index);
        }
        self.switch_to(song, reaction);
    }

    fn switch_to(&mut self, song: Track, reaction: &mut Reaction) {
        reaction.outbound.push(
            self.activity(ActivityDescriptor::playing(song.title.clone(), song.artist.clone())),
        );
        let was_playing = self.engine.is_playing();
        self.engine.load(song);
        self.engine.play();
        // A switch mid-playback raises no engine event.
        if was_playing && !self.is_listening() {
            if let Some(player_state) = self.snapshot() {
                reaction
                    .outbound
                    .push(ClientMessage::StateUpdate { player_state });
            }
        }
    }

    fn advance(&mut self, reaction: &mut Reaction) {
        let next = self.current_index.map_or(0, |i| i + 1);
        match self.queue.get(next).cloned() {
            Some(song) => self.select(song, reaction),
            None => {
                self.engine.pause();
                reaction.outbound.push(self.activity(ActivityDescriptor::Idle));
            }
        }
    }

    fn leave_listening(&mut self) {
        self.engine.clear();
        self.current_index = None;
        self.broadcaster.reset();
        self.role = Role::Autonomous {
            subscription: EngineSubscription::attach(&self.engine),
        };
    }

    /// Drains engine events into broadcasts until the engine is quiet.
    fn settle(&mut self, mut reaction: Reaction) -> Reaction {
        loop {
            let Role::Autonomous { subscription } = &mut self.role else {
                break;
            };
            let events = subscription.drain();
            if events.is_empty() {
                break;
            }
            for event in events {
                if let Some(update) = self.broadcaster.on_engine_event(event, self.snapshot()) {
                    reaction.outbound.push(update);
                }
                if event == EngineEvent::Ended {
                    self.advance(&mut reaction);
                }
            }
        }
        reaction
    }

    fn activity(&self, descriptor: ActivityDescriptor) -> ClientMessage {
        ClientMessage::UpdateActivity {
            user_id: Some(self.identity.clone()),
            activity: descriptor.to_string(),
        }
    }
}

/// The synchronizer for `host`, if that is the host being followed.
/// Frames from an earlier host can still be in flight after a switch;
/// their sequence numbers belong to another session and are dropped.
fn sync_for<'a>(role: &'a mut Role, host: &Identity) -> Option<&'a mut ListenerSync> {
    match role {
        Role::Listening { sync } => {
            if sync.host() == host {
                Some(sync)
            } else {
                debug!(from = %host, following = %sync.host(), "Frame from another host ignored");
                None
            }
        }
        Role::Autonomous { .. } => None,
    }
}

fn log_outcome(frame: &str, seq: u64, outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Applied { reloaded, reseeked } => {
            debug!(frame, seq, reloaded, reseeked, "Host state applied")
        }
        SyncOutcome::Stale => debug!(frame, seq, "Stale host state discarded"),
    }
}
