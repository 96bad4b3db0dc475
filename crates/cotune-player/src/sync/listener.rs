//! Listener role: mirror a host's playback onto the local engine.

use cotune_core::types::{Identity, PlayerState};

use crate::engine::PlaybackEngine;

/// What applying a host frame did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied {
        /// A different track was loaded.
        reloaded: bool,
        /// The playhead was moved.
        reseeked: bool,
    },
    /// The frame was older than one already applied and was dropped.
    Stale,
}

/// Per-role synchronizer. A fresh one is created every time the client
/// starts listening, so sequence tracking never leaks across sessions.
#[derive(Debug, Clone)]
pub struct ListenerSync {
    host: Identity,
    drift_tolerance: f64,
    last_seq: Option<u64>,
}

impl ListenerSync {
    pub fn new(host: Identity, drift_tolerance: f64) -> Self {
        Self {
            host,
            drift_tolerance,
            last_seq: None,
        }
    }

    /// Host being mirrored.
    pub fn host(&self) -> &Identity {
        &self.host
    }

    /// Highest sequence number applied so far.
    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// Applies the targeted initial snapshot: song, position and play flag
    /// are all set unconditionally.
    pub fn apply_sync<E>(&mut self, engine: &mut E, seq: u64, state: &PlayerState) -> SyncOutcome
    where
        E: PlaybackEngine + ?Sized,
    {
        if !self.accept(seq) {
            return SyncOutcome::Stale;
        }
        engine.load(state.song.clone());
        engine.seek(state.current_time);
        apply_flag(engine, state.is_playing);
        SyncOutcome::Applied {
            reloaded: true,
            reseeked: true,
        }
    }

    /// Applies a broadcast update.
    ///
    /// The track is reloaded only when the source differs. The playhead
    /// moves when drift reaches the tolerance, or when the play flag
    /// changes (a pause lands exactly where the host paused).
    pub fn apply_update<E>(&mut self, engine: &mut E, seq: u64, state: &PlayerState) -> SyncOutcome
    where
        E: PlaybackEngine + ?Sized,
    {
        if !self.accept(seq) {
            return SyncOutcome::Stale;
        }

        let reloaded = engine
            .current()
            .is_none_or(|current| !current.same_source(&state.song));
        if reloaded {
            engine.load(state.song.clone());
        }

        let drift = (engine.position() - state.current_time).abs();
        let flag_changed = engine.is_playing() != state.is_playing;
        let reseeked = drift >= self.drift_tolerance || flag_changed;
        if reseeked {
            engine.seek(state.current_time);
        }
        apply_flag(engine, state.is_playing);

        SyncOutcome::Applied { reloaded, reseeked }
    }

    fn accept(&mut self, seq: u64) -> bool {
        if self.last_seq.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last_seq = Some(seq);
        true
    }
}

fn apply_flag<E: PlaybackEngine + ?Sized>(engine: &mut E, playing: bool) {
    if playing {
        engine.play();
    } else {
        engine.pause();
    }
}
