//! Playback engine seam.
//!
//! The player never touches audio directly. It drives a [`PlaybackEngine`]
//! and observes it through [`EngineEvent`]s delivered on a broadcast
//! channel, the same way a media element raises `play`/`pause`/`ended`.

use tokio::sync::broadcast;
use tokio::time::Instant;

use cotune_core::types::Track;

const EVENT_BUFFER: usize = 64;

/// Notifications raised by an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// Playback started or resumed.
    Play,
    /// Playback paused.
    Pause,
    /// The loaded track reached its end.
    Ended,
    /// Periodic position report while playing.
    TimeUpdate(f64),
}

/// An opaque audio engine.
///
/// Implementations raise an event only when their state actually changes,
/// so repeated `pause()` calls produce a single `Pause`.
pub trait PlaybackEngine: Send {
    /// Replaces the loaded track, rewinding to the start.
    fn load(&mut self, track: Track);
    /// Unloads the current track.
    fn clear(&mut self);
    /// Currently loaded track.
    fn current(&self) -> Option<&Track>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Moves the playhead, in seconds.
    fn seek(&mut self, position: f64);
    /// Playhead, in seconds.
    fn position(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn is_playing(&self) -> bool;
    /// Attaches a new observer. Dropping the receiver detaches it.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;

    /// Engines without their own clock advance here and report
    /// `TimeUpdate`/`Ended`. The runtime calls it on a fixed tick.
    fn tick(&mut self) {}
}

/// A silent engine whose playhead follows the tokio clock.
///
/// Used by the headless client and by tests (with paused time).
#[derive(Debug)]
pub struct ClockEngine {
    track: Option<Track>,
    /// Position at the last play/pause/seek.
    anchor: f64,
    /// Set while playing.
    started_at: Option<Instant>,
    events: broadcast::Sender<EngineEvent>,
}

impl Default for ClockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockEngine {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            track: None,
            anchor: 0.0,
            started_at: None,
            events,
        }
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine; the event is simply unobserved.
        let _ = self.events.send(event);
    }

    fn raw_position(&self) -> f64 {
        match self.started_at {
            Some(start) => self.anchor + start.elapsed().as_secs_f64(),
            None => self.anchor,
        }
    }
}

impl PlaybackEngine for ClockEngine {
    fn load(&mut self, track: Track) {
        self.track = Some(track);
        self.anchor = 0.0;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn clear(&mut self) {
        self.pause();
        self.track = None;
        self.anchor = 0.0;
    }

    fn current(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    fn play(&mut self) {
        if self.track.is_none() || self.started_at.is_some() {
            return;
        }
        self.started_at = Some(Instant::now());
        self.emit(EngineEvent::Play);
    }

    fn pause(&mut self) {
        if self.started_at.is_none() {
            return;
        }
        self.anchor = self.position();
        self.started_at = None;
        self.emit(EngineEvent::Pause);
    }

    fn seek(&mut self, position: f64) {
        let position = if position.is_finite() { position } else { 0.0 };
        let position = match self.duration() {
            Some(duration) => position.clamp(0.0, duration),
            None => position.max(0.0),
        };
        self.anchor = position;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn position(&self) -> f64 {
        let position = self.raw_position();
        match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Durations arrive from other clients; anything that is not a
    /// finite, non-negative number counts as unknown.
    fn duration(&self) -> Option<f64> {
        self.track
            .as_ref()
            .and_then(|t| t.duration)
            .filter(|d| d.is_finite() && *d >= 0.0)
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    fn tick(&mut self) {
        if !self.is_playing() {
            return;
        }
        match self.duration() {
            Some(duration) if self.raw_position() >= duration => {
                self.anchor = duration;
                self.started_at = None;
                self.emit(EngineEvent::Pause);
                self.emit(EngineEvent::Ended);
            }
            _ => self.emit(EngineEvent::TimeUpdate(self.position())),
        }
    }
}
