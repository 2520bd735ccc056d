// Copyright (c) 2024 Mike Tsao

use crate::prelude::*;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Whether the transport is moving.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// Stopped, at the origin.
    #[default]
    Idle,
    /// Advancing.
    Running,
    /// Holding its position.
    Paused,
}

/// [ClockService] is the session's one musical transport. It keeps track of
/// the current position, the tempo, and whether time is moving.
///
/// Everything scheduled against the clock is scheduled in [MusicalTime], so a
/// tempo change takes effect on the very next [ClockService::advance()]
/// without anything being rescheduled. Wall-clock times are derived on demand
/// with [ClockService::seconds_at()], which accounts for every tempo change
/// since the transport last left the origin.
#[derive(Clone, Debug, Default, Builder, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClockService {
    /// The current beats per minute.
    #[builder(default)]
    tempo: Tempo,

    #[builder(setter(skip))]
    #[serde(skip)]
    e: ClockServiceEphemerals,
}
/// Parts of [ClockService] that shouldn't be serialized.
#[derive(Clone, Debug, Default)]
pub struct ClockServiceEphemerals {
    state: TransportState,
    position: MusicalTime,

    // The most recent tempo change, as a (position, seconds) pair. Positions
    // after the anchor are converted at the current tempo.
    anchor_position: MusicalTime,
    anchor_seconds: Seconds,
}
impl PartialEq for ClockService {
    fn eq(&self, other: &Self) -> bool {
        self.tempo == other.tempo
    }
}
impl ClockService {
    /// Starts or resumes the transport.
    pub fn start(&mut self) {
        if self.e.state != TransportState::Running {
            log::debug!("transport running from {}", self.e.position);
            self.e.state = TransportState::Running;
        }
    }

    /// Holds the current position. Has no effect unless running.
    pub fn pause(&mut self) {
        if self.e.state == TransportState::Running {
            self.e.state = TransportState::Paused;
        }
    }

    /// Returns to the origin from any state.
    pub fn stop(&mut self) {
        self.e = ClockServiceEphemerals::default();
    }

    /// Changes the tempo. The value isn't validated here; callers that take
    /// user input should clamp it with [Tempo::clamped()] first.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        let now = self.e.position;
        self.e.anchor_seconds = self.seconds_at(now);
        self.e.anchor_position = now;
        self.tempo = tempo;
    }

    #[allow(missing_docs)]
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> TransportState {
        self.e.state
    }

    #[allow(missing_docs)]
    pub fn is_running(&self) -> bool {
        self.e.state == TransportState::Running
    }

    /// The current transport position.
    pub fn position(&self) -> MusicalTime {
        self.e.position
    }

    /// Advances the transport by the given musical duration. Returns the
    /// half-open range from the prior position to the new one. If the
    /// transport isn't running, the position doesn't move and the range is
    /// empty.
    pub fn advance(&mut self, duration: MusicalTime) -> TimeRange {
        let start = self.e.position;
        if self.is_running() {
            self.e.position = start + duration;
        }
        TimeRange::new_with_start_and_end(start, self.e.position)
    }

    /// Like [ClockService::advance()], but in wall-clock time at the current
    /// tempo.
    pub fn advance_seconds(&mut self, seconds: Seconds) -> TimeRange {
        self.advance(MusicalTime::from_seconds(seconds, self.tempo))
    }

    /// The transport time, in seconds since the origin, at which `position`
    /// happens (or happened).
    pub fn seconds_at(&self, position: MusicalTime) -> Seconds {
        let anchor = self.e.anchor_position;
        if position >= anchor {
            self.e.anchor_seconds + (position - anchor).as_seconds(self.tempo)
        } else {
            Seconds(self.e.anchor_seconds.0 - (anchor - position).as_seconds(self.tempo).0)
        }
    }
}
