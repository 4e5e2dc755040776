#![forbid(unsafe_code)]

//! Single-flight structural mutation with a commit/abort outcome.
//!
//! A [`PendingAnimation`] plays a set of per-slot property tracks off one
//! player clock. It starts [`PendingState::Active`] and resolves exactly
//! once, to [`PendingState::Committed`] when the player completes or to
//! [`PendingState::Aborted`] when it is interrupted. The carousel applies
//! the structural change only on commit.
//!
//! Tracks are keyed by [`TaskId`] so they stay attached to the right slot
//! even if slot indices move while the animation plays.

use std::time::Duration;

use recents_core::animation::{Animation, Easing, Fade};

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    Active,
    Committed,
    Aborted,
}

impl PendingState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PendingState::Active)
    }
}

/// The structural change applied on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKind {
    Dismiss {
        task: TaskId,
        remove_task: bool,
        animate: bool,
    },
    DismissAll,
}

/// Slot property driven by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotProperty {
    TranslationX,
    TranslationY,
    Alpha,
}

#[derive(Debug, Clone, Copy)]
struct Track {
    task: TaskId,
    property: SlotProperty,
    from: f32,
    to: f32,
    easing: Easing,
}

/// One sampled track value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub task: TaskId,
    pub property: SlotProperty,
    pub value: f32,
}

#[derive(Debug, Clone)]
pub struct PendingAnimation {
    kind: PendingKind,
    state: PendingState,
    duration: Duration,
    player: Fade,
    tracks: Vec<Track>,
}

impl PendingAnimation {
    /// A new active animation. The player runs through fast-out-slow-in.
    pub fn new(kind: PendingKind, duration: Duration) -> Self {
        Self {
            kind,
            state: PendingState::Active,
            duration,
            player: Fade::new(duration).easing(Easing::FAST_OUT_SLOW_IN),
            tracks: Vec::new(),
        }
    }

    /// Animate `property` of the slot bound to `task` from `from` to `to`.
    pub fn add_track(
        &mut self,
        task: TaskId,
        property: SlotProperty,
        from: f32,
        to: f32,
        easing: Easing,
    ) {
        self.tracks.push(Track {
            task,
            property,
            from,
            to,
            easing,
        });
    }

    pub fn kind(&self) -> &PendingKind {
        &self.kind
    }

    pub fn state(&self) -> PendingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PendingState::Active
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// True if a track animates `property` for `task`.
    pub fn has_track(&self, task: TaskId, property: SlotProperty) -> bool {
        self.tracks
            .iter()
            .any(|track| track.task == task && track.property == property)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Advance the player. Returns the terminal state on the tick that
    /// resolves the animation, `None` otherwise.
    pub fn tick(&mut self, dt: Duration) -> Option<PendingState> {
        if !self.is_active() {
            return None;
        }
        self.player.tick(dt);
        if self.duration.is_zero() || self.player.is_complete() {
            self.state = PendingState::Committed;
            return Some(self.state);
        }
        None
    }

    /// Interrupt the animation. Returns `false` if it had already resolved.
    pub fn abort(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = PendingState::Aborted;
        true
    }

    /// Current value of every track.
    pub fn samples(&self) -> Vec<TrackSample> {
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            self.player.value()
        };
        self.tracks
            .iter()
            .map(|track| TrackSample {
                task: track.task,
                property: track.property,
                value: track.from + (track.to - track.from) * track.easing.ease(progress),
            })
            .collect()
    }
}
