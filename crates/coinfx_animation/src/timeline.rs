//! Forward-only phase timelines
//!
//! Effects move through a fixed sequence of phases (spawn, hold, release,
//! end). A [`PhaseTimeline`] records the current phase with the time it was
//! entered and refuses any transition that would go backwards or leave the
//! terminal phase.

use std::fmt::Debug;

use thiserror::Error;
use tracing::debug;

/// Error type for phase transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("cannot move backwards from {from} to {to}")]
    Backward {
        from: &'static str,
        to: &'static str,
    },

    #[error("already in {0}")]
    Unchanged(&'static str),

    #[error("{0} is terminal")]
    Terminal(&'static str),
}

/// An ordered phase
pub trait Phase: Copy + Eq + Debug {
    /// Position in the forward order
    fn ordinal(self) -> u8;

    /// Whether no transition may leave this phase
    fn is_terminal(self) -> bool;

    /// Lowercase name for logs and summaries
    fn name(self) -> &'static str;
}

/// Generic effect stages
///
/// Effects label the release stage by what it does: dropping the floor,
/// sweeping cards away, exploding shards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Bodies are being spawned or dealt
    #[default]
    Spawn,
    /// Everything spawned; waiting for the hold duration
    Hold,
    /// A boundary was removed or gravity changed; waiting for the scene to empty
    Release,
    /// Nothing left on screen
    End,
}

impl Phase for Stage {
    fn ordinal(self) -> u8 {
        self as u8
    }

    fn is_terminal(self) -> bool {
        self == Stage::End
    }

    fn name(self) -> &'static str {
        match self {
            Stage::Spawn => "spawn",
            Stage::Hold => "hold",
            Stage::Release => "release",
            Stage::End => "end",
        }
    }
}

/// Current phase plus the history of transitions
#[derive(Clone, Debug)]
pub struct PhaseTimeline<P: Phase> {
    current: P,
    entered_at: f32,
    history: Vec<(P, f32)>,
}

impl<P: Phase> PhaseTimeline<P> {
    /// Start in `initial` at `now` seconds
    pub fn new(initial: P, now: f32) -> Self {
        Self {
            current: initial,
            entered_at: now,
            history: vec![(initial, now)],
        }
    }

    pub fn current(&self) -> P {
        self.current
    }

    /// When the current phase was entered, in seconds
    pub fn entered_at(&self) -> f32 {
        self.entered_at
    }

    /// Seconds spent in the current phase
    pub fn time_in_phase(&self, now: f32) -> f32 {
        (now - self.entered_at).max(0.0)
    }

    pub fn is(&self, phase: P) -> bool {
        self.current == phase
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Every phase entered so far with its entry time
    pub fn history(&self) -> &[(P, f32)] {
        &self.history
    }

    /// Move to `next` at `now`
    ///
    /// Skipping phases is allowed; going backwards, staying put, or leaving the
    /// terminal phase is rejected and leaves the timeline unchanged.
    pub fn advance(&mut self, next: P, now: f32) -> Result<(), TimelineError> {
        let from = self.current;
        if from.is_terminal() {
            return Err(TimelineError::Terminal(from.name()));
        }
        if next == from {
            return Err(TimelineError::Unchanged(from.name()));
        }
        if next.ordinal() < from.ordinal() {
            return Err(TimelineError::Backward {
                from: from.name(),
                to: next.name(),
            });
        }

        debug!(from = from.name(), to = next.name(), at = now, "phase transition");
        self.current = next;
        self.entered_at = now;
        self.history.push((next, now));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut timeline = PhaseTimeline::new(Stage::Spawn, 0.0);
        timeline.advance(Stage::Hold, 1.5).unwrap();
        assert_eq!(timeline.current(), Stage::Hold);
        assert!((timeline.time_in_phase(2.0) - 0.5).abs() < 1e-6);

        timeline.advance(Stage::Release, 2.3).unwrap();
        timeline.advance(Stage::End, 4.0).unwrap();
        assert!(timeline.is_terminal());

        let order: Vec<u8> = timeline.history().iter().map(|(p, _)| p.ordinal()).collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rejected_transitions_leave_state() {
        let mut timeline = PhaseTimeline::new(Stage::Hold, 1.0);

        assert_eq!(
            timeline.advance(Stage::Spawn, 2.0),
            Err(TimelineError::Backward {
                from: "hold",
                to: "spawn"
            })
        );
        assert_eq!(
            timeline.advance(Stage::Hold, 2.0),
            Err(TimelineError::Unchanged("hold"))
        );
        assert_eq!(timeline.current(), Stage::Hold);
        assert_eq!(timeline.entered_at(), 1.0);

        timeline.advance(Stage::End, 3.0).unwrap();
        assert_eq!(
            timeline.advance(Stage::End, 4.0),
            Err(TimelineError::Terminal("end"))
        );
        assert_eq!(timeline.history().len(), 2);
    }

    #[test]
    fn test_skipping_is_allowed() {
        let mut timeline = PhaseTimeline::new(Stage::Spawn, 0.0);
        timeline.advance(Stage::End, 0.1).unwrap();
        assert!(timeline.is(Stage::End));
    }
}
