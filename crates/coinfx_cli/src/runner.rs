//! Headless effect runner
//!
//! Mounts an effect on a recording surface and drives it with simulated 60 Hz
//! host frames until it completes or the frame cap is hit.

use coinfx_animation::{FrameLoop, FrameOutcome, LoopState};
use coinfx_core::{ImageId, RecordingContext, Size};
use coinfx_effects::{EffectKind, EffectsConfig, ImageHandle};
use serde::Serialize;
use tracing::{debug, warn};

/// Simulated host frame interval
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Phone-sized surface used when no viewport is given
pub const DEFAULT_VIEWPORT: Size = Size {
    width: 412.0,
    height: 915.0,
};

/// Natural size reported for the stand-in coin/title bitmap
const IMAGE_SIZE: Size = Size {
    width: 128.0,
    height: 128.0,
};

/// A phase the effect entered, and when
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseChange {
    pub phase: &'static str,
    pub frame: u64,
    pub elapsed: f32,
}

/// Result of one headless run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub effect: &'static str,
    pub seed: u64,
    pub frames: u64,
    pub draw_commands: usize,
    pub peak_draw_commands: usize,
    /// Seconds from the first frame to completion; `None` when capped
    pub completed_at: Option<f32>,
    pub phases: Vec<PhaseChange>,
}

pub struct Runner {
    config: EffectsConfig,
    viewport: Size,
    max_frames: u64,
}

impl Runner {
    pub fn new(config: EffectsConfig) -> Self {
        Self {
            config,
            viewport: DEFAULT_VIEWPORT,
            max_frames: 60 * 60,
        }
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn run(&self, kind: EffectKind, seed: u64) -> RunSummary {
        let image = ImageHandle::ready(ImageId(1), IMAGE_SIZE);
        let animation = kind.build(&self.config, self.viewport, image, seed);
        let mut frame_loop = FrameLoop::new(animation);
        let mut surface = RecordingContext::new(self.viewport);

        let mut summary = RunSummary {
            effect: kind.name(),
            seed,
            frames: 0,
            draw_commands: 0,
            peak_draw_commands: 0,
            completed_at: None,
            phases: Vec::new(),
        };
        let mut last_phase = None;

        for frame in 0..self.max_frames {
            let outcome = frame_loop.frame(frame as f64 * FRAME_MS, &mut surface);
            if outcome == FrameOutcome::Skipped {
                break;
            }

            let drawn = surface.draw_call_count();
            summary.draw_commands += drawn;
            summary.peak_draw_commands = summary.peak_draw_commands.max(drawn);
            surface.reset();

            let phase = frame_loop.animation().phase();
            if phase != last_phase {
                if let Some(phase) = phase {
                    debug!(phase, frame = frame_loop.frames(), "phase entered");
                    summary.phases.push(PhaseChange {
                        phase,
                        frame: frame_loop.frames(),
                        elapsed: frame_loop.elapsed(),
                    });
                }
                last_phase = phase;
            }

            if outcome == FrameOutcome::Completed {
                summary.completed_at = Some(frame_loop.elapsed());
                break;
            }
        }

        summary.frames = frame_loop.frames();
        if frame_loop.state() != LoopState::Completed {
            warn!(
                effect = kind.name(),
                frames = summary.frames,
                "effect did not complete within the frame cap"
            );
            frame_loop.cancel();
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_runs_to_completion() {
        let summary = Runner::new(EffectsConfig::default()).run(EffectKind::Title, 1);
        let completed_at = summary.completed_at.unwrap();
        assert!(completed_at >= 3.2 && completed_at < 3.3);
        assert!(summary.draw_commands > 0);
        assert_eq!(summary.peak_draw_commands, 1);
    }

    #[test]
    fn test_frame_cap() {
        let summary = Runner::new(EffectsConfig::default())
            .with_max_frames(10)
            .run(EffectKind::Title, 1);
        assert_eq!(summary.frames, 10);
        assert_eq!(summary.completed_at, None);
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = Runner::new(EffectsConfig::default())
            .with_max_frames(2)
            .run(EffectKind::Drain, 3);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["effect"], "drain");
        assert_eq!(json["seed"], 3);
        assert!(json["completed_at"].is_null());
    }
}
