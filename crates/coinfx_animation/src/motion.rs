//! Particle motion paths
//!
//! Pure functions from a [`ParticleSample`] to a position, angle, size and
//! opacity. Effects choose a path per particle at creation time.

use serde::{Deserialize, Serialize};

use coinfx_core::Point;

use crate::easing::Easing;
use crate::particle::{FadeEnvelope, ParticleSample};

/// Where a particle is and how it looks in one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Point,
    /// Rotation in radians
    pub angle: f32,
    /// Drawn edge length in pixels
    pub size: f32,
    pub opacity: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Radial inward spiral
// ─────────────────────────────────────────────────────────────────────────────

/// Spiral from a start radius into a center point
///
/// `radius = start_radius * (1 - eased)`, `angle = start_angle + rotation * eased`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpiralPath {
    pub center: Point,
    pub start_angle: f32,
    pub start_radius: f32,
    pub rotation: f32,
    pub size: f32,
    /// Fraction of the size lost by the end of the path
    pub shrink: f32,
}

impl SpiralPath {
    pub fn pose(&self, sample: &ParticleSample, fade: &FadeEnvelope) -> Pose {
        let eased = sample.progress;
        let radius = self.start_radius * (1.0 - eased);
        let angle = self.start_angle + self.rotation * eased;
        Pose {
            position: Point::polar(self.center, angle, radius),
            angle,
            size: self.size * sample.shrink(self.shrink),
            opacity: sample.opacity(fade),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Burst, then spiral
// ─────────────────────────────────────────────────────────────────────────────

/// Where a burst-spiral particle splits its raw progress
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstSpiralTiming {
    /// Raw progress at which the burst hands over to the spiral
    pub boundary: f32,
    /// Fraction of spiral progress at the end spent fading out
    pub spiral_fade_out: f32,
    /// Size lost over the spiral
    pub spiral_shrink: f32,
}

impl Default for BurstSpiralTiming {
    fn default() -> Self {
        Self {
            boundary: 0.25,
            spiral_fade_out: 0.15,
            spiral_shrink: 0.7,
        }
    }
}

/// Which half of a burst-spiral a particle is in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstPhase {
    Burst,
    Spiral,
}

/// Burst outwards from a source, then spiral into a target
///
/// The burst eases out over `[0, boundary)` of the raw progress. The spiral
/// eases in over `[boundary, 1]` and starts exactly where the burst ended.
/// Particles using this path should be created with [`Easing::Linear`] so that
/// the sample's progress is the raw progress; each phase applies its own curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurstSpiral {
    pub source: Point,
    pub target: Point,
    pub burst_angle: f32,
    pub burst_radius: f32,
    pub spiral_rotation: f32,
    pub size: f32,
    pub timing: BurstSpiralTiming,
}

impl BurstSpiral {
    pub fn burst_end(&self) -> Point {
        Point::polar(self.source, self.burst_angle, self.burst_radius)
    }

    pub fn phase(&self, raw: f32) -> BurstPhase {
        if raw < self.timing.boundary {
            BurstPhase::Burst
        } else {
            BurstPhase::Spiral
        }
    }

    pub fn pose(&self, sample: &ParticleSample) -> Pose {
        let raw = sample.raw;
        let boundary = self.timing.boundary.clamp(0.0, 1.0);

        match self.phase(raw) {
            BurstPhase::Burst => {
                let burst_progress = raw / boundary;
                let eased = Easing::EaseOutQuad.apply(burst_progress);
                Pose {
                    position: Point::polar(self.source, self.burst_angle, self.burst_radius * eased),
                    angle: 0.0,
                    size: self.size * (0.8 + 0.2 * eased),
                    opacity: (burst_progress * 4.0).min(1.0),
                }
            }
            BurstPhase::Spiral => {
                let span = 1.0 - boundary;
                let spiral_progress = if span > 0.0 {
                    ((raw - boundary) / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let eased = Easing::EaseInQuad.apply(spiral_progress);

                let start = self.burst_end();
                let remaining = start.distance(self.target);
                let base_angle = start.angle_from(self.target);
                let angle = base_angle + self.spiral_rotation * eased;

                let fade = self.timing.spiral_fade_out;
                let opacity = if fade > 0.0 && spiral_progress > 1.0 - fade {
                    (1.0 - spiral_progress) / fade
                } else {
                    1.0
                };

                Pose {
                    position: Point::polar(self.target, angle, remaining * (1.0 - eased)),
                    angle: 0.0,
                    size: self.size * (1.0 - self.timing.spiral_shrink * eased),
                    opacity: opacity.clamp(0.0, 1.0),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sample_at(raw: f32) -> ParticleSample {
        ParticleSample {
            local_t: raw,
            raw,
            progress: raw,
        }
    }

    fn path() -> BurstSpiral {
        BurstSpiral {
            source: Point::new(100.0, 500.0),
            target: Point::new(300.0, 120.0),
            burst_angle: 1.2,
            burst_radius: 60.0,
            spiral_rotation: PI,
            size: 40.0,
            timing: BurstSpiralTiming::default(),
        }
    }

    #[test]
    fn test_spiral_is_continuous_with_burst() {
        let p = path();
        let before = p.pose(&sample_at(0.2499));
        let after = p.pose(&sample_at(0.25));
        assert!(before.position.distance(after.position) < 0.1);
        assert!(after.position.distance(p.burst_end()) < 1e-2);
        assert_eq!(after.opacity, 1.0);
    }

    #[test]
    fn test_spiral_ends_on_target() {
        let p = path();
        let end = p.pose(&sample_at(1.0));
        assert!(end.position.distance(p.target) < 1e-2);
        assert_eq!(end.opacity, 0.0);
        assert!((end.size - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_burst_fades_in() {
        let p = path();
        let start = p.pose(&sample_at(0.0));
        assert_eq!(start.position, p.source);
        assert_eq!(start.opacity, 0.0);
        assert!((start.size - 32.0).abs() < 1e-4);
        assert_eq!(p.pose(&sample_at(0.0625)).opacity, 1.0);
    }

    #[test]
    fn test_radial_path_reaches_center() {
        let spiral = SpiralPath {
            center: Point::new(206.0, 457.5),
            start_angle: 0.3,
            start_radius: 900.0,
            rotation: PI / 2.0,
            size: 150.0,
            shrink: 0.8,
        };
        let fade = FadeEnvelope::default();
        let start = spiral.pose(&sample_at(0.0), &fade);
        assert!((start.position.distance(spiral.center) - 900.0).abs() < 1e-2);

        let end = spiral.pose(&sample_at(1.0), &fade);
        assert!(end.position.distance(spiral.center) < 1e-3);
        assert!((end.size - 30.0).abs() < 1e-3);
        assert!((end.angle - (0.3 + PI / 2.0)).abs() < 1e-6);
    }
}
