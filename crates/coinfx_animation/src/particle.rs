//! Time-driven particles
//!
//! A [`Particle`] is one animated visual unit with a birth delay, a duration
//! and an easing. Everything an effect draws is derived from a
//! [`ParticleSample`], which is a pure function of the elapsed time since the
//! animation's first frame. Nothing is integrated, so a frame can be skipped or
//! replayed without drift.
//!
//! [`ParticleSystem`] pairs particles with an effect-specific payload and
//! tracks how many are still pending, active or retired.

use serde::{Deserialize, Serialize};

use crate::easing::Easing;

/// Opacity fade windows
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeEnvelope {
    /// Seconds of local time to fade in from 0 to 1
    pub fade_in: f32,
    /// Fraction of the raw progress at the end spent fading out
    pub fade_out: f32,
}

impl Default for FadeEnvelope {
    fn default() -> Self {
        Self {
            fade_in: 0.1,
            fade_out: 0.15,
        }
    }
}

impl FadeEnvelope {
    pub fn new(fade_in: f32, fade_out: f32) -> Self {
        Self { fade_in, fade_out }
    }

    /// Opacity at `local_t` seconds and uneased progress `raw`, in `[0, 1]`
    pub fn opacity(&self, local_t: f32, raw: f32) -> f32 {
        let alpha = if self.fade_out > 0.0 && raw > 1.0 - self.fade_out {
            (1.0 - raw) / self.fade_out
        } else if self.fade_in > 0.0 {
            (local_t / self.fade_in).min(1.0)
        } else {
            1.0
        };
        alpha.clamp(0.0, 1.0)
    }
}

/// Lifecycle of a particle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParticleState {
    /// Birth delay not yet elapsed: counts as active, draws nothing
    #[default]
    Pending,
    /// Moving through its duration
    Active,
    /// Finished or dropped; never returns to another state
    Retired,
}

/// A particle's timing, sampled at some elapsed time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSample {
    /// Seconds since the particle was born
    pub local_t: f32,
    /// Uneased progress in `[0, 1]`
    pub raw: f32,
    /// Eased progress
    pub progress: f32,
}

impl ParticleSample {
    /// `1 - progress * k`: shrink towards `1 - k` as the particle finishes
    pub fn shrink(&self, k: f32) -> f32 {
        1.0 - self.progress * k
    }

    pub fn opacity(&self, fade: &FadeEnvelope) -> f32 {
        fade.opacity(self.local_t, self.raw)
    }
}

/// Timing of one animated visual unit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub birth_delay: f32,
    pub duration: f32,
    pub easing: Easing,
    state: ParticleState,
}

impl Particle {
    pub fn new(birth_delay: f32, duration: f32, easing: Easing) -> Self {
        Self {
            birth_delay,
            duration,
            easing,
            state: ParticleState::Pending,
        }
    }

    pub fn state(&self) -> ParticleState {
        self.state
    }

    /// Not yet retired
    pub fn is_alive(&self) -> bool {
        self.state != ParticleState::Retired
    }

    /// Drop the particle early
    pub fn retire(&mut self) {
        self.state = ParticleState::Retired;
    }

    /// Timing at `elapsed` seconds, or `None` while the birth delay runs
    ///
    /// A non-positive duration completes the particle the moment it is born.
    pub fn sample(&self, elapsed: f32) -> Option<ParticleSample> {
        let local_t = elapsed - self.birth_delay;
        if local_t.is_nan() || local_t < 0.0 {
            return None;
        }
        let raw = if self.duration > 0.0 {
            (local_t / self.duration).min(1.0)
        } else {
            1.0
        };
        Some(ParticleSample {
            local_t,
            raw,
            progress: self.easing.apply(raw),
        })
    }

    /// Move the lifecycle forward to `elapsed`
    ///
    /// Returns the sample when the particle is active and drawable this frame.
    /// Once retired, a particle stays retired whatever `elapsed` says.
    pub fn advance(&mut self, elapsed: f32) -> Option<ParticleSample> {
        if self.state == ParticleState::Retired {
            return None;
        }
        match self.sample(elapsed) {
            None => {
                self.state = ParticleState::Pending;
                None
            }
            Some(sample) if sample.raw >= 1.0 => {
                self.state = ParticleState::Retired;
                None
            }
            Some(sample) => {
                self.state = ParticleState::Active;
                Some(sample)
            }
        }
    }
}

/// Per-frame population counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Activity {
    pub pending: usize,
    pub active: usize,
    pub retired: usize,
}

impl Activity {
    /// Anything left to animate (pending particles count)
    pub fn is_active(&self) -> bool {
        self.pending + self.active > 0
    }

    pub fn total(&self) -> usize {
        self.pending + self.active + self.retired
    }
}

/// Particles with an effect-specific payload
#[derive(Clone, Debug)]
pub struct ParticleSystem<P> {
    particles: Vec<(Particle, P)>,
    frame: Vec<(usize, ParticleSample)>,
    activity: Activity,
}

impl<P> Default for ParticleSystem<P> {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
            frame: Vec::new(),
            activity: Activity::default(),
        }
    }
}

impl<P> ParticleSystem<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            frame: Vec::with_capacity(capacity),
            activity: Activity::default(),
        }
    }

    pub fn push(&mut self, particle: Particle, payload: P) {
        self.particles.push((particle, payload));
        self.activity.pending += 1;
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> impl Iterator<Item = &(Particle, P)> {
        self.particles.iter()
    }

    /// Counts from the last `update`
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Advance every live particle to `elapsed` seconds
    ///
    /// Retired particles are skipped. The drawable set for this frame is kept
    /// until the next update and is read back with [`ParticleSystem::visible`].
    pub fn update(&mut self, elapsed: f32) -> Activity {
        let mut activity = Activity::default();
        self.frame.clear();

        for (index, (particle, _)) in self.particles.iter_mut().enumerate() {
            if !particle.is_alive() {
                activity.retired += 1;
                continue;
            }
            match particle.advance(elapsed) {
                Some(sample) => {
                    activity.active += 1;
                    self.frame.push((index, sample));
                }
                None if particle.is_alive() => activity.pending += 1,
                None => activity.retired += 1,
            }
        }

        self.activity = activity;
        activity
    }

    /// Particles drawable in the last updated frame, with their samples
    pub fn visible(&self) -> impl Iterator<Item = (&ParticleSample, &P)> {
        self.frame
            .iter()
            .map(move |(index, sample)| (sample, &self.particles[*index].1))
    }

    /// Retire everything
    pub fn clear(&mut self) {
        self.particles.clear();
        self.frame.clear();
        self.activity = Activity::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_midpoint() {
        let mut p = Particle::new(0.0, 1.0, Easing::EaseIn);
        let s = p.advance(0.5).unwrap();
        assert!((s.progress - 0.25).abs() < 1e-6);
        assert_eq!(p.state(), ParticleState::Active);

        assert!(p.advance(1.0).is_none());
        assert_eq!(p.state(), ParticleState::Retired);
        assert!(!p.is_alive());
    }

    #[test]
    fn test_birth_delay_produces_no_output() {
        let mut p = Particle::new(2.0, 1.0, Easing::EaseIn);
        for i in 0..20 {
            let t = i as f32 * 0.1;
            assert!(p.advance(t).is_none(), "drew at {t}");
            assert_eq!(p.state(), ParticleState::Pending);
        }
        assert!(p.advance(2.05).is_some());
    }

    #[test]
    fn test_progress_non_decreasing_and_bounded() {
        let mut p = Particle::new(0.3, 1.7, Easing::EaseIn);
        let mut last = 0.0;
        let mut t = 0.0;
        while p.is_alive() {
            if let Some(s) = p.advance(t) {
                assert!((0.0..=1.0).contains(&s.progress));
                assert!(s.progress >= last);
                last = s.progress;
            }
            t += 1.0 / 60.0;
        }
        assert!(t < 2.1);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut p = Particle::new(0.0, 0.0, Easing::EaseIn);
        let s = p.sample(0.0).unwrap();
        assert_eq!(s.raw, 1.0);
        assert!(s.progress.is_finite());
        assert!(p.advance(0.0).is_none());
        assert_eq!(p.state(), ParticleState::Retired);

        let mut negative = Particle::new(0.0, -1.0, Easing::Linear);
        assert!(negative.advance(0.0).is_none());
        assert!(!negative.is_alive());
    }

    #[test]
    fn test_huge_delay_stays_pending() {
        let mut p = Particle::new(f32::MAX, 1.0, Easing::EaseIn);
        assert!(p.advance(1.0e9).is_none());
        assert_eq!(p.state(), ParticleState::Pending);
    }

    #[test]
    fn test_fade_envelope() {
        let fade = FadeEnvelope::default();
        assert!((fade.opacity(0.05, 0.1) - 0.5).abs() < 1e-6);
        assert_eq!(fade.opacity(0.5, 0.5), 1.0);
        assert!((fade.opacity(1.0, 0.925) - 0.5).abs() < 1e-5);
        assert_eq!(fade.opacity(2.0, 1.0), 0.0);
    }

    #[test]
    fn test_system_waits_for_all() {
        let mut system = ParticleSystem::new();
        system.push(Particle::new(0.0, 0.5, Easing::EaseIn), 'a');
        system.push(Particle::new(1.0, 0.5, Easing::EaseIn), 'b');

        let a = system.update(0.25);
        assert_eq!(a, Activity { pending: 1, active: 1, retired: 0 });
        assert_eq!(system.visible().map(|(_, p)| *p).collect::<Vec<_>>(), vec!['a']);

        let a = system.update(0.75);
        assert_eq!(a, Activity { pending: 1, active: 0, retired: 1 });
        assert!(a.is_active());
        assert_eq!(system.visible().count(), 0);

        let a = system.update(1.6);
        assert!(!a.is_active());
        assert_eq!(a.total(), 2);
    }
}
