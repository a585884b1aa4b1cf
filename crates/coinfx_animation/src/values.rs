//! Animatable values and keyframe animations
//!
//! Keyframe animations drive the secondary motion around the particle effects:
//! the title pop, the box snap-back after a coin pops free, drop target pulses
//! and the floating `+$N` badge. Time is in seconds; keyframe positions are
//! offsets in `[0, 1]` of the animation's duration.

use coinfx_core::{Color, Point, Vec2};

use crate::easing::Easing;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

// ============================================================================
// Implementations
// ============================================================================

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < epsilon
    }
}

impl Interpolate for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Interpolate for Point {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Point::lerp(self, *other, t)
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Interpolate for Color {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // Overshooting easings must not push channels out of range
        Color::lerp(self, other, t)
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self.r - other.r).abs() < epsilon
            && (self.g - other.g).abs() < epsilon
            && (self.b - other.b).abs() < epsilon
            && (self.a - other.a).abs() < epsilon
    }
}

/// Translation plus uniform scale, the state of a squashed or pulsing box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OffsetScale {
    pub offset: Vec2,
    pub scale: f32,
}

impl OffsetScale {
    pub const REST: OffsetScale = OffsetScale {
        offset: Vec2::ZERO,
        scale: 1.0,
    };

    pub fn new(offset: Vec2, scale: f32) -> Self {
        Self { offset, scale }
    }
}

impl Interpolate for OffsetScale {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        OffsetScale {
            offset: self.offset.lerp(&other.offset, t),
            scale: self.scale.lerp(&other.scale, t),
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.offset.approx_eq(&other.offset, epsilon) && self.scale.approx_eq(&other.scale, epsilon)
    }
}

// ============================================================================
// Keyframe Animation
// ============================================================================

/// A keyframe holding a value of type T
#[derive(Clone, Debug)]
pub struct TypedKeyframe<T: Interpolate> {
    /// Offset within the animation (0.0 to 1.0)
    pub time: f32,
    pub value: T,
    /// Easing function when transitioning TO this keyframe
    pub easing: Easing,
}

impl<T: Interpolate> TypedKeyframe<T> {
    pub fn new(time: f32, value: T, easing: Easing) -> Self {
        Self {
            time,
            value,
            easing,
        }
    }
}

/// A keyframe animation for any interpolatable type
///
/// The animation is sampled, not ticked: `sample(elapsed)` is a pure function
/// of the seconds since the animation started.
#[derive(Clone, Debug)]
pub struct TypedKeyframeAnimation<T: Interpolate> {
    duration: f32,
    keyframes: Vec<TypedKeyframe<T>>,
}

impl<T: Interpolate> TypedKeyframeAnimation<T> {
    /// Create an empty animation lasting `duration` seconds
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            keyframes: Vec::new(),
        }
    }

    /// Add a keyframe (builder pattern)
    pub fn keyframe(mut self, time: f32, value: T, easing: Easing) -> Self {
        self.keyframes
            .push(TypedKeyframe::new(time.clamp(0.0, 1.0), value, easing));
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        self
    }

    /// Add a keyframe with linear easing
    pub fn at(self, time: f32, value: T) -> Self {
        self.keyframe(time, value, Easing::Linear)
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Stretch to last exactly `duration` seconds, keeping the key offsets
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration.max(0.0);
        self
    }

    /// Whether `elapsed` seconds is past the end
    pub fn is_finished(&self, elapsed: f32) -> bool {
        elapsed >= self.duration
    }

    /// Progress (0.0 to 1.0) after `elapsed` seconds
    pub fn progress(&self, elapsed: f32) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Value after `elapsed` seconds; the last key's value once finished
    pub fn sample(&self, elapsed: f32) -> Option<T> {
        if self.is_finished(elapsed) {
            return self.keyframes.last().map(|kf| kf.value.clone());
        }
        self.sample_at(self.progress(elapsed))
    }

    /// Sample at a specific progress (0.0 to 1.0)
    pub fn sample_at(&self, progress: f32) -> Option<T> {
        let first = self.keyframes.first()?;
        let progress = progress.clamp(0.0, 1.0);

        let mut prev_kf = first;
        let mut next_kf = first;

        for kf in &self.keyframes {
            if kf.time <= progress {
                prev_kf = kf;
            }
            if kf.time >= progress {
                next_kf = kf;
                break;
            }
        }

        if (prev_kf.time - next_kf.time).abs() < f32::EPSILON {
            return Some(prev_kf.value.clone());
        }

        let local_progress = (progress - prev_kf.time) / (next_kf.time - prev_kf.time);
        let eased = next_kf.easing.apply(local_progress);

        Some(prev_kf.value.lerp(&next_kf.value, eased))
    }
}

// ============================================================================
// Sequence Builder
// ============================================================================

/// Builds a keyframe animation from chained tweens with absolute durations
///
/// ```ignore
/// let scale = KeyframeSequence::new(0.0)
///     .wait(0.8)
///     .to(1.15, 0.5, Easing::BackOut(3.0))
///     .to(1.0, 0.3, Easing::EaseOutQuad)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct KeyframeSequence<T: Interpolate> {
    current: T,
    elapsed: f32,
    stops: Vec<(f32, T, Easing)>,
}

impl<T: Interpolate> KeyframeSequence<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: initial.clone(),
            elapsed: 0.0,
            stops: vec![(0.0, initial, Easing::Linear)],
        }
    }

    /// Hold the current value for `seconds`
    pub fn wait(mut self, seconds: f32) -> Self {
        let seconds = seconds.max(0.0);
        if seconds > 0.0 {
            self.elapsed += seconds;
            self.stops
                .push((self.elapsed, self.current.clone(), Easing::Linear));
        }
        self
    }

    /// Tween to `value` over `seconds`
    pub fn to(mut self, value: T, seconds: f32, easing: Easing) -> Self {
        self.elapsed += seconds.max(0.0);
        self.current = value.clone();
        self.stops.push((self.elapsed, value, easing));
        self
    }

    /// Tween to `value` and back `repeat + 1` times in total, alternating direction
    pub fn yoyo(mut self, value: T, seconds: f32, easing: Easing, repeat: u32) -> Self {
        let origin = self.current.clone();
        for i in 0..=repeat {
            let next = if i % 2 == 0 { value.clone() } else { origin.clone() };
            self = self.to(next, seconds, easing);
        }
        self
    }

    /// Total length of the sequence so far, in seconds
    pub fn duration(&self) -> f32 {
        self.elapsed
    }

    pub fn build(self) -> TypedKeyframeAnimation<T> {
        let total = self.elapsed;
        let last = self.stops.len().saturating_sub(1);
        let mut animation = TypedKeyframeAnimation::new(total);
        for (i, (time, value, easing)) in self.stops.into_iter().enumerate() {
            let offset = if total > 0.0 && i < last {
                time / total
            } else {
                1.0
            };
            animation = animation.keyframe(offset, value, easing);
        }
        animation
    }
}

// ============================================================================
// Type Aliases for Common Types
// ============================================================================

/// Keyframe animation for f32 values
pub type FloatAnimation = TypedKeyframeAnimation<f32>;

/// Keyframe animation for box offset and scale
pub type OffsetScaleAnimation = TypedKeyframeAnimation<OffsetScale>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_interpolation() {
        assert!((0.0_f32.lerp(&1.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((10.0_f32.lerp(&20.0, 0.25) - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_typed_keyframe_animation() {
        let anim = FloatAnimation::new(0.2).at(0.0, 1.0).at(0.5, 1.1).at(1.0, 1.0);

        assert!((anim.sample(0.0).unwrap() - 1.0).abs() < 1e-6);
        assert!((anim.sample(0.1).unwrap() - 1.1).abs() < 1e-6);
        assert!((anim.sample(0.05).unwrap() - 1.05).abs() < 1e-5);
        assert!((anim.sample(5.0).unwrap() - 1.0).abs() < 1e-6);
        assert!(anim.is_finished(0.2));
        assert!(!anim.is_finished(0.19));
    }

    #[test]
    fn test_empty_animation_samples_none() {
        let anim = FloatAnimation::new(1.0);
        assert!(anim.sample(0.5).is_none());
    }

    #[test]
    fn test_sequence_timing() {
        let anim = KeyframeSequence::new(0.0_f32)
            .wait(1.0)
            .to(2.0, 1.0, Easing::Linear)
            .yoyo(3.0, 0.5, Easing::Linear, 1)
            .build();

        assert!((anim.duration() - 3.0).abs() < 1e-6);
        assert!((anim.sample(0.5).unwrap() - 0.0).abs() < 1e-6);
        assert!((anim.sample(1.5).unwrap() - 1.0).abs() < 1e-5);
        assert!((anim.sample(2.5).unwrap() - 3.0).abs() < 1e-5);
        assert!((anim.sample(3.0).unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_sequence_ends_on_final_value() {
        // Step durations that do not sum exactly in f32
        let anim = KeyframeSequence::new(1.0_f32)
            .wait(0.8)
            .to(1.15, 0.5, Easing::BackOut(3.0))
            .to(1.0, 0.3, Easing::EaseOutQuad)
            .yoyo(1.05, 0.25, Easing::EaseInOutSine, 3)
            .wait(0.2)
            .to(0.0, 0.4, Easing::BackIn(2.0))
            .build();

        assert_eq!(anim.sample(anim.duration()), Some(0.0));
        assert_eq!(anim.sample(anim.duration() + 1.0), Some(0.0));
        assert_eq!(anim.sample_at(1.0), Some(0.0));

        let stretched = anim.with_duration(4.0);
        assert_eq!(stretched.duration(), 4.0);
        assert_eq!(stretched.sample(4.0), Some(0.0));
        assert!((stretched.sample(0.5).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_scale_lerp() {
        let a = OffsetScale::new(Vec2::new(-10.0, 4.0), 0.85);
        let mid = a.lerp(&OffsetScale::REST, 0.5);
        assert!(mid.approx_eq(&OffsetScale::new(Vec2::new(-5.0, 2.0), 0.925), 1e-5));
    }
}
