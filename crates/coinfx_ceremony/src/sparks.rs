//! Sparks
//!
//! Small square sparks left behind by a moving token, and the ring of sparks
//! thrown out when a token pops free. Sparks snap to a 4 px grid and animate
//! in six discrete steps for a pixel-art look.

use std::f32::consts::TAU;

use coinfx_core::{Brush, Color, CornerRadius, DrawContext, Point, Rect, Vec2};
use rand::Rng;

const GRID: f32 = 4.0;
const TRAIL_SIZES: [f32; 4] = [3.0, 4.0, 5.0, 6.0];
const TRAIL_SPREAD: f32 = 16.0;
const FRAME_STEPS: f32 = 6.0;

const BURST_COUNT: usize = 5;
const BURST_SIZE: f32 = 4.0;
const BURST_LIFE_MS: f64 = 400.0;

fn snap(value: f32, grid: f32) -> f32 {
    (value / grid).round() * grid
}

/// One spark, sampled as a function of time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spark {
    pub origin: Point,
    /// Offset reached at the end of its life
    pub drift: Vec2,
    pub size: f32,
    pub born_ms: f64,
    pub life_ms: f64,
    /// Trail sparks move in six steps and pause at 70% opacity halfway
    pub stepped: bool,
}

impl Spark {
    fn progress(&self, now_ms: f64) -> f32 {
        if self.life_ms <= 0.0 {
            return 1.0;
        }
        let raw = ((now_ms - self.born_ms) / self.life_ms).clamp(0.0, 1.0) as f32;
        if self.stepped {
            (raw * FRAME_STEPS).floor() / FRAME_STEPS
        } else {
            raw
        }
    }

    pub fn is_alive(&self, now_ms: f64) -> bool {
        now_ms - self.born_ms < self.life_ms
    }

    /// Position and opacity at `now_ms`
    pub fn sample(&self, now_ms: f64) -> (Point, f32) {
        let t = self.progress(now_ms);
        if !self.stepped {
            return (self.origin + self.drift * t, 1.0 - t);
        }
        if t <= 0.5 {
            let k = t / 0.5;
            let offset = Vec2::new(self.drift.x * 0.5 * k, self.drift.y * 0.4 * k);
            (self.origin + offset, 1.0 - 0.3 * k)
        } else {
            let k = (t - 0.5) / 0.5;
            let offset = Vec2::new(
                self.drift.x * (0.5 + 0.5 * k),
                self.drift.y * (0.4 + 0.6 * k),
            );
            (self.origin + offset, 0.7 * (1.0 - k))
        }
    }
}

/// Live sparks of one gesture or transfer
#[derive(Clone, Debug)]
pub struct SparkField {
    sparks: Vec<Spark>,
    color: Color,
    now_ms: f64,
}

impl Default for SparkField {
    fn default() -> Self {
        Self::new(Color::from_hex(0xFFD54F))
    }
}

impl SparkField {
    pub fn new(color: Color) -> Self {
        Self {
            sparks: Vec::new(),
            color,
            now_ms: 0.0,
        }
    }

    /// Drop one trail spark near `at`
    pub fn emit_trail<R: Rng + ?Sized>(&mut self, rng: &mut R, at: Point, now_ms: f64) {
        let size = TRAIL_SIZES[rng.random_range(0..TRAIL_SIZES.len())];
        let dx = snap((rng.random::<f32>() - 0.5) * TRAIL_SPREAD, GRID);
        let dy = snap((rng.random::<f32>() - 0.5) * TRAIL_SPREAD, GRID);
        let origin = Point::new(snap(at.x, 2.0) + dx, snap(at.y, 2.0) + dy);
        let drift = Vec2::new(
            snap(dx * 1.5 + (rng.random::<f32>() - 0.5) * 12.0, GRID),
            snap(dy + 8.0 + rng.random::<f32>() * 12.0, GRID),
        );
        self.sparks.push(Spark {
            origin,
            drift,
            size,
            born_ms: now_ms,
            life_ms: 300.0 + rng.random::<f64>() * 200.0,
            stepped: true,
        });
    }

    /// Throw a ring of sparks out from `at`
    pub fn emit_burst<R: Rng + ?Sized>(&mut self, rng: &mut R, at: Point, now_ms: f64) {
        for i in 0..BURST_COUNT {
            let angle = TAU / BURST_COUNT as f32 * i as f32 + (rng.random::<f32>() - 0.5) * 0.5;
            let distance = 25.0 + rng.random::<f32>() * 20.0;
            self.sparks.push(Spark {
                origin: at,
                drift: Vec2::from_angle(angle) * distance,
                size: BURST_SIZE,
                born_ms: now_ms,
                life_ms: BURST_LIFE_MS,
                stepped: false,
            });
        }
    }

    /// Forget sparks that have faded out
    pub fn update(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
        self.sparks.retain(|s| s.is_alive(now_ms));
    }

    pub fn len(&self) -> usize {
        self.sparks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sparks.is_empty()
    }

    pub fn sparks(&self) -> &[Spark] {
        &self.sparks
    }

    pub fn clear(&mut self) {
        self.sparks.clear();
    }

    pub fn render(&self, ctx: &mut dyn DrawContext) {
        for spark in &self.sparks {
            let (position, opacity) = spark.sample(self.now_ms);
            if opacity <= 0.0 {
                continue;
            }
            let rect = Rect::new(position.x, position.y, spark.size, spark.size);
            ctx.fill_rect(
                rect,
                CornerRadius::ZERO,
                Brush::Solid(self.color.with_alpha(opacity)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinfx_core::{RecordingContext, Size};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_trail_spark_on_grid() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut field = SparkField::default();
        for i in 0..50 {
            field.emit_trail(&mut rng, Point::new(101.0, 57.0), i as f64);
        }
        for spark in field.sparks() {
            assert!(TRAIL_SIZES.contains(&spark.size));
            let dx = spark.origin.x - 102.0;
            let dy = spark.origin.y - 58.0;
            assert!(dx.abs() <= 8.0 && dx % 4.0 == 0.0, "{dx}");
            assert!(dy.abs() <= 8.0 && dy % 4.0 == 0.0, "{dy}");
            assert!((300.0..500.0).contains(&spark.life_ms));
        }
    }

    #[test]
    fn test_stepped_keyframes() {
        let spark = Spark {
            origin: Point::ZERO,
            drift: Vec2::new(12.0, 20.0),
            size: 4.0,
            born_ms: 0.0,
            life_ms: 600.0,
            stepped: true,
        };
        // Still on the first step
        assert_eq!(spark.sample(50.0), (Point::ZERO, 1.0));
        let (mid, opacity) = spark.sample(300.0);
        assert!((mid.x - 6.0).abs() < 1e-5 && (mid.y - 8.0).abs() < 1e-5);
        assert!((opacity - 0.7).abs() < 1e-6);
        let (end, opacity) = spark.sample(600.0);
        assert_eq!(end, Point::new(12.0, 20.0));
        assert_eq!(opacity, 0.0);
    }

    #[test]
    fn test_burst_ring_expires() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut field = SparkField::default();
        field.emit_burst(&mut rng, Point::new(50.0, 50.0), 1000.0);
        assert_eq!(field.len(), 5);
        for spark in field.sparks() {
            let distance = spark.drift.length();
            assert!((25.0..=45.0).contains(&distance));
        }

        field.update(1200.0);
        let mut ctx = RecordingContext::new(Size::new(200.0, 200.0));
        field.render(&mut ctx);
        assert_eq!(ctx.draw_call_count(), 5);

        field.update(1400.0);
        assert!(field.is_empty());
    }
}
