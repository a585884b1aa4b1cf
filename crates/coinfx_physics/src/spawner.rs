//! Ramped body spawning
//!
//! Bodies enter the world in small batches at first and larger ones as the
//! pile fills, so the start reads as a trickle and the end as a pour.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Spawn rate curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnRamp {
    /// Total bodies to spawn
    pub count: usize,
    /// Largest batch, reached as the count fills
    pub max_per_tick: usize,
    /// Minimum milliseconds between batches
    pub interval_ms: f32,
}

impl Default for SpawnRamp {
    fn default() -> Self {
        Self {
            count: 150,
            max_per_tick: 4,
            interval_ms: 20.0,
        }
    }
}

impl SpawnRamp {
    pub fn new(count: usize, max_per_tick: usize, interval_ms: f32) -> Self {
        Self {
            count,
            max_per_tick,
            interval_ms,
        }
    }
}

/// Tracks how many bodies have been spawned and when the next batch is due
#[derive(Clone, Debug)]
pub struct RampSpawner {
    ramp: SpawnRamp,
    spawned: usize,
    last_spawn_ms: f32,
}

impl RampSpawner {
    pub fn new(ramp: SpawnRamp) -> Self {
        let mut ramp = ramp;
        if ramp.max_per_tick == 0 {
            warn!("spawn ramp max_per_tick is 0, using 1");
            ramp.max_per_tick = 1;
        }
        if !ramp.interval_ms.is_finite() || ramp.interval_ms < 0.0 {
            warn!(interval = ramp.interval_ms, "invalid spawn interval, using 0");
            ramp.interval_ms = 0.0;
        }
        Self {
            ramp,
            spawned: 0,
            last_spawn_ms: 0.0,
        }
    }

    pub fn ramp(&self) -> &SpawnRamp {
        &self.ramp
    }

    pub fn spawned(&self) -> usize {
        self.spawned
    }

    pub fn remaining(&self) -> usize {
        self.ramp.count.saturating_sub(self.spawned)
    }

    pub fn is_complete(&self) -> bool {
        self.spawned >= self.ramp.count
    }

    /// Batch size for the next tick, ignoring the interval
    pub fn batch_size(&self) -> usize {
        if self.is_complete() {
            return 0;
        }
        let filled = self.spawned as f32 / self.ramp.count as f32;
        let ramped = (1.0 + filled * (self.ramp.max_per_tick - 1) as f32).floor() as usize;
        ramped.max(1).min(self.remaining())
    }

    /// Number of bodies to create at `elapsed_ms`; records them as spawned
    pub fn poll(&mut self, elapsed_ms: f32) -> usize {
        if self.is_complete() || elapsed_ms - self.last_spawn_ms <= self.ramp.interval_ms {
            return 0;
        }
        let batch = self.batch_size();
        self.spawned += batch;
        self.last_spawn_ms = elapsed_ms;
        trace!(batch, spawned = self.spawned, "spawn batch");
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(spawner: &mut RampSpawner, frames: usize) -> Vec<usize> {
        (0..frames)
            .map(|frame| spawner.poll(frame as f32 * 1000.0 / 60.0))
            .filter(|&batch| batch > 0)
            .collect()
    }

    #[test]
    fn test_ramp_for_150_is_monotonic_and_bounded() {
        let mut spawner = RampSpawner::new(SpawnRamp::new(150, 4, 20.0));
        let batches = drive(&mut spawner, 1000);

        assert_eq!(batches.iter().sum::<usize>(), 150);
        assert!(spawner.is_complete());
        assert_eq!(batches[0], 1);
        assert!(batches.iter().all(|&b| (1..=4).contains(&b)));

        // Only the final batch is cut short by what remains
        let (last, ramp) = batches.split_last().unwrap();
        assert!(ramp.windows(2).all(|w| w[0] <= w[1]));
        assert!(last <= ramp.last().unwrap());
        assert!(ramp.contains(&3));
    }

    #[test]
    fn test_uncapped_batch_size_never_shrinks() {
        let mut spawner = RampSpawner::new(SpawnRamp::new(150, 4, 0.0));
        let mut previous = 0;
        let mut elapsed = 0.0;
        while spawner.remaining() >= spawner.ramp().max_per_tick {
            let size = spawner.batch_size();
            assert!(size >= previous && size <= 4);
            previous = size;
            elapsed += 1.0;
            assert_eq!(spawner.poll(elapsed), size);
        }
        assert!(spawner.batch_size() <= spawner.remaining());
    }

    #[test]
    fn test_interval_is_strict() {
        let mut spawner = RampSpawner::new(SpawnRamp::new(10, 1, 20.0));
        assert_eq!(spawner.poll(20.0), 0);
        assert_eq!(spawner.poll(20.5), 1);
        assert_eq!(spawner.poll(30.0), 0);
        assert_eq!(spawner.poll(41.0), 1);
        assert_eq!(spawner.spawned(), 2);
    }

    #[test]
    fn test_last_batch_capped_by_remaining() {
        let mut spawner = RampSpawner::new(SpawnRamp::new(5, 10, 0.0));
        let mut total = 0;
        let mut t = 1.0;
        while !spawner.is_complete() {
            total += spawner.poll(t);
            t += 1.0;
        }
        assert_eq!(total, 5);
        assert_eq!(spawner.remaining(), 0);
        assert_eq!(spawner.poll(t), 0);
    }

    #[test]
    fn test_degenerate_ramps() {
        let mut empty = RampSpawner::new(SpawnRamp::new(0, 4, 20.0));
        assert!(empty.is_complete());
        assert_eq!(empty.poll(100.0), 0);

        let zero_rate = RampSpawner::new(SpawnRamp::new(3, 0, 20.0));
        assert_eq!(zero_rate.ramp().max_per_tick, 1);
        assert_eq!(zero_rate.batch_size(), 1);
    }
}
