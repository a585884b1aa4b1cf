//! Haptic feedback
//!
//! Hosts implement [`Haptics`] over whatever vibration API the platform has.
//! Shared handles (`Rc<RefCell<H>>`) let a gesture and the transfers it starts
//! buzz the same device.

use std::cell::RefCell;
use std::rc::Rc;

/// A vibration motor
pub trait Haptics {
    /// Vibrate for `ms` milliseconds
    fn vibrate(&mut self, ms: u32);
}

impl<H: Haptics + ?Sized> Haptics for Rc<RefCell<H>> {
    fn vibrate(&mut self, ms: u32) {
        self.borrow_mut().vibrate(ms)
    }
}

impl<H: Haptics + ?Sized> Haptics for Box<H> {
    fn vibrate(&mut self, ms: u32) {
        (**self).vibrate(ms)
    }
}

/// Devices without a vibration motor
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&mut self, _ms: u32) {}
}

/// Remembers every pulse; used by tests and the headless runner
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingHaptics {
    pulses: Vec<u32>,
}

impl RecordingHaptics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> &[u32] {
        &self.pulses
    }

    pub fn total_ms(&self) -> u32 {
        self.pulses.iter().sum()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }
}

impl Haptics for RecordingHaptics {
    fn vibrate(&mut self, ms: u32) {
        self.pulses.push(ms);
    }
}

// ============================================================================
// Creak
// ============================================================================

/// Creak pulses grow faster and longer as the drag tension rises
///
/// The last pulse time belongs to the gesture instance, so two boxes dragged
/// at once never share a rhythm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Creak {
    pub interval_max_ms: f64,
    pub interval_min_ms: f64,
    pub buzz_ms: f32,
    last_ms: Option<f64>,
}

impl Default for Creak {
    fn default() -> Self {
        Self {
            interval_max_ms: 120.0,
            interval_min_ms: 25.0,
            buzz_ms: 8.0,
            last_ms: None,
        }
    }
}

impl Creak {
    /// Milliseconds between pulses at `tension`
    pub fn interval(&self, tension: f32) -> f64 {
        self.interval_max_ms - tension as f64 * (self.interval_max_ms - self.interval_min_ms)
    }

    /// Pulse length at `tension`
    pub fn buzz(&self, tension: f32) -> u32 {
        (self.buzz_ms + tension * 8.0).round() as u32
    }

    /// Buzz if `tension` is strictly inside (0, 1) and the interval has passed
    pub fn tick(&mut self, tension: f32, now_ms: f64, haptics: &mut dyn Haptics) -> bool {
        if !(tension > 0.0 && tension < 1.0) {
            return false;
        }
        let due = match self.last_ms {
            Some(last) => now_ms - last >= self.interval(tension),
            None => true,
        };
        if due {
            haptics.vibrate(self.buzz(tension));
            self.last_ms = Some(now_ms);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creak_curve() {
        let creak = Creak::default();
        assert_eq!(creak.interval(0.0), 120.0);
        assert!((creak.interval(0.5) - 72.5).abs() < 1e-9);
        assert_eq!(creak.buzz(0.0), 8);
        assert_eq!(creak.buzz(0.5), 12);
    }

    #[test]
    fn test_creak_only_inside_open_interval() {
        let mut creak = Creak::default();
        let mut haptics = RecordingHaptics::new();
        assert!(!creak.tick(0.0, 0.0, &mut haptics));
        assert!(!creak.tick(1.0, 0.0, &mut haptics));
        assert!(creak.tick(0.5, 0.0, &mut haptics));
        // Within the 72.5 ms interval
        assert!(!creak.tick(0.5, 50.0, &mut haptics));
        assert!(creak.tick(0.5, 80.0, &mut haptics));
        assert_eq!(haptics.pulses(), &[12, 12]);
    }

    #[test]
    fn test_shared_handle() {
        let shared = Rc::new(RefCell::new(RecordingHaptics::new()));
        let mut a = shared.clone();
        let mut b: Box<dyn Haptics> = Box::new(shared.clone());
        a.vibrate(20);
        b.vibrate(8);
        assert_eq!(shared.borrow().pulses(), &[20, 8]);
    }
}
