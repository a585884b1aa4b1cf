//! Effect configuration
//!
//! Every effect reads a config struct at start time. All structs deserialize
//! with `#[serde(default)]`, so a config file only names what it changes.
//! Invalid values are never fatal: [`Sanitizer`] replaces them with the
//! nearest usable value and logs a warning for each one.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cards::CardDealConfig;
use crate::drain::DrainConfig;
use crate::error::ConfigError;
use crate::pile::PileConfig;
use crate::shards::ShardConfig;
use crate::stream::StreamConfig;
use crate::title::TitleConfig;

// ============================================================================
// Ranges
// ============================================================================

/// Closed interval sampled uniformly
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A range holding a single value
    pub const fn fixed(value: f32) -> Self {
        Self::new(value, value)
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Uniform sample in `[min, max)`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.min + rng.random::<f32>() * self.span()
    }

    /// Value at `t` in 0..=1 across the range
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + t * self.span()
    }
}

// ============================================================================
// Sanitizer
// ============================================================================

/// Collects configuration findings while repairing values
#[derive(Debug, Default)]
pub struct Sanitizer {
    findings: Vec<ConfigError>,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn report(&mut self, finding: ConfigError) {
        warn!(%finding, "effect config");
        self.findings.push(finding);
    }

    /// Swap an inverted range; non-finite ends collapse onto the other end
    pub fn range(&mut self, field: &'static str, range: Range) -> Range {
        let mut range = range;
        if !range.min.is_finite() || !range.max.is_finite() {
            let bad = if range.min.is_finite() {
                range.max
            } else {
                range.min
            };
            self.report(ConfigError::NotFinite { field, value: bad });
            let fallback = [range.min, range.max]
                .into_iter()
                .find(|v| v.is_finite())
                .unwrap_or(0.0);
            range = Range::fixed(fallback);
        }
        if range.min > range.max {
            self.report(ConfigError::InvertedRange {
                field,
                min: range.min,
                max: range.max,
            });
            range = Range::new(range.max, range.min);
        }
        range
    }

    /// Range of durations or delays: sorted and never negative
    pub fn time_range(&mut self, field: &'static str, range: Range) -> Range {
        let range = self.range(field, range);
        if range.min < 0.0 {
            self.report(ConfigError::Negative {
                field,
                value: range.min,
            });
            return Range::new(range.min.max(0.0), range.max.max(0.0));
        }
        range
    }

    /// A single duration in seconds or milliseconds; never negative
    pub fn time(&mut self, field: &'static str, value: f32) -> f32 {
        if !value.is_finite() {
            self.report(ConfigError::NotFinite { field, value });
            return 0.0;
        }
        if value < 0.0 {
            self.report(ConfigError::Negative { field, value });
            return 0.0;
        }
        value
    }

    /// Any finite number
    pub fn finite(&mut self, field: &'static str, value: f32, fallback: f32) -> f32 {
        if value.is_finite() {
            value
        } else {
            self.report(ConfigError::NotFinite { field, value });
            fallback
        }
    }

    /// Clamp into `[min, max]`
    pub fn within(&mut self, field: &'static str, value: f32, min: f32, max: f32) -> f32 {
        let value = self.finite(field, value, min);
        if value < min || value > max {
            self.report(ConfigError::OutOfBounds {
                field,
                value,
                min,
                max,
            });
            return value.clamp(min, max);
        }
        value
    }

    /// Counts may be zero; the effect then completes on its first frame
    pub fn count(&mut self, field: &'static str, value: usize) -> usize {
        if value == 0 {
            self.report(ConfigError::EmptyCount { field });
        }
        value
    }

    pub fn finish(self) -> Vec<ConfigError> {
        self.findings
    }
}

/// Implemented by every effect config
pub trait EffectConfig: Sized + Clone {
    /// Repair invalid values, returning the repaired config and the findings
    fn sanitize(self) -> (Self, Vec<ConfigError>);

    /// Findings without repairing anything
    fn validate(&self) -> Vec<ConfigError> {
        self.clone().sanitize().1
    }
}

// ============================================================================
// Config File
// ============================================================================

/// One table per effect, as stored in a config file
///
/// Pile tables may be partial; missing fields come from that table's preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub drain: DrainConfig,
    pub stream: StreamConfig,
    #[serde(deserialize_with = "crate::pile::fall_table")]
    pub pile_fall: PileConfig,
    #[serde(deserialize_with = "crate::pile::float_table")]
    pub pile_float: PileConfig,
    pub cards: CardDealConfig,
    pub shards: ShardConfig,
    pub title: TitleConfig,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            drain: DrainConfig::default(),
            stream: StreamConfig::default(),
            pile_fall: PileConfig::fall(),
            pile_float: PileConfig::float(),
            cards: CardDealConfig::default(),
            shards: ShardConfig::default(),
            title: TitleConfig::default(),
        }
    }
}

impl EffectsConfig {
    /// Findings across every table
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut findings = Vec::new();
        findings.extend(self.drain.validate());
        findings.extend(self.stream.validate());
        findings.extend(self.pile_fall.validate());
        findings.extend(self.pile_float.validate());
        findings.extend(self.cards.validate());
        findings.extend(self.shards.validate());
        findings.extend(self.title.validate());
        findings
    }
}
