//! Envelopes
//!
//! A budget is a set of envelopes: spending envelopes refilled every period,
//! savings envelopes that accumulate towards an optional target, and the income
//! envelope everything is funded from.

use std::fmt;

use coinfx_core::Color;
use serde::{Deserialize, Serialize};

/// Envelope identifier; the income envelope is always `EnvelopeId::INCOME`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvelopeId(pub u32);

impl EnvelopeId {
    pub const INCOME: EnvelopeId = EnvelopeId(0);
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Income,
    Spending,
    Savings,
}

/// One envelope and its recent history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub name: String,
    pub kind: EnvelopeKind,
    /// Badge color as 0xRRGGBB
    pub color: u32,
    pub balance: f64,
    pub suggested: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    /// Oldest first, one entry per month in [`HISTORY_MONTHS`]
    #[serde(default)]
    pub history: Vec<f64>,
}

impl Envelope {
    pub fn new(id: u32, name: impl Into<String>, kind: EnvelopeKind, color: u32) -> Self {
        Self {
            id: EnvelopeId(id),
            name: name.into(),
            kind,
            color,
            balance: 0.0,
            suggested: 0.0,
            target: None,
            history: Vec::new(),
        }
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_suggested(mut self, suggested: f64) -> Self {
        self.suggested = suggested;
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_history(mut self, history: impl Into<Vec<f64>>) -> Self {
        self.history = history.into();
        self
    }

    pub fn is_savings(&self) -> bool {
        self.kind == EnvelopeKind::Savings
    }

    pub fn is_income(&self) -> bool {
        self.kind == EnvelopeKind::Income
    }

    pub fn badge_color(&self) -> Color {
        Color::from_hex(self.color)
    }

    /// Fraction of the savings target reached, if there is a target
    pub fn target_progress(&self) -> Option<f64> {
        self.target
            .filter(|t| *t > 0.0)
            .map(|t| (self.balance / t).clamp(0.0, 1.0))
    }

    pub fn stats(&self) -> SpendingStats {
        SpendingStats::from_history(&self.history)
    }
}

/// Summary of an envelope's spending history
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingStats {
    /// Mean of the history, rounded to whole dollars
    pub average: f64,
    /// Latest month minus the oldest; zero with fewer than two months
    pub trend: f64,
    /// Largest single month
    pub peak: f64,
}

impl SpendingStats {
    pub fn from_history(history: &[f64]) -> Self {
        if history.is_empty() {
            return Self::default();
        }
        let average = (history.iter().sum::<f64>() / history.len() as f64).round();
        let trend = match (history.first(), history.last()) {
            (Some(first), Some(last)) if history.len() >= 2 => last - first,
            _ => 0.0,
        };
        let peak = history.iter().copied().fold(f64::MIN, f64::max);
        Self {
            average,
            trend,
            peak,
        }
    }
}

// ============================================================================
// Demo Data
// ============================================================================

/// Month labels for three-month histories
pub const HISTORY_MONTHS: [&str; 3] = ["Nov", "Dec", "Jan"];

/// Income available to allocate in the demo budget
pub const DEMO_INCOME: f64 = 1200.0;

pub fn demo_income() -> Envelope {
    Envelope::new(0, "Income", EnvelopeKind::Income, 0x9575cd).with_balance(DEMO_INCOME)
}

pub fn demo_spending() -> Vec<Envelope> {
    use EnvelopeKind::Spending;
    vec![
        Envelope::new(1, "Groceries", Spending, 0xe57373)
            .with_balance(45.20)
            .with_suggested(600.0)
            .with_history([580.0, 620.0, 595.0]),
        Envelope::new(2, "Dining Out", Spending, 0x9575cd)
            .with_balance(23.0)
            .with_suggested(200.0)
            .with_history([185.0, 220.0, 190.0]),
        Envelope::new(3, "Transport", Spending, 0xf06292)
            .with_balance(38.50)
            .with_suggested(150.0)
            .with_history([140.0, 165.0, 145.0]),
        Envelope::new(4, "Entertainment", Spending, 0x7986cb)
            .with_balance(35.0)
            .with_suggested(100.0)
            .with_history([85.0, 110.0, 95.0]),
        Envelope::new(5, "Appearance", Spending, 0x81c784)
            .with_balance(15.0)
            .with_suggested(60.0)
            .with_history([45.0, 80.0, 55.0]),
        Envelope::new(6, "Recurring", Spending, 0x4db6ac)
            .with_suggested(80.0)
            .with_history([80.0, 80.0, 80.0]),
        Envelope::new(7, "Household", Spending, 0x64b5f6)
            .with_suggested(50.0)
            .with_history([35.0, 65.0, 48.0]),
        Envelope::new(8, "Gifts", Spending, 0xffb74d)
            .with_suggested(100.0)
            .with_history([0.0, 150.0, 85.0]),
    ]
}

pub fn demo_savings() -> Vec<Envelope> {
    use EnvelopeKind::Savings;
    vec![
        Envelope::new(101, "Emergency", Savings, 0x4db6ac)
            .with_balance(4500.0)
            .with_target(10000.0)
            .with_suggested(200.0)
            .with_history([200.0, 200.0, 200.0]),
        Envelope::new(102, "Holiday", Savings, 0x4dd0e1)
            .with_balance(1200.0)
            .with_target(3000.0)
            .with_suggested(150.0)
            .with_history([150.0, 150.0, 150.0]),
        Envelope::new(103, "Tech Fund", Savings, 0x7986cb)
            .with_balance(800.0)
            .with_target(1500.0)
            .with_suggested(100.0)
            .with_history([100.0, 100.0, 100.0]),
    ]
}

/// Highlight shown on the debrief step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DebriefCard {
    pub title: &'static str,
    pub value: &'static str,
    pub description: &'static str,
}

pub const DEMO_DEBRIEF: [DebriefCard; 3] = [
    DebriefCard {
        title: "Big Spender",
        value: "$342",
        description: "Largest purchase at Noel Leeming",
    },
    DebriefCard {
        title: "High Traffic",
        value: "47",
        description: "47 transactions in Groceries",
    },
    DebriefCard {
        title: "Ghost Town",
        value: "$0",
        description: "No activity in Clothing",
    },
];

/// Totals of the period that just ended
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RoundSummary {
    pub start: &'static str,
    pub end: &'static str,
    pub budgeted: f64,
    pub spent: f64,
    pub leftover: f64,
}

pub const DEMO_ROUND: RoundSummary = RoundSummary {
    start: "Jan 1",
    end: "Jan 31",
    budgeted: 1340.0,
    spent: 1183.0,
    leftover: 157.0,
};
