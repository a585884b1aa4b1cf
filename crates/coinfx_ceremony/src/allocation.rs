//! Allocation board
//!
//! Income is split across spending and savings envelopes. When the total goes
//! past the income the difference is drawn from one savings envelope (the
//! *funding* envelope); while that happens no savings envelope may receive an
//! allocation, and any savings allocations are cleared.
//!
//! Completing the board yields an [`AllocationPlan`]: one coin transfer per
//! allocated envelope from income, plus a second one from the funding savings
//! envelope for the share above income. An [`AllocationRun`] counts landings
//! and reports completion exactly once.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::envelope::{demo_income, demo_savings, demo_spending, Envelope, EnvelopeId};
use crate::error::{CeremonyError, Result};
use crate::leftovers::LeftoverDecision;
use crate::transfer::{allocation_coins, TransferConfig};

/// Step used by the +/- controls
pub const ADJUST_STEP: f64 = 25.0;

/// Stagger between envelopes when the plan is animated
pub const ENVELOPE_STAGGER_MS: f32 = 150.0;

/// Extra offset of the savings stream relative to the income stream
pub const SAVINGS_STREAM_OFFSET_MS: f32 = 75.0;

/// Pause between the last landing and the completion step
pub const COMPLETE_DELAY_MS: f32 = 300.0;

/// Fill levels of the income / savings progress bar, in percent
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Progress {
    pub income: f64,
    pub savings: f64,
}

/// Allocation state for one period
#[derive(Clone, Debug)]
pub struct AllocationBoard {
    /// Spending first, then savings
    envelopes: Vec<Envelope>,
    allocations: FxHashMap<EnvelopeId, f64>,
    income: Envelope,
    funding: Option<EnvelopeId>,
}

impl AllocationBoard {
    /// Spending envelopes whose leftovers were transferred start from zero
    pub fn new(
        income: Envelope,
        spending: &[Envelope],
        savings: &[Envelope],
        decision: Option<&LeftoverDecision>,
    ) -> Self {
        let envelopes: Vec<Envelope> = spending
            .iter()
            .map(|e| {
                let transferred = decision.is_some_and(|d| d.was_transferred(e.id));
                if transferred {
                    e.clone().with_balance(0.0)
                } else {
                    e.clone()
                }
            })
            .chain(savings.iter().cloned())
            .collect();

        let funding = savings
            .iter()
            .find(|e| e.balance > 0.0)
            .or_else(|| savings.first())
            .map(|e| e.id);

        Self {
            allocations: envelopes.iter().map(|e| (e.id, 0.0)).collect(),
            envelopes,
            income,
            funding,
        }
    }

    pub fn demo(decision: Option<&LeftoverDecision>) -> Self {
        Self::new(demo_income(), &demo_spending(), &demo_savings(), decision)
    }

    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    pub fn envelope(&self, id: EnvelopeId) -> Option<&Envelope> {
        self.envelopes.iter().find(|e| e.id == id)
    }

    fn savings(&self) -> impl Iterator<Item = &Envelope> {
        self.envelopes.iter().filter(|e| e.is_savings())
    }

    pub fn income(&self) -> f64 {
        self.income.balance
    }

    pub fn allocation(&self, id: EnvelopeId) -> f64 {
        self.allocations.get(&id).copied().unwrap_or(0.0)
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocations.values().sum()
    }

    pub fn funding_savings(&self) -> Option<&Envelope> {
        self.funding.and_then(|id| self.envelope(id))
    }

    /// Income plus the funding savings balance
    pub fn pool(&self) -> f64 {
        self.income() + self.funding_savings().map_or(0.0, |e| e.balance)
    }

    pub fn remaining(&self) -> f64 {
        self.pool() - self.total_allocated()
    }

    /// Amount drawn from the funding savings envelope
    pub fn savings_usage(&self) -> f64 {
        (self.total_allocated() - self.income()).max(0.0)
    }

    pub fn is_using_savings(&self) -> bool {
        self.savings_usage() > 0.0
    }

    pub fn income_remaining(&self) -> f64 {
        (self.income() - self.total_allocated()).max(0.0)
    }

    /// Whether `id` may receive more money right now
    pub fn can_allocate(&self, id: EnvelopeId) -> bool {
        match self.envelope(id) {
            Some(e) => !(e.is_savings() && self.is_using_savings()),
            None => false,
        }
    }

    /// Add `delta` (typically ±[`ADJUST_STEP`]) to an envelope
    pub fn adjust(&mut self, id: EnvelopeId, delta: f64) -> Result<f64> {
        let current = self.allocation(id);
        self.set_amount(id, current + delta)
    }

    /// Set an envelope's allocation, clamped to `[0, remaining + current]`
    pub fn set_amount(&mut self, id: EnvelopeId, amount: f64) -> Result<f64> {
        let envelope = self.envelope(id).ok_or(CeremonyError::UnknownEnvelope(id))?;
        let current = self.allocation(id);
        if envelope.is_savings() && self.is_using_savings() && amount > current {
            return Err(CeremonyError::AllocationBlocked(id));
        }

        let max = self.remaining() + current;
        let amount = amount.min(max).max(0.0);
        self.allocations.insert(id, amount);
        trace!(%id, amount, "allocation set");
        self.clear_blocked_savings();
        Ok(amount)
    }

    /// Allocate the envelope's suggested amount
    pub fn use_suggested(&mut self, id: EnvelopeId) -> Result<f64> {
        let suggested = self
            .envelope(id)
            .ok_or(CeremonyError::UnknownEnvelope(id))?
            .suggested;
        self.set_amount(id, suggested)
    }

    fn clear_blocked_savings(&mut self) {
        if !self.is_using_savings() {
            return;
        }
        let ids: Vec<EnvelopeId> = self
            .savings()
            .filter(|e| self.allocation(e.id) > 0.0)
            .map(|e| e.id)
            .collect();
        for id in ids {
            debug!(%id, "clearing savings allocation while drawing from savings");
            self.allocations.insert(id, 0.0);
        }
    }

    /// Switch the funding envelope to the next savings envelope, wrapping
    pub fn cycle_funding(&mut self) -> Option<EnvelopeId> {
        let ids: Vec<EnvelopeId> = self.savings().map(|e| e.id).collect();
        if ids.is_empty() {
            return None;
        }
        let next = match self.funding.and_then(|f| ids.iter().position(|id| *id == f)) {
            Some(i) => ids[(i + 1) % ids.len()],
            None => ids[0],
        };
        self.funding = Some(next);
        debug!(funding = %next, "funding savings changed");
        self.funding
    }

    /// Fill spending from income first, then savings with what is left
    pub fn auto_fill(&mut self) {
        let mut budget = self.income();

        let spending_suggested: f64 = self
            .envelopes
            .iter()
            .filter(|e| !e.is_savings())
            .map(|e| e.suggested)
            .sum();
        let spending_scale = scale_to(budget, spending_suggested);
        for e in self.envelopes.iter().filter(|e| !e.is_savings()) {
            let amount = (e.suggested * spending_scale).round();
            self.allocations.insert(e.id, amount);
            budget -= amount;
        }

        let savings_suggested: f64 = self.savings().map(|e| e.suggested).sum();
        let savings_scale = if budget > 0.0 {
            scale_to(budget, savings_suggested)
        } else {
            0.0
        };
        for e in self.envelopes.iter().filter(|e| e.is_savings()) {
            self.allocations
                .insert(e.id, (e.suggested * savings_scale).round());
        }

        debug!(total = self.total_allocated(), "auto-filled allocations");
    }

    pub fn clear(&mut self) {
        self.allocations.values_mut().for_each(|v| *v = 0.0);
    }

    pub fn progress(&self) -> Progress {
        let total = self.total_allocated();
        let income = self.income();
        if self.is_using_savings() {
            Progress {
                income: income / total * 100.0,
                savings: self.savings_usage() / total * 100.0,
            }
        } else if income > 0.0 {
            Progress {
                income: (total / income * 100.0).min(100.0),
                savings: 0.0,
            }
        } else {
            Progress::default()
        }
    }

    /// Transfers that animate the allocation, in envelope order
    pub fn plan(&self) -> AllocationPlan {
        let total = self.total_allocated();
        let using_savings = self.is_using_savings();
        let income_ratio = if using_savings { self.income() / total } else { 1.0 };

        let mut transfers = Vec::new();
        let mut envelopes = 0;
        for e in self.envelopes.iter().filter(|e| self.allocation(e.id) > 0.0) {
            let amount = self.allocation(e.id);
            let from_income = (amount * income_ratio).round();
            let from_savings = amount - from_income;
            let delay_ms = envelopes as f32 * ENVELOPE_STAGGER_MS;
            envelopes += 1;

            transfers.push(PlannedTransfer {
                from: self.income.id,
                to: e.id,
                amount: from_income,
                delay_ms,
            });
            let Some(funding) = self.funding else {
                continue;
            };
            if using_savings && from_savings > 0.0 {
                transfers.push(PlannedTransfer {
                    from: funding,
                    to: e.id,
                    amount: from_savings,
                    delay_ms: delay_ms + SAVINGS_STREAM_OFFSET_MS,
                });
            }
        }

        debug!(total, envelopes, transfers = transfers.len(), "allocation planned");
        AllocationPlan {
            transfers,
            summary: CompletionSummary { total, envelopes },
        }
    }
}

fn scale_to(budget: f64, suggested: f64) -> f64 {
    if suggested > 0.0 {
        (budget / suggested).min(1.0)
    } else {
        0.0
    }
}

// ============================================================================
// Plan and Run
// ============================================================================

/// One coin stream of the allocation animation
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlannedTransfer {
    pub from: EnvelopeId,
    pub to: EnvelopeId,
    pub amount: f64,
    pub delay_ms: f32,
}

impl PlannedTransfer {
    pub fn coins(&self) -> usize {
        allocation_coins(self.amount)
    }

    pub fn config(&self) -> TransferConfig {
        TransferConfig::allocation(self.amount, self.delay_ms)
    }
}

/// Shown on the completion step
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CompletionSummary {
    pub total: f64,
    pub envelopes: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AllocationPlan {
    pub transfers: Vec<PlannedTransfer>,
    pub summary: CompletionSummary,
}

/// Tracks landings of a plan's transfers
#[derive(Clone, Debug)]
pub struct AllocationRun {
    summary: CompletionSummary,
    landed: Vec<bool>,
    complete: bool,
}

impl AllocationRun {
    pub fn new(plan: &AllocationPlan) -> Self {
        Self {
            summary: plan.summary,
            landed: vec![false; plan.transfers.len()],
            complete: false,
        }
    }

    pub fn pending(&self) -> usize {
        self.landed.iter().filter(|l| !**l).count()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Record that transfer `index` landed. Returns the summary on the
    /// landing that completes the run; repeated landings are ignored.
    pub fn land(&mut self, index: usize) -> Result<Option<CompletionSummary>> {
        if self.complete {
            return Err(CeremonyError::RunComplete);
        }
        match self.landed.get_mut(index) {
            Some(landed) if !*landed => *landed = true,
            _ => {
                trace!(index, "ignoring repeated or unknown landing");
                return Ok(None);
            }
        }
        Ok(self.try_complete())
    }

    /// Completes a run with nothing to animate
    pub fn finish_empty(&mut self) -> Result<Option<CompletionSummary>> {
        if self.complete {
            return Err(CeremonyError::RunComplete);
        }
        Ok(self.try_complete())
    }

    fn try_complete(&mut self) -> Option<CompletionSummary> {
        if self.pending() > 0 {
            return None;
        }
        self.complete = true;
        debug!(total = self.summary.total, "allocation run complete");
        Some(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROCERIES: EnvelopeId = EnvelopeId(1);
    const DINING: EnvelopeId = EnvelopeId(2);
    const EMERGENCY: EnvelopeId = EnvelopeId(101);
    const HOLIDAY: EnvelopeId = EnvelopeId(102);

    #[test]
    fn test_pool_and_remaining() {
        let mut board = AllocationBoard::demo(None);
        assert_eq!(board.funding_savings().map(|e| e.id), Some(EMERGENCY));
        assert_eq!(board.pool(), 5700.0);

        board.set_amount(GROCERIES, 500.0).unwrap();
        assert_eq!(board.remaining(), 5200.0);
        assert_eq!(board.income_remaining(), 700.0);
        assert!(!board.is_using_savings());
        assert_eq!(board.progress().savings, 0.0);
    }

    #[test]
    fn test_adjust_clamps_to_available() {
        let mut board = AllocationBoard::demo(None);
        assert_eq!(board.adjust(DINING, -ADJUST_STEP), Ok(0.0));
        assert_eq!(board.adjust(DINING, ADJUST_STEP), Ok(25.0));
        assert_eq!(board.set_amount(GROCERIES, 1_000_000.0), Ok(5675.0));
        assert_eq!(board.remaining(), 0.0);
        assert_eq!(board.adjust(DINING, ADJUST_STEP), Ok(25.0));
    }

    #[test]
    fn test_savings_blocked_while_drawing_from_savings() {
        let mut board = AllocationBoard::demo(None);
        board.set_amount(HOLIDAY, 100.0).unwrap();
        assert_eq!(board.allocation(HOLIDAY), 100.0);

        // Pushing spending past income clears the savings allocation
        board.set_amount(GROCERIES, 1250.0).unwrap();
        assert!(board.is_using_savings());
        assert_eq!(board.allocation(HOLIDAY), 0.0);
        assert_eq!(board.savings_usage(), 50.0);

        assert!(!board.can_allocate(HOLIDAY));
        assert_eq!(
            board.adjust(HOLIDAY, ADJUST_STEP),
            Err(CeremonyError::AllocationBlocked(HOLIDAY))
        );
        assert_eq!(board.adjust(HOLIDAY, -ADJUST_STEP), Ok(0.0));
    }

    #[test]
    fn test_use_suggested() {
        let mut board = AllocationBoard::demo(None);
        assert_eq!(board.use_suggested(GROCERIES), Ok(600.0));
        assert_eq!(
            board.use_suggested(EnvelopeId(77)),
            Err(CeremonyError::UnknownEnvelope(EnvelopeId(77)))
        );
    }

    #[test]
    fn test_cycle_funding_wraps() {
        let mut board = AllocationBoard::demo(None);
        assert_eq!(board.cycle_funding(), Some(HOLIDAY));
        assert_eq!(board.cycle_funding(), Some(EnvelopeId(103)));
        assert_eq!(board.cycle_funding(), Some(EMERGENCY));
    }

    #[test]
    fn test_auto_fill_scales_spending_to_income() {
        let mut board = AllocationBoard::demo(None);
        board.auto_fill();

        // Suggested spending is 1340 against 1200 income
        assert_eq!(board.allocation(GROCERIES), 537.0);
        assert_eq!(board.allocation(DINING), 179.0);
        assert_eq!(board.allocation(EMERGENCY), 0.0);
        // Rounding overshoots income by a dollar
        assert_eq!(board.total_allocated(), 1201.0);
        assert_eq!(board.savings_usage(), 1.0);

        board.clear();
        assert_eq!(board.total_allocated(), 0.0);
    }

    #[test]
    fn test_auto_fill_gives_savings_the_rest() {
        let income = demo_income().with_balance(1500.0);
        let mut board = AllocationBoard::new(income, &demo_spending(), &demo_savings(), None);
        board.auto_fill();

        // 160 left after spending, against 450 suggested savings
        assert_eq!(board.allocation(GROCERIES), 600.0);
        assert_eq!(board.allocation(EMERGENCY), 71.0);
        assert_eq!(board.allocation(HOLIDAY), 53.0);
        assert_eq!(board.allocation(EnvelopeId(103)), 36.0);
        assert!(!board.is_using_savings());
    }

    #[test]
    fn test_progress_when_drawing_from_savings() {
        let mut board = AllocationBoard::demo(None);
        board.set_amount(GROCERIES, 1500.0).unwrap();
        let progress = board.progress();
        assert!((progress.income - 80.0).abs() < 1e-9);
        assert!((progress.savings - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_splits_between_income_and_savings() {
        let mut board = AllocationBoard::demo(None);
        board.set_amount(GROCERIES, 900.0).unwrap();
        board.set_amount(DINING, 600.0).unwrap();
        let plan = board.plan();

        assert_eq!(plan.summary, CompletionSummary { total: 1500.0, envelopes: 2 });
        assert_eq!(plan.transfers.len(), 4);
        assert_eq!(plan.transfers[0].amount, 720.0);
        assert_eq!(plan.transfers[1].from, EMERGENCY);
        assert_eq!(plan.transfers[1].amount, 180.0);
        assert_eq!(plan.transfers[1].delay_ms, 75.0);
        assert_eq!(plan.transfers[2].delay_ms, 150.0);
        assert_eq!(plan.transfers[2].coins(), 3);
        assert_eq!(plan.transfers[3].delay_ms, 225.0);
    }

    #[test]
    fn test_run_completes_once() {
        let mut board = AllocationBoard::demo(None);
        board.set_amount(GROCERIES, 300.0).unwrap();
        board.set_amount(DINING, 200.0).unwrap();
        let plan = board.plan();
        let mut run = AllocationRun::new(&plan);

        assert_eq!(run.land(1), Ok(None));
        assert_eq!(run.land(1), Ok(None));
        assert_eq!(run.pending(), 1);
        assert_eq!(run.land(0), Ok(Some(plan.summary)));
        assert!(run.is_complete());
        assert_eq!(run.land(0), Err(CeremonyError::RunComplete));
    }

    #[test]
    fn test_transferred_leftovers_start_at_zero() {
        let decision = LeftoverDecision {
            kept: Vec::new(),
            transferred: vec![demo_spending()[0].clone()],
        };
        let board = AllocationBoard::demo(Some(&decision));
        assert_eq!(board.envelope(GROCERIES).map(|e| e.balance), Some(0.0));
        assert_eq!(board.envelope(DINING).map(|e| e.balance), Some(23.0));

        let mut empty = AllocationRun::new(&board.plan());
        assert_eq!(empty.finish_empty(), Ok(Some(CompletionSummary::default())));
    }
}
