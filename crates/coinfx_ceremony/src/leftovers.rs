//! Leftover balances
//!
//! Spending envelopes that ended the period with money left can be dragged
//! onto the income envelope or a savings envelope. A drop only *plans* a
//! transfer; balances move when the transfer settles, which the host does from
//! the coin animation's completion callback. Settling is idempotent-checked:
//! the second attempt is rejected and changes nothing.

use rustc_hash::FxHashMap;
use serde::Serialize;
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::envelope::{demo_income, demo_savings, demo_spending, Envelope, EnvelopeId};
use crate::error::{CeremonyError, Result};

new_key_type! {
    /// Handle to a planned leftover transfer
    pub struct TransferId;
}

/// A leftover envelope and whether its balance has been moved
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeftoverEnvelope {
    pub envelope: Envelope,
    pub transferred: bool,
}

/// A transfer between a drop and its completion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingTransfer {
    pub source: EnvelopeId,
    pub target: EnvelopeId,
    pub amount: f64,
    pub settled: bool,
}

/// What the user did with their leftovers
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LeftoverDecision {
    pub kept: Vec<Envelope>,
    pub transferred: Vec<Envelope>,
}

impl LeftoverDecision {
    pub fn was_transferred(&self, id: EnvelopeId) -> bool {
        self.transferred.iter().any(|e| e.id == id)
    }
}

/// State of the leftovers step
#[derive(Clone, Debug)]
pub struct Leftovers {
    envelopes: Vec<LeftoverEnvelope>,
    targets: Vec<Envelope>,
    added: FxHashMap<EnvelopeId, f64>,
    transfers: SlotMap<TransferId, PendingTransfer>,
}

impl Leftovers {
    /// Spending envelopes with a positive balance become draggable; income and
    /// savings accept drops
    pub fn new(spending: &[Envelope], income: Envelope, savings: &[Envelope]) -> Self {
        let envelopes = spending
            .iter()
            .filter(|e| e.balance > 0.0)
            .map(|e| LeftoverEnvelope {
                envelope: e.clone(),
                transferred: false,
            })
            .collect();
        let targets = std::iter::once(income)
            .chain(savings.iter().cloned())
            .collect();
        Self {
            envelopes,
            targets,
            added: FxHashMap::default(),
            transfers: SlotMap::with_key(),
        }
    }

    pub fn demo() -> Self {
        Self::new(&demo_spending(), demo_income(), &demo_savings())
    }

    pub fn envelopes(&self) -> &[LeftoverEnvelope] {
        &self.envelopes
    }

    /// Income first, then savings
    pub fn targets(&self) -> &[Envelope] {
        &self.targets
    }

    pub fn has_leftovers(&self) -> bool {
        !self.envelopes.is_empty()
    }

    fn leftover(&self, id: EnvelopeId) -> Option<&LeftoverEnvelope> {
        self.envelopes.iter().find(|e| e.envelope.id == id)
    }

    fn in_flight(&self, id: EnvelopeId) -> bool {
        self.transfers
            .values()
            .any(|t| t.source == id && !t.settled)
    }

    /// Whether `id` can be picked up right now
    pub fn is_draggable(&self, id: EnvelopeId) -> bool {
        self.leftover(id)
            .is_some_and(|e| !e.transferred && !self.in_flight(id))
    }

    pub fn is_drop_target(&self, id: EnvelopeId) -> bool {
        self.targets.iter().any(|e| e.id == id)
    }

    /// Plan moving the whole balance of `source` into `target`
    pub fn begin_transfer(&mut self, source: EnvelopeId, target: EnvelopeId) -> Result<TransferId> {
        let amount = self
            .leftover(source)
            .ok_or(CeremonyError::UnknownEnvelope(source))?
            .envelope
            .balance;
        if !self.is_draggable(source) {
            return Err(CeremonyError::NotDraggable(source));
        }
        if !self.is_drop_target(target) {
            return Err(CeremonyError::NotDropTarget(target));
        }

        let id = self.transfers.insert(PendingTransfer {
            source,
            target,
            amount,
            settled: false,
        });
        debug!(%source, %target, amount, "leftover transfer planned");
        Ok(id)
    }

    pub fn transfer(&self, id: TransferId) -> Option<&PendingTransfer> {
        self.transfers.get(id)
    }

    /// Apply a planned transfer; returns the amount moved
    pub fn settle(&mut self, id: TransferId) -> Result<f64> {
        let transfer = self
            .transfers
            .get_mut(id)
            .ok_or(CeremonyError::UnknownTransfer(id))?;
        if transfer.settled {
            warn!(?id, "transfer settled twice");
            return Err(CeremonyError::AlreadySettled(id));
        }
        transfer.settled = true;
        let PendingTransfer {
            source,
            target,
            amount,
            ..
        } = *transfer;

        *self.added.entry(target).or_insert(0.0) += amount;
        if let Some(leftover) = self.envelopes.iter_mut().find(|e| e.envelope.id == source) {
            leftover.transferred = true;
        }
        debug!(%source, %target, amount, "leftover transfer settled");
        Ok(amount)
    }

    /// Amount settled into `target` so far
    pub fn added_to(&self, target: EnvelopeId) -> f64 {
        self.added.get(&target).copied().unwrap_or(0.0)
    }

    /// Current balance of a drop target including settled transfers
    pub fn target_balance(&self, target: EnvelopeId) -> Option<f64> {
        self.targets
            .iter()
            .find(|e| e.id == target)
            .map(|e| e.balance + self.added_to(target))
    }

    /// Split the leftover envelopes into kept and transferred
    pub fn decision(&self) -> LeftoverDecision {
        let (transferred, kept): (Vec<_>, Vec<_>) =
            self.envelopes.iter().partition(|e| e.transferred);
        LeftoverDecision {
            kept: kept.into_iter().map(|e| e.envelope.clone()).collect(),
            transferred: transferred.into_iter().map(|e| e.envelope.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROCERIES: EnvelopeId = EnvelopeId(1);
    const DINING: EnvelopeId = EnvelopeId(2);
    const EMERGENCY: EnvelopeId = EnvelopeId(101);

    #[test]
    fn test_only_positive_balances_are_leftovers() {
        let leftovers = Leftovers::demo();
        assert_eq!(leftovers.envelopes().len(), 5);
        assert!(!leftovers.is_draggable(EnvelopeId(6)));
        assert!(leftovers.is_drop_target(EnvelopeId::INCOME));
        assert!(leftovers.is_drop_target(EMERGENCY));
        assert!(!leftovers.is_drop_target(GROCERIES));
    }

    #[test]
    fn test_balance_moves_only_on_settle_and_only_once() {
        let mut leftovers = Leftovers::demo();
        let id = leftovers.begin_transfer(GROCERIES, EMERGENCY).unwrap();

        // Planned but not settled: nothing moved yet
        assert_eq!(leftovers.target_balance(EMERGENCY), Some(4500.0));
        assert!(!leftovers.is_draggable(GROCERIES));
        assert_eq!(
            leftovers.begin_transfer(GROCERIES, EnvelopeId::INCOME),
            Err(CeremonyError::NotDraggable(GROCERIES))
        );

        assert_eq!(leftovers.settle(id), Ok(45.20));
        assert_eq!(leftovers.target_balance(EMERGENCY), Some(4545.20));

        assert_eq!(leftovers.settle(id), Err(CeremonyError::AlreadySettled(id)));
        assert_eq!(leftovers.target_balance(EMERGENCY), Some(4545.20));
    }

    #[test]
    fn test_rejected_drops() {
        let mut leftovers = Leftovers::demo();
        assert_eq!(
            leftovers.begin_transfer(EnvelopeId(99), EMERGENCY),
            Err(CeremonyError::UnknownEnvelope(EnvelopeId(99)))
        );
        assert_eq!(
            leftovers.begin_transfer(GROCERIES, DINING),
            Err(CeremonyError::NotDropTarget(DINING))
        );
    }

    #[test]
    fn test_decision_split() {
        let mut leftovers = Leftovers::demo();
        let a = leftovers.begin_transfer(GROCERIES, EnvelopeId::INCOME).unwrap();
        let b = leftovers.begin_transfer(DINING, EnvelopeId::INCOME).unwrap();
        leftovers.settle(a).unwrap();
        leftovers.settle(b).unwrap();

        assert!((leftovers.added_to(EnvelopeId::INCOME) - 68.2).abs() < 1e-9);
        let decision = leftovers.decision();
        assert_eq!(decision.transferred.len(), 2);
        assert_eq!(decision.kept.len(), 3);
        assert!(decision.was_transferred(DINING));
        assert!(!decision.was_transferred(EnvelopeId(3)));
    }
}
