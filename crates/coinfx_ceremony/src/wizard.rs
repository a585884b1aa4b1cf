//! Reload wizard
//!
//! `Debrief → Leftovers → Allocation → Complete`, then back to `Debrief`.
//! The leftover decision is captured when leaving the leftovers step and seeds
//! the allocation board.

use serde::Serialize;
use tracing::debug;

use crate::allocation::{AllocationBoard, CompletionSummary};
use crate::envelope::{demo_income, demo_savings, demo_spending, Envelope};
use crate::error::{CeremonyError, Result};
use crate::leftovers::{LeftoverDecision, Leftovers};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Debrief,
    Leftovers,
    Allocation,
    Complete,
}

impl Step {
    /// One-based position, as shown by the step dots
    pub fn number(self) -> u8 {
        match self {
            Step::Debrief => 1,
            Step::Leftovers => 2,
            Step::Allocation => 3,
            Step::Complete => 4,
        }
    }
}

/// Budget the wizard is started from
#[derive(Clone, Debug)]
struct Budget {
    income: Envelope,
    spending: Vec<Envelope>,
    savings: Vec<Envelope>,
}

pub struct Ceremony {
    budget: Budget,
    step: Step,
    leftovers: Leftovers,
    decision: Option<LeftoverDecision>,
    allocation: Option<AllocationBoard>,
    summary: Option<CompletionSummary>,
}

impl Ceremony {
    pub fn new(income: Envelope, spending: Vec<Envelope>, savings: Vec<Envelope>) -> Self {
        let leftovers = Leftovers::new(&spending, income.clone(), &savings);
        Self {
            budget: Budget {
                income,
                spending,
                savings,
            },
            step: Step::Debrief,
            leftovers,
            decision: None,
            allocation: None,
            summary: None,
        }
    }

    pub fn demo() -> Self {
        Self::new(demo_income(), demo_spending(), demo_savings())
    }

    pub fn step(&self) -> Step {
        self.step
    }

    fn require(&self, expected: Step) -> Result<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CeremonyError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    fn go(&mut self, step: Step) {
        debug!(from = ?self.step, to = ?step, "ceremony step");
        self.step = step;
    }

    /// Leave the debrief
    pub fn start(&mut self) -> Result<()> {
        self.require(Step::Debrief)?;
        self.go(Step::Leftovers);
        Ok(())
    }

    pub fn leftovers(&self) -> &Leftovers {
        &self.leftovers
    }

    pub fn leftovers_mut(&mut self) -> Result<&mut Leftovers> {
        self.require(Step::Leftovers)?;
        Ok(&mut self.leftovers)
    }

    /// Capture the leftover decision and open the allocation board
    pub fn continue_to_allocation(&mut self) -> Result<&LeftoverDecision> {
        self.require(Step::Leftovers)?;
        let decision = self.leftovers.decision();
        let board = AllocationBoard::new(
            self.budget.income.clone(),
            &self.budget.spending,
            &self.budget.savings,
            Some(&decision),
        );
        self.allocation = Some(board);
        self.go(Step::Allocation);
        Ok(self.decision.insert(decision))
    }

    pub fn decision(&self) -> Option<&LeftoverDecision> {
        self.decision.as_ref()
    }

    pub fn allocation(&self) -> Option<&AllocationBoard> {
        self.allocation.as_ref()
    }

    pub fn allocation_mut(&mut self) -> Result<&mut AllocationBoard> {
        self.require(Step::Allocation)?;
        self.allocation.as_mut().ok_or(CeremonyError::WrongStep {
            expected: Step::Allocation,
            actual: self.step,
        })
    }

    /// Called once the allocation run reports completion
    pub fn complete(&mut self, summary: CompletionSummary) -> Result<()> {
        self.require(Step::Allocation)?;
        self.summary = Some(summary);
        self.go(Step::Complete);
        Ok(())
    }

    pub fn summary(&self) -> Option<CompletionSummary> {
        self.summary
    }

    /// Reset to the debrief with a fresh budget
    pub fn finish(&mut self) -> Result<()> {
        self.require(Step::Complete)?;
        let Budget {
            income,
            spending,
            savings,
        } = self.budget.clone();
        *self = Self::new(income, spending, savings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeId;

    #[test]
    fn test_full_walkthrough() {
        let mut ceremony = Ceremony::demo();
        assert_eq!(ceremony.step(), Step::Debrief);
        ceremony.start().unwrap();

        let leftovers = ceremony.leftovers_mut().unwrap();
        let id = leftovers
            .begin_transfer(EnvelopeId(1), EnvelopeId::INCOME)
            .unwrap();
        leftovers.settle(id).unwrap();

        let decision = ceremony.continue_to_allocation().unwrap();
        assert_eq!(decision.transferred.len(), 1);
        assert_eq!(
            ceremony
                .allocation()
                .and_then(|b| b.envelope(EnvelopeId(1)))
                .map(|e| e.balance),
            Some(0.0)
        );

        let board = ceremony.allocation_mut().unwrap();
        board.set_amount(EnvelopeId(2), 200.0).unwrap();
        let summary = board.plan().summary;
        ceremony.complete(summary).unwrap();
        assert_eq!(ceremony.step(), Step::Complete);
        assert_eq!(ceremony.summary().map(|s| s.envelopes), Some(1));

        ceremony.finish().unwrap();
        assert_eq!(ceremony.step(), Step::Debrief);
        assert!(ceremony.decision().is_none());
        assert!(ceremony.leftovers().is_draggable(EnvelopeId(1)));
    }

    #[test]
    fn test_out_of_order_operations_are_rejected() {
        let mut ceremony = Ceremony::demo();
        assert_eq!(
            ceremony.continue_to_allocation().err(),
            Some(CeremonyError::WrongStep {
                expected: Step::Leftovers,
                actual: Step::Debrief,
            })
        );
        assert!(ceremony.allocation_mut().is_err());
        assert!(ceremony.finish().is_err());
        assert_eq!(Step::Complete.number(), 4);
    }
}
