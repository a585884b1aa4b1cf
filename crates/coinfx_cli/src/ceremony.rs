//! Scripted reload ceremony
//!
//! Walks the demo budget through the wizard the way a user would: drags the
//! first leftover onto the income envelope, lets the coin transfer land, then
//! auto-fills the allocation and animates every planned transfer. Balances
//! only change from the completion of each animation.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use coinfx_animation::{AnimationHost, AnimationId};
use coinfx_ceremony::{
    AllocationRun, Ceremony, CoinTransfer, CompletionSummary, DragGesture, DropOutcome, DropTargets,
    EnvelopeId, GestureConfig, RecordingHaptics, TransferConfig, TransferId,
};
use coinfx_core::{Point, RecordingContext, Rect, Size, Vec2};
use serde::Serialize;
use tracing::{debug, info};

use crate::runner::{DEFAULT_VIEWPORT, FRAME_MS};

/// Frames a single transfer batch may take before the script gives up
const MAX_TRANSFER_FRAMES: u64 = 60 * 30;

#[derive(Debug, Clone, Serialize)]
pub struct DragReport {
    pub source: String,
    pub target: String,
    pub amount: f64,
    pub haptic_pulses: usize,
    pub haptic_ms: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationLine {
    pub envelope: String,
    pub from: String,
    pub amount: f64,
    pub coins: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CeremonyReport {
    pub seed: u64,
    pub drag: DragReport,
    pub income_after_leftovers: f64,
    pub kept: Vec<String>,
    pub transferred: Vec<String>,
    pub allocations: Vec<AllocationLine>,
    pub from_savings: f64,
    pub summary: CompletionSummary,
    pub frames: u64,
}

/// Screen positions of the envelopes
struct Layout {
    viewport: Size,
}

impl Layout {
    fn income(&self) -> Rect {
        Rect::new(16.0, 40.0, self.viewport.width - 32.0, 110.0)
    }

    /// Two-column grid below the income envelope
    fn grid(&self, index: usize) -> Rect {
        let width = (self.viewport.width - 48.0) / 2.0;
        let col = (index % 2) as f32;
        let row = (index / 2) as f32;
        Rect::new(16.0 + col * (width + 16.0), 180.0 + row * 100.0, width, 88.0)
    }

    /// Savings drop targets along the bottom edge
    fn savings(&self, index: usize) -> Rect {
        let width = (self.viewport.width - 64.0) / 3.0;
        Rect::new(
            16.0 + index as f32 * (width + 16.0),
            self.viewport.height - 120.0,
            width,
            90.0,
        )
    }
}

pub fn run(seed: u64) -> Result<CeremonyReport> {
    let layout = Layout {
        viewport: DEFAULT_VIEWPORT,
    };
    let haptics = Rc::new(RefCell::new(RecordingHaptics::new()));
    let mut ceremony = Ceremony::demo();
    let mut clock = 0.0;
    let mut frames = 0;

    ceremony.start()?;

    // ------------------------------------------------------------------------
    // Leftovers: drag the first leftover onto income
    // ------------------------------------------------------------------------

    let mut targets = DropTargets::new();
    targets.set(EnvelopeId::INCOME, layout.income());
    for (i, target) in ceremony.leftovers().targets().iter().skip(1).enumerate() {
        targets.set(target.id, layout.savings(i));
    }

    let source = ceremony
        .leftovers()
        .envelopes()
        .first()
        .map(|e| e.envelope.id)
        .ok_or_else(|| anyhow!("demo budget has no leftovers"))?;
    let source_rect = layout.grid(0);
    let income_center = layout.income().center();

    let drop = drag(
        source,
        source_rect,
        income_center,
        &targets,
        &haptics,
        &mut clock,
        seed,
    )?;
    let transfer_id = ceremony.leftovers_mut()?.begin_transfer(drop.source, drop.target)?;
    let amount = ceremony
        .leftovers()
        .transfer(transfer_id)
        .map(|t| t.amount)
        .context("planned transfer vanished")?;

    let transfer = CoinTransfer::new(
        TransferConfig::leftover(),
        source_rect.center(),
        income_center,
        layout.viewport,
        Box::new(haptics.clone()),
        seed,
    )
    .with_badge(amount, income_center);

    let mut host = AnimationHost::new();
    let mounted: Vec<(AnimationId, TransferId)> = vec![(
        host.start(RecordingContext::new(layout.viewport), transfer),
        transfer_id,
    )];
    frames += drive(&mut host, &mut clock, |id| {
        if let Some((_, transfer)) = mounted.iter().find(|(m, _)| *m == id) {
            ceremony.leftovers_mut()?.settle(*transfer)?;
        }
        Ok(())
    })?;

    let names = |id: EnvelopeId| {
        ceremony
            .leftovers()
            .targets()
            .iter()
            .chain(ceremony.leftovers().envelopes().iter().map(|e| &e.envelope))
            .find(|e| e.id == id)
            .map_or_else(|| id.to_string(), |e| e.name.clone())
    };
    let drag_report = DragReport {
        source: names(drop.source),
        target: names(drop.target),
        amount,
        haptic_pulses: haptics.borrow().pulses().len(),
        haptic_ms: haptics.borrow().total_ms(),
    };
    let income_after_leftovers = ceremony
        .leftovers()
        .target_balance(EnvelopeId::INCOME)
        .unwrap_or(0.0);
    info!(
        "Moved ${:.2} from {} to {}",
        amount, drag_report.source, drag_report.target
    );

    // ------------------------------------------------------------------------
    // Allocation: auto-fill and animate the plan
    // ------------------------------------------------------------------------

    let decision = ceremony.continue_to_allocation()?.clone();
    let board = ceremony.allocation_mut()?;
    board.auto_fill();
    let plan = board.plan();
    let from_savings = board.savings_usage();

    let position = |id: EnvelopeId| -> Point {
        if id == EnvelopeId::INCOME {
            return layout.income().center();
        }
        let index = board
            .envelopes()
            .iter()
            .position(|e| e.id == id)
            .unwrap_or(0);
        layout.grid(index).center()
    };
    let name = |id: EnvelopeId| {
        board
            .envelope(id)
            .map_or_else(|| "Income".to_string(), |e| e.name.clone())
    };

    let mut allocations = Vec::with_capacity(plan.transfers.len());
    let mut mounted = Vec::with_capacity(plan.transfers.len());
    for (i, planned) in plan.transfers.iter().enumerate() {
        let transfer = CoinTransfer::new(
            planned.config(),
            position(planned.from),
            position(planned.to),
            layout.viewport,
            Box::new(haptics.clone()),
            seed.wrapping_add(i as u64 + 1),
        );
        mounted.push((host.start(RecordingContext::new(layout.viewport), transfer), i));
        allocations.push(AllocationLine {
            envelope: name(planned.to),
            from: name(planned.from),
            amount: planned.amount,
            coins: planned.coins(),
        });
    }

    let mut run = AllocationRun::new(&plan);
    let mut summary = if plan.transfers.is_empty() {
        run.finish_empty()?
    } else {
        None
    };
    frames += drive(&mut host, &mut clock, |id| {
        if let Some((_, index)) = mounted.iter().find(|(m, _)| *m == id) {
            if let Some(done) = run.land(*index)? {
                summary = Some(done);
            }
        }
        Ok(())
    })?;

    let summary = summary.context("allocation transfers never completed")?;
    ceremony.complete(summary)?;

    Ok(CeremonyReport {
        seed,
        drag: drag_report,
        income_after_leftovers,
        kept: decision.kept.iter().map(|e| e.name.clone()).collect(),
        transferred: decision.transferred.iter().map(|e| e.name.clone()).collect(),
        allocations,
        from_savings,
        summary,
        frames,
    })
}

/// Pull `source` out of its envelope and carry the token to `to`
fn drag(
    source: EnvelopeId,
    envelope: Rect,
    to: Point,
    targets: &DropTargets,
    haptics: &Rc<RefCell<RecordingHaptics>>,
    clock: &mut f64,
    seed: u64,
) -> Result<DropOutcome> {
    let mut device = haptics.clone();
    let start = envelope.center();
    let mut gesture = DragGesture::press(GestureConfig::default(), source, envelope, start, seed);

    // Straight up until the token pops, then across to the target
    let mut path: Vec<Point> = (1..=10)
        .map(|i| start + Vec2::new(0.0, -10.0 * i as f32))
        .collect();
    let pop_point = start + Vec2::new(0.0, -100.0);
    path.extend((1..=20).map(|i| pop_point.lerp(to, i as f32 / 20.0)));

    for pointer in path {
        *clock += FRAME_MS;
        let event = gesture.move_to(pointer, *clock, targets, &mut device);
        gesture.frame(*clock);
        debug!(?event, "drag");
    }
    // Let the zipping token catch up with the pointer
    for _ in 0..30 {
        *clock += FRAME_MS;
        gesture.frame(*clock);
    }

    match gesture.release(*clock) {
        Some(drop) => Ok(drop),
        None => bail!("drag of {source} was not released over a drop target"),
    }
}

/// Run host frames until nothing wants one, reporting each completion
fn drive(
    host: &mut AnimationHost<RecordingContext>,
    clock: &mut f64,
    mut on_complete: impl FnMut(AnimationId) -> Result<()>,
) -> Result<u64> {
    let mut frames = 0;
    while host.wants_frame() {
        if frames >= MAX_TRANSFER_FRAMES {
            bail!("transfers still running after {frames} frames");
        }
        *clock += FRAME_MS;
        frames += 1;
        for id in host.frame(*clock) {
            on_complete(id)?;
            host.stop(id);
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_ceremony() {
        let report = run(7).unwrap();

        assert_eq!(report.drag.source, "Groceries");
        assert_eq!(report.drag.target, "Income");
        assert!((report.income_after_leftovers - 1245.20).abs() < 1e-9);
        assert!(report.drag.haptic_pulses > 0);
        assert_eq!(report.transferred, vec!["Groceries".to_string()]);
        assert_eq!(report.kept.len(), 4);

        // Auto-fill rounds a dollar past income; the savings share of each
        // envelope rounds away, so every stream comes from income
        assert_eq!(report.summary.total, 1201.0);
        assert_eq!(report.summary.envelopes, 8);
        assert_eq!(report.from_savings, 1.0);
        assert_eq!(report.allocations.len(), 8);
        assert!(report.allocations.iter().all(|a| a.from == "Income"));
    }
}
