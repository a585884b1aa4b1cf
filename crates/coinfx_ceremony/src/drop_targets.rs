//! Drop-target registry
//!
//! The host keeps the screen rectangle of every envelope that accepts drops up
//! to date (layout, scrolling). Gestures only read it.

use coinfx_core::{Point, Rect};
use indexmap::IndexMap;
use tracing::trace;

use crate::envelope::EnvelopeId;

/// Screen rectangles of the current drop targets, in registration order
#[derive(Clone, Debug, Default)]
pub struct DropTargets {
    rects: IndexMap<EnvelopeId, Rect>,
}

impl DropTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or move a target
    pub fn set(&mut self, id: EnvelopeId, rect: Rect) {
        trace!(%id, ?rect, "drop target updated");
        self.rects.insert(id, rect);
    }

    pub fn remove(&mut self, id: EnvelopeId) -> Option<Rect> {
        self.rects.shift_remove(&id)
    }

    pub fn rect(&self, id: EnvelopeId) -> Option<Rect> {
        self.rects.get(&id).copied()
    }

    pub fn center(&self, id: EnvelopeId) -> Option<Point> {
        self.rect(id).map(|r| r.center())
    }

    /// First registered target whose rectangle contains `point` (edges included)
    pub fn hit(&self, point: Point) -> Option<EnvelopeId> {
        self.rects
            .iter()
            .find(|(_, rect)| rect.contains(point))
            .map(|(id, _)| *id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EnvelopeId> + '_ {
        self.rects.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_prefers_registration_order() {
        let mut targets = DropTargets::new();
        targets.set(EnvelopeId(0), Rect::new(0.0, 0.0, 100.0, 100.0));
        targets.set(EnvelopeId(101), Rect::new(50.0, 50.0, 100.0, 100.0));

        assert_eq!(targets.hit(Point::new(75.0, 75.0)), Some(EnvelopeId(0)));
        assert_eq!(targets.hit(Point::new(150.0, 150.0)), Some(EnvelopeId(101)));
        assert_eq!(targets.hit(Point::new(100.0, 0.0)), Some(EnvelopeId(0)));
        assert_eq!(targets.hit(Point::new(151.0, 10.0)), None);
    }

    #[test]
    fn test_update_keeps_order() {
        let mut targets = DropTargets::new();
        targets.set(EnvelopeId(0), Rect::new(0.0, 0.0, 10.0, 10.0));
        targets.set(EnvelopeId(101), Rect::new(0.0, 0.0, 10.0, 10.0));
        targets.set(EnvelopeId(0), Rect::new(20.0, 20.0, 10.0, 10.0));

        assert_eq!(
            targets.ids().collect::<Vec<_>>(),
            vec![EnvelopeId(0), EnvelopeId(101)]
        );
        assert_eq!(targets.center(EnvelopeId(0)), Some(Point::new(25.0, 25.0)));

        targets.remove(EnvelopeId(0));
        assert_eq!(targets.hit(Point::new(5.0, 5.0)), Some(EnvelopeId(101)));
    }
}
