//! Image resources
//!
//! The host decodes and owns every bitmap. Effects only hold an
//! [`ImageHandle`]: the host's image id plus a shared load status the host
//! flips once decoding finishes. Effects that draw images report themselves
//! not ready until then, so the frame loop defers its first frame.

use std::cell::RefCell;
use std::rc::Rc;

use coinfx_core::{ImageId, Size};
use tracing::{debug, warn};

use crate::error::{EffectError, Result};

/// Load state of a host image
#[derive(Clone, Debug, PartialEq)]
pub enum ImageStatus {
    Loading,
    Ready(Size),
    Failed(String),
}

/// Shared view of a host image
///
/// Clones share the status, so the host keeps one clone and marks it loaded.
#[derive(Clone, Debug)]
pub struct ImageHandle {
    id: ImageId,
    status: Rc<RefCell<ImageStatus>>,
}

impl ImageHandle {
    /// An image the host is still decoding
    pub fn loading(id: ImageId) -> Self {
        Self {
            id,
            status: Rc::new(RefCell::new(ImageStatus::Loading)),
        }
    }

    /// An image that is already decoded
    pub fn ready(id: ImageId, size: Size) -> Self {
        Self {
            id,
            status: Rc::new(RefCell::new(ImageStatus::Ready(size))),
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn status(&self) -> ImageStatus {
        self.status.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.status.borrow(), ImageStatus::Ready(_))
    }

    /// Called by the host once the bitmap is decoded
    pub fn mark_ready(&self, size: Size) {
        debug!(image = ?self.id, width = size.width, height = size.height, "image ready");
        *self.status.borrow_mut() = ImageStatus::Ready(size);
    }

    /// Called by the host when decoding fails; effects stay deferred
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(image = ?self.id, %reason, "image failed to load");
        *self.status.borrow_mut() = ImageStatus::Failed(reason);
    }

    /// Decoded size, or why there is none
    pub fn size(&self) -> Result<Size> {
        match &*self.status.borrow() {
            ImageStatus::Ready(size) => Ok(*size),
            ImageStatus::Loading => Err(EffectError::ImageLoading(self.id)),
            ImageStatus::Failed(reason) => Err(EffectError::ImageFailed(self.id, reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_status() {
        let host = ImageHandle::loading(ImageId(3));
        let effect = host.clone();
        assert!(!effect.is_ready());
        assert_eq!(effect.size(), Err(EffectError::ImageLoading(ImageId(3))));

        host.mark_ready(Size::new(64.0, 64.0));
        assert!(effect.is_ready());
        assert_eq!(effect.size(), Ok(Size::new(64.0, 64.0)));
    }

    #[test]
    fn test_failure_keeps_effect_deferred() {
        let host = ImageHandle::loading(ImageId(4));
        host.mark_failed("404");
        assert!(!host.is_ready());
        assert_eq!(host.status(), ImageStatus::Failed("404".into()));
        assert!(matches!(host.size(), Err(EffectError::ImageFailed(_, _))));
    }
}
