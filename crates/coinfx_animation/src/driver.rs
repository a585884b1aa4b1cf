//! Frame driver
//!
//! Animations are driven by the host's per-frame signal (a display link, a
//! `requestAnimationFrame` callback, a test loop). On each frame the driver
//! computes the time elapsed since the animation's first frame, lets the
//! animation update, renders it, and decides whether another frame is needed.
//!
//! - [`Animation`] is implemented by every effect.
//! - [`FrameLoop`] drives one animation: resource gating, completion,
//!   cancellation.
//! - [`AnimationHost`] mounts animations onto host-owned surfaces and hands
//!   out [`AnimationId`] handles.
//!
//! Everything runs on the host's thread. Within one frame the update finishes
//! before the first draw call.

use coinfx_core::DrawContext;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Something that can be advanced in time and drawn
pub trait Animation {
    /// Short name for logs
    fn name(&self) -> &str {
        "animation"
    }

    /// Whether the resources this animation draws with have loaded
    ///
    /// No frame is requested until this returns true.
    fn is_ready(&self) -> bool {
        true
    }

    /// Advance to `elapsed` seconds since the first frame
    ///
    /// Returns whether anything is still active. Pending particles count as
    /// active.
    fn update(&mut self, elapsed: f32) -> bool;

    /// Draw the current state
    fn render(&self, ctx: &mut dyn DrawContext);

    /// Drop engine resources (bodies, colliders, particle storage)
    fn release(&mut self) {}

    /// Label of the current phase, for animations that have phases
    fn phase(&self) -> Option<&'static str> {
        None
    }
}

impl<A: Animation + ?Sized> Animation for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn phase(&self) -> Option<&'static str> {
        (**self).phase()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn update(&mut self, elapsed: f32) -> bool {
        (**self).update(elapsed)
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        (**self).render(ctx)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

// ============================================================================
// Frame Loop
// ============================================================================

/// Lifecycle of a [`FrameLoop`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the animation's resources; no frames requested
    AwaitingResources,
    /// Frames are being requested
    Running,
    /// The last active frame has run and the completion callback fired
    Completed,
    /// Stopped from outside; no callback
    Cancelled,
}

/// What happened during one call to [`FrameLoop::frame`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing ran (not started, or already finished)
    Skipped,
    /// Frame rendered; another one is requested
    Continue,
    /// Frame rendered and the animation finished in it
    Completed,
}

type CompletionCallback = Box<dyn FnOnce()>;

/// Drives a single animation against a host's frame signal
pub struct FrameLoop {
    animation: Box<dyn Animation>,
    state: LoopState,
    first_frame_ms: Option<f64>,
    frames: u64,
    elapsed: f32,
    on_complete: Option<CompletionCallback>,
}

impl FrameLoop {
    /// Wrap an animation; it starts as soon as its resources are ready
    pub fn new(animation: impl Animation + 'static) -> Self {
        let mut frame_loop = Self {
            animation: Box::new(animation),
            state: LoopState::AwaitingResources,
            first_frame_ms: None,
            frames: 0,
            elapsed: 0.0,
            on_complete: None,
        };
        frame_loop.notify_ready();
        frame_loop
    }

    /// Callback fired exactly once, after the last active frame
    pub fn on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn animation(&self) -> &dyn Animation {
        self.animation.as_ref()
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Seconds from the first frame to the latest one
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Whether the host should schedule a frame callback
    pub fn wants_frame(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Still attached to its surface
    pub fn is_mounted(&self) -> bool {
        !matches!(self.state, LoopState::Cancelled | LoopState::Completed)
    }

    /// Re-check resource readiness; returns whether frames are now wanted
    pub fn notify_ready(&mut self) -> bool {
        if self.state == LoopState::AwaitingResources && self.animation.is_ready() {
            debug!(animation = self.animation.name(), "resources ready, starting");
            self.state = LoopState::Running;
        }
        self.wants_frame()
    }

    /// Run one host frame at `timestamp_ms`
    ///
    /// The first frame defines time zero. Activity dropping to zero completes
    /// the loop in the same frame: no further frames are requested and the
    /// completion callback fires.
    pub fn frame(&mut self, timestamp_ms: f64, ctx: &mut dyn DrawContext) -> FrameOutcome {
        if !self.wants_frame() {
            return FrameOutcome::Skipped;
        }

        let start = *self.first_frame_ms.get_or_insert(timestamp_ms);
        self.elapsed = ((timestamp_ms - start) / 1000.0).max(0.0) as f32;
        self.frames += 1;

        let active = self.animation.update(self.elapsed);
        self.animation.render(ctx);
        trace!(
            animation = self.animation.name(),
            frame = self.frames,
            elapsed = self.elapsed,
            active,
            "frame"
        );

        if active {
            return FrameOutcome::Continue;
        }

        debug!(
            animation = self.animation.name(),
            frames = self.frames,
            elapsed = self.elapsed,
            "animation complete"
        );
        self.state = LoopState::Completed;
        self.animation.release();
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
        FrameOutcome::Completed
    }

    /// Stop without firing the completion callback
    ///
    /// Idempotent. Releases the animation's engine resources the first time.
    pub fn cancel(&mut self) {
        if !self.is_mounted() {
            return;
        }
        debug!(
            animation = self.animation.name(),
            frames = self.frames,
            "animation cancelled"
        );
        self.state = LoopState::Cancelled;
        self.on_complete = None;
        self.animation.release();
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// Animation Host
// ============================================================================

new_key_type! {
    /// Handle to an animation mounted on an [`AnimationHost`]
    pub struct AnimationId;
}

struct Mounted<S> {
    surface: S,
    frame_loop: FrameLoop,
}

/// Animations that finished during one host frame
pub type CompletedList = SmallVec<[AnimationId; 4]>;

/// Mounts animations on host-owned surfaces and drives them
///
/// Every mounted animation gets its own surface. Completed animations stay
/// mounted (their surface holds the final frame) until [`AnimationHost::stop`]
/// hands the surface back.
pub struct AnimationHost<S: DrawContext> {
    mounted: SlotMap<AnimationId, Mounted<S>>,
}

impl<S: DrawContext> Default for AnimationHost<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DrawContext> AnimationHost<S> {
    pub fn new() -> Self {
        Self {
            mounted: SlotMap::with_key(),
        }
    }

    /// Mount `animation` on `surface`
    pub fn start(&mut self, surface: S, animation: impl Animation + 'static) -> AnimationId {
        self.start_loop(surface, FrameLoop::new(animation))
    }

    /// Mount a prepared loop (e.g. one with a completion callback)
    pub fn start_loop(&mut self, surface: S, frame_loop: FrameLoop) -> AnimationId {
        self.mounted.insert(Mounted {
            surface,
            frame_loop,
        })
    }

    /// Cancel and unmount, returning the surface to the host
    ///
    /// Returns `None` for unknown or already stopped handles.
    pub fn stop(&mut self, id: AnimationId) -> Option<S> {
        let mut mounted = self.mounted.remove(id)?;
        mounted.frame_loop.cancel();
        Some(mounted.surface)
    }

    /// Re-check resources of every waiting animation
    pub fn notify_ready(&mut self) {
        for (_, mounted) in self.mounted.iter_mut() {
            mounted.frame_loop.notify_ready();
        }
    }

    /// Whether any mounted animation wants another frame
    pub fn wants_frame(&self) -> bool {
        self.mounted.values().any(|m| m.frame_loop.wants_frame())
    }

    /// Run one host frame for every running animation
    pub fn frame(&mut self, timestamp_ms: f64) -> CompletedList {
        let mut completed = CompletedList::new();
        for (id, mounted) in self.mounted.iter_mut() {
            if !mounted.frame_loop.is_mounted() {
                continue;
            }
            if mounted.frame_loop.frame(timestamp_ms, &mut mounted.surface)
                == FrameOutcome::Completed
            {
                completed.push(id);
            }
        }
        completed
    }

    pub fn state(&self, id: AnimationId) -> Option<LoopState> {
        self.mounted.get(id).map(|m| m.frame_loop.state())
    }

    pub fn frame_loop(&self, id: AnimationId) -> Option<&FrameLoop> {
        self.mounted.get(id).map(|m| &m.frame_loop)
    }

    pub fn surface(&self, id: AnimationId) -> Option<&S> {
        self.mounted.get(id).map(|m| &m.surface)
    }

    pub fn surface_mut(&mut self, id: AnimationId) -> Option<&mut S> {
        self.mounted.get_mut(id).map(|m| &mut m.surface)
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }
}
