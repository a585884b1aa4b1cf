//! coinfx Core
//!
//! Foundational types shared by every coinfx crate:
//!
//! - **Geometry**: points, vectors, sizes, rects and colors in surface pixels
//! - **Draw Context**: the 2D surface abstraction effects render onto
//!
//! # Example
//!
//! ```rust
//! use coinfx_core::{Color, DrawContext, Point, RecordingContext, Size};
//!
//! let mut ctx = RecordingContext::new(Size::new(412.0, 915.0));
//! ctx.clear_surface();
//! ctx.fill_circle(Point::new(206.0, 457.5), 20.0, Color::from_hex(0xFFD700).into());
//! assert_eq!(ctx.draw_call_count(), 1);
//! ```

pub mod draw;
pub mod geometry;

pub use draw::{
    Affine2D, Brush, CornerRadius, DrawCommand, DrawContext, DrawContextExt, FontWeight, ImageId,
    ImageOptions, LineJoin, Path, PathCommand, RecordingContext, Stroke, TextAlign, TextBaseline,
    TextStyle, Transform,
};
pub use geometry::{Bounds, Color, EdgeInsets, Point, Rect, Size, Vec2};
