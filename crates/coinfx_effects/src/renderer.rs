//! Sprite renderer
//!
//! Effects describe each frame as a list of [`Sprite`]s: a position, an angle,
//! a scale, an opacity and something to paint in local coordinates. The
//! renderer clears the surface, culls sprites whose center lies outside the
//! viewport grown by the cull margins, and paints the rest with balanced
//! transform and opacity pushes.

use coinfx_core::{
    Bounds, DrawContext, EdgeInsets, ImageId, ImageOptions, Point, Rect, Size, Transform,
};

/// Something drawn around the local origin
pub trait Visual {
    fn paint(&self, ctx: &mut dyn DrawContext);
}

impl<V: Visual + ?Sized> Visual for &V {
    fn paint(&self, ctx: &mut dyn DrawContext) {
        (**self).paint(ctx)
    }
}

/// The coin bitmap, centered on the origin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoinImage {
    pub image: ImageId,
    pub diameter: f32,
}

impl CoinImage {
    pub fn new(image: ImageId, diameter: f32) -> Self {
        Self { image, diameter }
    }
}

impl Visual for CoinImage {
    fn paint(&self, ctx: &mut dyn DrawContext) {
        let rect = Rect::from_center(Point::ZERO, Size::new(self.diameter, self.diameter));
        ctx.draw_image(self.image, rect, &ImageOptions::new());
    }
}

/// Any host bitmap, centered on the origin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Picture {
    pub image: ImageId,
    pub size: Size,
}

impl Visual for Picture {
    fn paint(&self, ctx: &mut dyn DrawContext) {
        let rect = Rect::from_center(Point::ZERO, self.size);
        ctx.draw_image(self.image, rect, &ImageOptions::new());
    }
}

/// One entry of a frame's drawable list
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite<V> {
    pub position: Point,
    pub angle: f32,
    pub scale: f32,
    pub opacity: f32,
    pub visual: V,
}

impl<V> Sprite<V> {
    pub fn new(position: Point, visual: V) -> Self {
        Self {
            position,
            angle: 0.0,
            scale: 1.0,
            opacity: 1.0,
            visual,
        }
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Counts from one render pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    /// Outside the cull bounds
    pub culled: usize,
    /// Fully transparent or scaled to nothing
    pub hidden: usize,
}

/// Paints sprite lists onto a surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Renderer {
    cull: EdgeInsets,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Renderer {
    /// Cull sprites further than `cull` outside the viewport
    pub fn new(cull: EdgeInsets) -> Self {
        Self { cull }
    }

    /// Never cull
    pub fn unbounded() -> Self {
        Self::new(EdgeInsets::unbounded())
    }

    pub fn cull_bounds(&self, viewport: Size) -> Bounds {
        viewport.to_rect().outset(self.cull)
    }

    /// Clear the surface and draw `sprites`
    pub fn render<V, I>(&self, ctx: &mut dyn DrawContext, sprites: I) -> RenderStats
    where
        V: Visual,
        I: IntoIterator<Item = Sprite<V>>,
    {
        ctx.clear_surface();
        self.draw(ctx, sprites)
    }

    /// Draw `sprites` over whatever is on the surface
    pub fn draw<V, I>(&self, ctx: &mut dyn DrawContext, sprites: I) -> RenderStats
    where
        V: Visual,
        I: IntoIterator<Item = Sprite<V>>,
    {
        let bounds = self.cull_bounds(ctx.viewport_size());
        let mut stats = RenderStats::default();

        for sprite in sprites {
            if !bounds.contains(sprite.position) {
                stats.culled += 1;
                continue;
            }
            if sprite.opacity <= 0.0 || sprite.scale <= 0.0 {
                stats.hidden += 1;
                continue;
            }

            let transform = Transform::placed(sprite.position, sprite.angle)
                .then(&Transform::uniform_scale(sprite.scale));
            let translucent = sprite.opacity < 1.0;

            ctx.push_transform(transform);
            if translucent {
                ctx.push_opacity(sprite.opacity);
            }
            sprite.visual.paint(ctx);
            if translucent {
                ctx.pop_opacity();
            }
            ctx.pop_transform();
            stats.drawn += 1;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinfx_core::{DrawCommand, RecordingContext};

    const COIN: ImageId = ImageId(1);

    fn surface() -> RecordingContext {
        RecordingContext::new(Size::new(412.0, 915.0))
    }

    #[test]
    fn test_culls_beyond_margin() {
        let renderer = Renderer::new(EdgeInsets::new(
            f32::INFINITY,
            f32::INFINITY,
            f32::INFINITY,
            300.0,
        ));
        let mut ctx = surface();
        let sprites = [
            Sprite::new(Point::new(100.0, 100.0), CoinImage::new(COIN, 40.0)),
            Sprite::new(Point::new(100.0, 1215.0), CoinImage::new(COIN, 40.0)),
            Sprite::new(Point::new(100.0, 1216.0), CoinImage::new(COIN, 40.0)),
            Sprite::new(Point::new(-5000.0, -5000.0), CoinImage::new(COIN, 40.0)),
        ];
        let stats = renderer.render(&mut ctx, sprites);

        assert_eq!(stats.drawn, 3);
        assert_eq!(stats.culled, 1);
        assert_eq!(ctx.draw_call_count(), 3);
    }

    #[test]
    fn test_stacks_balanced_after_pass() {
        let renderer = Renderer::unbounded();
        let mut ctx = surface();
        let sprites = (0..10).map(|i| {
            Sprite::new(Point::new(i as f32 * 10.0, 0.0), CoinImage::new(COIN, 20.0))
                .with_opacity(i as f32 / 10.0)
                .with_angle(0.3)
        });
        let stats = renderer.render(&mut ctx, sprites);

        assert_eq!(stats.hidden, 1);
        assert_eq!(stats.drawn, 9);
        assert_eq!(ctx.transform_depth(), 0);
        assert_eq!(ctx.opacity_depth(), 0);
        assert_eq!(ctx.current_opacity(), 1.0);
    }

    #[test]
    fn test_clear_comes_first() {
        let mut ctx = surface();
        Renderer::unbounded().render(
            &mut ctx,
            [Sprite::new(Point::ZERO, CoinImage::new(COIN, 10.0))],
        );
        assert_eq!(ctx.commands().first(), Some(&DrawCommand::Clear));
    }

    #[test]
    fn test_image_centered_on_origin() {
        let mut ctx = surface();
        Renderer::unbounded().draw(
            &mut ctx,
            [Sprite::new(Point::new(50.0, 60.0), CoinImage::new(COIN, 30.0)).with_scale(0.5)],
        );
        let image = ctx
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCommand::DrawImage { rect, .. } => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert_eq!(image, Rect::new(-15.0, -15.0, 30.0, 30.0));
    }
}
