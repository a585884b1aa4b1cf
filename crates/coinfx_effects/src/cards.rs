//! Card deal
//!
//! A shuffled deck is dealt one card at a time from above the top edge with a
//! sideways flick. Once the deck is down the floor drops away and a strong
//! diagonal wind sweeps every card off the bottom-right of the screen.

use std::fmt;

use coinfx_animation::{Animation, Phase, PhaseTimeline, Stage};
use coinfx_core::{
    Bounds, Color, CornerRadius, DrawContext, EdgeInsets, FontWeight, Point, Rect, Size, Stroke,
    TextAlign, TextBaseline, TextStyle, Vec2,
};
use coinfx_physics::{
    BodyDesc, BodyId, BodyShape, Material, PhysicsConfig, PhysicsWorld, RampSpawner, SpawnRamp,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EffectConfig, Range, Sanitizer};
use crate::error::ConfigError;
use crate::renderer::{Renderer, Sprite, Visual};

const WALL_THICKNESS: f32 = 40.0;

// ============================================================================
// Deck
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "\u{2660}",
            Suit::Hearts => "\u{2665}",
            Suit::Diamonds => "\u{2666}",
            Suit::Clubs => "\u{2663}",
        }
    }

    pub fn is_red(self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }
}

/// A playing card; rank 1 is the ace, 11 to 13 are the faces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub fn rank_label(&self) -> &'static str {
        const LABELS: [&str; 13] = [
            "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
        ];
        LABELS[(self.rank.clamp(1, 13) - 1) as usize]
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank_label(), self.suit.symbol())
    }
}

/// The 52 cards in suit order
pub fn standard_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| (1..=13).map(move |rank| Card { rank, suit }))
        .collect()
}

/// The 52 cards, shuffled
pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut deck = standard_deck();
    deck.shuffle(rng);
    deck
}

// ============================================================================
// Config
// ============================================================================

/// Card deal settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardDealConfig {
    /// Cards dealt, at most a full deck
    pub count: usize,
    pub card_size: Size,
    /// Collider size relative to the drawn card
    pub collider_scale: f32,
    pub corner_radius: f32,
    /// Milliseconds between cards
    pub deal_interval_ms: f32,
    /// Horizontal spread of the deal point around the top center, in pixels
    pub spread: f32,
    /// Initial velocity, pixels per 60 Hz step
    pub flick_x: Range,
    pub flick_y: Range,
    /// Initial spin, radians per 60 Hz step
    pub spin: Range,
    pub gravity: f32,
    pub hold_ms: f32,
    /// Gravity once the floor is gone
    pub sweep_gravity: Vec2,
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub air_friction: f32,
}

impl Default for CardDealConfig {
    fn default() -> Self {
        Self {
            count: 52,
            card_size: Size::new(70.0, 100.0),
            collider_scale: 0.9,
            corner_radius: 5.0,
            deal_interval_ms: 80.0,
            spread: 60.0,
            flick_x: Range::new(-4.0, 4.0),
            flick_y: Range::new(2.0, 5.0),
            spin: Range::new(-0.075, 0.075),
            gravity: 1.5,
            hold_ms: 1200.0,
            sweep_gravity: Vec2::new(3.0, 2.0),
            restitution: 0.3,
            friction: 0.4,
            density: 0.001,
            air_friction: 0.01,
        }
    }
}

impl EffectConfig for CardDealConfig {
    fn sanitize(self) -> (Self, Vec<ConfigError>) {
        let mut s = Sanitizer::new();
        let count = s.count("cards.count", self.count);
        let count = s.within("cards.count", count as f32, 0.0, 52.0) as usize;
        let config = Self {
            count,
            card_size: Size::new(
                s.within("cards.card_size.width", self.card_size.width, 1.0, f32::MAX),
                s.within("cards.card_size.height", self.card_size.height, 1.0, f32::MAX),
            ),
            collider_scale: s.within("cards.collider_scale", self.collider_scale, 0.1, 1.0),
            corner_radius: s.time("cards.corner_radius", self.corner_radius),
            deal_interval_ms: s.time("cards.deal_interval_ms", self.deal_interval_ms),
            spread: s.time("cards.spread", self.spread),
            flick_x: s.range("cards.flick_x", self.flick_x),
            flick_y: s.range("cards.flick_y", self.flick_y),
            spin: s.range("cards.spin", self.spin),
            gravity: s.finite("cards.gravity", self.gravity, 1.5),
            hold_ms: s.time("cards.hold_ms", self.hold_ms),
            sweep_gravity: Vec2::new(
                s.finite("cards.sweep_gravity.x", self.sweep_gravity.x, 3.0),
                s.finite("cards.sweep_gravity.y", self.sweep_gravity.y, 2.0),
            ),
            restitution: s.within("cards.restitution", self.restitution, 0.0, 1.0),
            friction: s.within("cards.friction", self.friction, 0.0, 1.0),
            density: s.within("cards.density", self.density, 1e-6, 1.0),
            air_friction: s.within("cards.air_friction", self.air_friction, 0.0, 0.99),
        };
        (config, s.finish())
    }
}

// ============================================================================
// Card Face
// ============================================================================

const RED_INK: Color = Color::rgb(0.827, 0.184, 0.184);
const BLACK_INK: Color = Color::rgb(0.133, 0.133, 0.133);
const CARD_EDGE: Color = Color::rgb(0.2, 0.2, 0.2);

/// A card drawn as a rounded white rectangle with rank and suit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CardFace {
    pub card: Card,
    pub size: Size,
    pub corner_radius: f32,
}

impl Visual for CardFace {
    fn paint(&self, ctx: &mut dyn DrawContext) {
        let (w, h) = (self.size.width, self.size.height);
        let rect = Rect::new(-w / 2.0, -h / 2.0, w, h);
        let corners = CornerRadius::uniform(self.corner_radius);
        ctx.fill_rect(rect, corners, Color::WHITE.into());
        ctx.stroke_rect(rect, corners, &Stroke::new(1.5), CARD_EDGE.into());

        let ink = if self.card.suit.is_red() {
            RED_INK
        } else {
            BLACK_INK
        };
        let corner = TextStyle::new(16.0)
            .with_weight(FontWeight::Bold)
            .with_color(ink)
            .with_align(TextAlign::Left)
            .with_baseline(TextBaseline::Top);
        ctx.draw_text(
            self.card.rank_label(),
            Point::new(-w / 2.0 + 6.0, -h / 2.0 + 5.0),
            &corner,
        );
        ctx.draw_text(
            self.card.suit.symbol(),
            Point::new(-w / 2.0 + 6.0, -h / 2.0 + 20.0),
            &corner,
        );

        let pip = TextStyle::new(32.0)
            .with_color(ink)
            .with_align(TextAlign::Center)
            .with_baseline(TextBaseline::Middle);
        ctx.draw_text(self.card.suit.symbol(), Point::new(0.0, 5.0), &pip);
    }
}

// ============================================================================
// Effect
// ============================================================================

/// Deals a deck onto the floor, then sweeps it away
pub struct CardDeal {
    config: CardDealConfig,
    viewport: Size,
    rng: StdRng,
    deck: Vec<Card>,
    world: PhysicsWorld<Card>,
    floor: Option<BodyId>,
    dealer: RampSpawner,
    timeline: PhaseTimeline<Stage>,
    renderer: Renderer,
}

impl CardDeal {
    pub fn new(config: CardDealConfig, viewport: Size, seed: u64) -> Self {
        let (config, _) = config.sanitize();
        let mut rng = StdRng::seed_from_u64(seed);
        let deck = shuffled_deck(&mut rng);

        let mut world = PhysicsWorld::new(
            PhysicsConfig::default().with_gravity(Vec2::new(0.0, config.gravity)),
        );
        let side = BodyShape::rect(WALL_THICKNESS, viewport.height * 2.0);
        for x in [-WALL_THICKNESS / 2.0, viewport.width + WALL_THICKNESS / 2.0] {
            let wall = BodyDesc::fixed(side.clone(), Point::new(x, viewport.height / 2.0));
            if let Err(err) = world.add_static(wall) {
                warn!(%err, "card wall rejected");
            }
        }
        let floor = world
            .add_static(BodyDesc::fixed(
                BodyShape::rect(viewport.width + WALL_THICKNESS * 2.0, WALL_THICKNESS),
                Point::new(viewport.width / 2.0, viewport.height + WALL_THICKNESS / 2.0),
            ))
            .map_err(|err| warn!(%err, "card floor rejected"))
            .ok();

        debug!(count = config.count, "card deal created");
        Self {
            dealer: RampSpawner::new(SpawnRamp::new(config.count, 1, config.deal_interval_ms)),
            config,
            viewport,
            rng,
            deck,
            world,
            floor,
            timeline: PhaseTimeline::new(Stage::Spawn, 0.0),
            renderer: Renderer::new(EdgeInsets::new(
                f32::INFINITY,
                f32::INFINITY,
                300.0,
                300.0,
            )),
        }
    }

    pub fn stage(&self) -> Stage {
        self.timeline.current()
    }

    pub fn timeline(&self) -> &PhaseTimeline<Stage> {
        &self.timeline
    }

    /// Cards on the table, in deal order
    pub fn dealt(&self) -> impl Iterator<Item = &Card> {
        self.world.bodies().map(|body| body.payload)
    }

    fn deal_card(&mut self) {
        let Some(card) = self.deck.get(self.dealer.spawned() - 1).copied() else {
            return;
        };
        let c = &self.config;
        let x = self.viewport.width / 2.0 + (self.rng.random::<f32>() - 0.5) * c.spread;
        let y = -c.card_size.height;
        let velocity = Vec2::new(c.flick_x.sample(&mut self.rng), c.flick_y.sample(&mut self.rng));
        let spin = c.spin.sample(&mut self.rng);

        let desc = BodyDesc::dynamic(
            BodyShape::rounded_rect(
                c.card_size.width * c.collider_scale,
                c.card_size.height * c.collider_scale,
                c.corner_radius,
            ),
            Point::new(x, y),
        )
        .with_velocity(velocity)
        .with_angular_velocity(spin)
        .with_material(
            Material::default()
                .with_restitution(c.restitution)
                .with_friction(c.friction)
                .with_density(c.density)
                .with_air_friction(c.air_friction),
        );
        if let Err(err) = self.world.add_body(desc, card) {
            warn!(%err, %card, "card rejected");
        }
    }

    fn transition(&mut self, next: Stage, now: f32) {
        if let Err(err) = self.timeline.advance(next, now) {
            warn!(%err, "card phase transition rejected");
        }
    }

    fn sweep(&mut self) {
        if let Some(floor) = self.floor.take() {
            if let Err(err) = self.world.remove_body(floor) {
                warn!(%err, "floor already gone");
            }
        }
        self.world.set_gravity(self.config.sweep_gravity);
        debug!("cards swept");
    }
}

impl Animation for CardDeal {
    fn name(&self) -> &str {
        "card_deal"
    }

    fn phase(&self) -> Option<&'static str> {
        Some(self.timeline.current().name())
    }

    fn update(&mut self, elapsed: f32) -> bool {
        if self.timeline.is(Stage::Spawn) {
            if self.dealer.poll(elapsed * 1000.0) > 0 {
                self.deal_card();
            }
            if self.dealer.is_complete() {
                self.transition(Stage::Hold, elapsed);
            }
        }

        if self.timeline.is(Stage::Hold)
            && self.timeline.time_in_phase(elapsed) * 1000.0 > self.config.hold_ms
        {
            self.sweep();
            self.transition(Stage::Release, elapsed);
        }

        if self.timeline.is(Stage::Release) {
            let remaining = Bounds::new(
                f32::NEG_INFINITY,
                f32::NEG_INFINITY,
                self.viewport.width + 200.0,
                self.viewport.height + 200.0,
            );
            if !self.world.any_within(remaining) {
                self.transition(Stage::End, elapsed);
            }
        }

        self.world.step();
        !self.timeline.is_terminal()
    }

    fn render(&self, ctx: &mut dyn DrawContext) {
        let size = self.config.card_size;
        let corner_radius = self.config.corner_radius;
        self.renderer.render(
            ctx,
            self.world.bodies().map(|body| {
                let face = CardFace {
                    card: *body.payload,
                    size,
                    corner_radius,
                };
                Sprite::new(body.position, face).with_angle(body.angle)
            }),
        );
    }

    fn release(&mut self) {
        self.world.clear();
        self.floor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinfx_core::{DrawCommand, RecordingContext};
    use std::collections::HashSet;

    const VIEWPORT: Size = Size::new(412.0, 915.0);

    #[test]
    fn test_deck_has_52_distinct_cards() {
        let deck = shuffled_deck(&mut StdRng::seed_from_u64(1));
        let unique: HashSet<_> = deck.iter().copied().collect();
        assert_eq!(deck.len(), 52);
        assert_eq!(unique.len(), 52);
        assert_ne!(deck, standard_deck());
        assert_eq!(deck.iter().filter(|c| c.suit.is_red()).count(), 26);
    }

    #[test]
    fn test_card_labels() {
        assert_eq!(Card { rank: 1, suit: Suit::Spades }.to_string(), "A\u{2660}");
        assert_eq!(Card { rank: 10, suit: Suit::Hearts }.to_string(), "10\u{2665}");
        assert_eq!(Card { rank: 13, suit: Suit::Clubs }.rank_label(), "K");
    }

    #[test]
    fn test_one_card_per_interval() {
        let mut deal = CardDeal::new(CardDealConfig::default(), VIEWPORT, 2);
        // 0.5 s at 60 Hz: deals at > 80 ms apart
        let mut t = 0.0;
        for _ in 0..30 {
            deal.update(t);
            t += 1.0 / 60.0;
        }
        let dealt = deal.dealt().count();
        assert!((5..=6).contains(&dealt), "dealt {dealt}");
        assert_eq!(deal.stage(), Stage::Spawn);
    }

    #[test]
    fn test_deal_hold_sweep_end() {
        let config = CardDealConfig {
            count: 12,
            hold_ms: 200.0,
            ..CardDealConfig::default()
        };
        let mut deal = CardDeal::new(config, VIEWPORT, 3);
        let mut t = 0.0;
        while deal.update(t) && t < 30.0 {
            t += 1.0 / 60.0;
        }
        let stages: Vec<Stage> = deal.timeline().history().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![Stage::Spawn, Stage::Hold, Stage::Release, Stage::End]);
        assert_eq!(deal.dealt().count(), 12);
        assert!(deal.floor.is_none());
    }

    #[test]
    fn test_face_draws_rank_and_suits() {
        let mut ctx = RecordingContext::new(VIEWPORT);
        CardFace {
            card: Card { rank: 12, suit: Suit::Diamonds },
            size: Size::new(70.0, 100.0),
            corner_radius: 5.0,
        }
        .paint(&mut ctx);

        let texts: Vec<(String, Color)> = ctx
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawText { text, style, .. } => Some((text.clone(), style.color)),
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0].0, "Q");
        assert!(texts.iter().all(|(_, color)| *color == RED_INK));
        assert_eq!(ctx.draw_call_count(), 5);
    }
}
