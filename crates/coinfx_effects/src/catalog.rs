//! Named effects
//!
//! Lets hosts and the command line pick an effect by name and build it from a
//! config file.

use std::fmt;
use std::str::FromStr;

use coinfx_animation::Animation;
use coinfx_core::{Point, Size};

use crate::cards::CardDeal;
use crate::config::EffectsConfig;
use crate::drain::CoinDrain;
use crate::error::EffectError;
use crate::pile::CoinPile;
use crate::resource::ImageHandle;
use crate::shards::ShardExplosion;
use crate::stream::CoinStream;
use crate::title::TitleIntro;

/// Every effect this crate provides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Drain,
    Stream,
    PileFall,
    PileFloat,
    Cards,
    Shards,
    Title,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Drain,
        EffectKind::Stream,
        EffectKind::PileFall,
        EffectKind::PileFloat,
        EffectKind::Cards,
        EffectKind::Shards,
        EffectKind::Title,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Drain => "drain",
            EffectKind::Stream => "stream",
            EffectKind::PileFall => "pile-fall",
            EffectKind::PileFloat => "pile-float",
            EffectKind::Cards => "cards",
            EffectKind::Shards => "shards",
            EffectKind::Title => "title",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EffectKind::Drain => "coins spiral into the center of the screen",
            EffectKind::Stream => "coins burst from a point and spiral into another",
            EffectKind::PileFall => "coins pile up on the floor, then drop through it",
            EffectKind::PileFloat => "coins float up against the ceiling, then escape",
            EffectKind::Cards => "a deck is dealt onto the floor, then swept away",
            EffectKind::Shards => "the screen shatters into triangles that blow apart",
            EffectKind::Title => "the title pops in, pulses and shrinks away",
        }
    }

    /// Whether the effect draws the host image and waits for it to load
    pub fn uses_image(self) -> bool {
        !matches!(self, EffectKind::Cards | EffectKind::Shards)
    }

    /// Build the effect with its table from `config`
    pub fn build(
        self,
        config: &EffectsConfig,
        viewport: Size,
        image: ImageHandle,
        seed: u64,
    ) -> Box<dyn Animation> {
        match self {
            EffectKind::Drain => Box::new(CoinDrain::new(config.drain.clone(), viewport, image, seed)),
            EffectKind::Stream => {
                let source = Point::new(viewport.width * 0.2, viewport.height * 0.8);
                let target = Point::new(viewport.width * 0.8, viewport.height * 0.15);
                Box::new(CoinStream::new(
                    config.stream.clone(),
                    source,
                    target,
                    image,
                    seed,
                ))
            }
            EffectKind::PileFall => {
                Box::new(CoinPile::new(config.pile_fall.clone(), viewport, image, seed))
            }
            EffectKind::PileFloat => {
                Box::new(CoinPile::new(config.pile_float.clone(), viewport, image, seed))
            }
            EffectKind::Cards => Box::new(CardDeal::new(config.cards.clone(), viewport, seed)),
            EffectKind::Shards => {
                Box::new(ShardExplosion::new(config.shards.clone(), viewport, seed))
            }
            EffectKind::Title => Box::new(TitleIntro::new(config.title.clone(), viewport, image)),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| EffectError::UnknownEffect(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinfx_core::ImageId;

    #[test]
    fn test_names_round_trip() {
        for kind in EffectKind::ALL {
            assert_eq!(kind.name().parse::<EffectKind>(), Ok(kind));
        }
        assert_eq!("PILE_FALL".parse::<EffectKind>(), Ok(EffectKind::PileFall));
        assert_eq!(
            "fireworks".parse::<EffectKind>(),
            Err(EffectError::UnknownEffect("fireworks".into()))
        );
    }

    #[test]
    fn test_vector_effects_never_wait() {
        let config = EffectsConfig::default();
        let image = ImageHandle::loading(ImageId(1));
        for kind in EffectKind::ALL {
            let effect = kind.build(&config, Size::new(412.0, 915.0), image.clone(), 1);
            assert_eq!(effect.is_ready(), !kind.uses_image(), "{kind}");
        }
    }
}
