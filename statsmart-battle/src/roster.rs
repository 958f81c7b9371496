//! Enemy roster, sprite metadata and animation timing.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::numbers::frames_to_ms;

/// Which side of the arena an animation plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combatant {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    Idle,
    Attack1,
    Attack2,
    Hurt,
    Death,
}

impl AnimationKind {
    /// Attack variant chosen by a coin flip.
    #[must_use]
    pub const fn attack(second_variant: bool) -> Self {
        if second_variant {
            Self::Attack2
        } else {
            Self::Attack1
        }
    }

    #[must_use]
    pub const fn is_attack(self) -> bool {
        matches!(self, Self::Attack1 | Self::Attack2)
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Attack1 => "attack1",
            Self::Attack2 => "attack2",
            Self::Hurt => "hurt",
            Self::Death => "death",
        };
        f.write_str(label)
    }
}

/// Sprite sheet families bundled with the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteKey {
    Soldier,
    Orc,
    Skeleton,
    EliteOrc,
    ArmoredOrc,
    ArmoredSkeleton,
    GreatswordSkeleton,
    OrcRider,
}

const STAGE_ROSTER: [SpriteKey; 7] = [
    SpriteKey::Orc,
    SpriteKey::Skeleton,
    SpriteKey::EliteOrc,
    SpriteKey::ArmoredOrc,
    SpriteKey::ArmoredSkeleton,
    SpriteKey::GreatswordSkeleton,
    SpriteKey::OrcRider,
];

impl SpriteKey {
    /// Enemy fielded at `stage`; stages past the roster reuse the final boss.
    #[must_use]
    pub fn for_stage(stage: usize) -> Self {
        STAGE_ROSTER
            .get(stage)
            .copied()
            .unwrap_or(SpriteKey::OrcRider)
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Soldier => "Soldier",
            Self::Orc => "Orc",
            Self::Skeleton => "Skeleton",
            Self::EliteOrc => "Elite Orc",
            Self::ArmoredOrc => "Armored Orc",
            Self::ArmoredSkeleton => "Armored Skeleton",
            Self::GreatswordSkeleton => "Greatsword Skeleton",
            Self::OrcRider => "Orc Rider",
        }
    }

    #[must_use]
    pub fn badges(self) -> Vec<Badge> {
        let mut badges = Vec::new();
        if matches!(self, Self::EliteOrc | Self::OrcRider) {
            badges.push(Badge::Boss);
        }
        if matches!(self, Self::EliteOrc | Self::ArmoredSkeleton) {
            badges.push(Badge::SpecialAttack);
        }
        if self == Self::GreatswordSkeleton {
            badges.push(Badge::HeavyAttacker);
        }
        if self == Self::OrcRider {
            badges.push(Badge::Rage);
        }
        badges
    }
}

/// Labels rendered under the enemy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Badge {
    Boss,
    #[serde(rename = "Special Attack")]
    SpecialAttack,
    #[serde(rename = "Heavy Attacker")]
    HeavyAttacker,
    Rage,
}

impl Badge {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Boss => "Boss",
            Self::SpecialAttack => "Special Attack",
            Self::HeavyAttacker => "Heavy Attacker",
            Self::Rage => "Rage",
        }
    }
}

/// Frame count and playback rate of one animation strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSheet {
    pub frames: u32,
    pub fps: u32,
}

impl SpriteSheet {
    const fn new(frames: u32, fps: u32) -> Self {
        Self { frames, fps }
    }

    #[must_use]
    pub fn duration_ms(self) -> u64 {
        frames_to_ms(self.frames, self.fps)
    }
}

/// Capability the resolver uses to learn how long an animation plays.
pub trait AnimationClock {
    fn duration_ms(&self, sprite: SpriteKey, kind: AnimationKind) -> u64;
}

/// Frame table for the bundled sprite sheets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteCatalog;

impl SpriteCatalog {
    #[must_use]
    pub const fn sheet(sprite: SpriteKey, kind: AnimationKind) -> SpriteSheet {
        match kind {
            AnimationKind::Idle => SpriteSheet::new(6, 6),
            AnimationKind::Hurt => SpriteSheet::new(4, 8),
            AnimationKind::Death => SpriteSheet::new(4, 7),
            AnimationKind::Attack1 => match sprite {
                SpriteKey::EliteOrc => SpriteSheet::new(11, 8),
                SpriteKey::ArmoredOrc => SpriteSheet::new(7, 8),
                SpriteKey::ArmoredSkeleton | SpriteKey::OrcRider => SpriteSheet::new(8, 8),
                SpriteKey::GreatswordSkeleton => SpriteSheet::new(9, 8),
                SpriteKey::Soldier | SpriteKey::Orc | SpriteKey::Skeleton => {
                    SpriteSheet::new(6, 8)
                }
            },
            AnimationKind::Attack2 => match sprite {
                SpriteKey::EliteOrc | SpriteKey::ArmoredSkeleton | SpriteKey::OrcRider => {
                    SpriteSheet::new(9, 8)
                }
                SpriteKey::ArmoredOrc => SpriteSheet::new(8, 8),
                SpriteKey::GreatswordSkeleton => SpriteSheet::new(12, 12),
                SpriteKey::Soldier | SpriteKey::Orc | SpriteKey::Skeleton => {
                    SpriteSheet::new(6, 8)
                }
            },
        }
    }
}

impl AnimationClock for SpriteCatalog {
    fn duration_ms(&self, sprite: SpriteKey, kind: AnimationKind) -> u64 {
        Self::sheet(sprite, kind).duration_ms()
    }
}

/// Same duration per animation kind for every sprite; handy in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformClock {
    pub attack_ms: u64,
    pub hurt_ms: u64,
    pub death_ms: u64,
    pub idle_ms: u64,
}

impl Default for UniformClock {
    fn default() -> Self {
        Self {
            attack_ms: 800,
            hurt_ms: 400,
            death_ms: 600,
            idle_ms: 1_000,
        }
    }
}

impl AnimationClock for UniformClock {
    fn duration_ms(&self, _sprite: SpriteKey, kind: AnimationKind) -> u64 {
        match kind {
            AnimationKind::Attack1 | AnimationKind::Attack2 => self.attack_ms,
            AnimationKind::Hurt => self.hurt_ms,
            AnimationKind::Death => self.death_ms,
            AnimationKind::Idle => self.idle_ms,
        }
    }
}
