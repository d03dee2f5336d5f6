//! Dice domain handlers.
//!
//! Pure functions over an injected [`RandomSource`]. They return numbers and
//! plain structs; turning those into chat text is [`render`]'s job.

mod random;
pub mod render;

pub use random::{RandomSource, SequenceRandom, ThreadRandom};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest die
pub const MIN_SIDES: u32 = 2;
/// Largest die
pub const MAX_SIDES: u32 = 100;
/// Fewest dice per multi-roll
pub const MIN_COUNT: u32 = 1;
/// Most dice per multi-roll
pub const MAX_COUNT: u32 = 20;

/// Precondition violations. The registry bounds-checks first, so reaching
/// one of these is a programming error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// Die size outside `[MIN_SIDES, MAX_SIDES]`
    #[error("sides must be between 2 and 100, got {0}")]
    SidesOutOfRange(u32),
    /// Dice count outside `[MIN_COUNT, MAX_COUNT]`
    #[error("count must be between 1 and 20, got {0}")]
    CountOutOfRange(u32),
    /// The random source produced a face the die does not have
    #[error("random source returned {value} for a d{sides}")]
    FaceOutOfRange {
        /// Value produced
        value: u32,
        /// Die size requested
        sides: u32,
    },
}

/// Result of rolling several dice of one size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRoll {
    /// Faces in roll order
    pub rolls: Vec<u32>,
    /// Sum of `rolls`
    pub total: u32,
}

/// Outcome band of a d20 roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum D20Tier {
    /// Natural 20
    CriticalSuccess,
    /// Natural 1
    CriticalFailure,
    /// 15 through 19
    Strong,
    /// 2 through 14
    None,
}

impl D20Tier {
    /// Strong band lower bound (inclusive)
    pub const STRONG_THRESHOLD: u32 = 15;

    /// Tier for a d20 face
    #[must_use]
    pub fn for_value(value: u32) -> Self {
        match value {
            20 => Self::CriticalSuccess,
            1 => Self::CriticalFailure,
            v if v >= Self::STRONG_THRESHOLD => Self::Strong,
            _ => Self::None,
        }
    }
}

/// A d20 face and its tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D20Roll {
    /// Face in `[1, 20]`
    pub value: u32,
    /// Tier derived from `value`
    pub tier: D20Tier,
}

fn check_sides(sides: u32) -> Result<(), DiceError> {
    if (MIN_SIDES..=MAX_SIDES).contains(&sides) {
        Ok(())
    } else {
        Err(DiceError::SidesOutOfRange(sides))
    }
}

fn draw(rng: &dyn RandomSource, sides: u32) -> Result<u32, DiceError> {
    let value = rng.roll(sides);
    if (1..=sides).contains(&value) {
        Ok(value)
    } else {
        Err(DiceError::FaceOutOfRange { value, sides })
    }
}

/// Roll one die with `sides` faces
pub fn roll_one(rng: &dyn RandomSource, sides: u32) -> Result<u32, DiceError> {
    check_sides(sides)?;
    draw(rng, sides)
}

/// Roll `count` dice with `sides` faces each
pub fn roll_many(rng: &dyn RandomSource, count: u32, sides: u32) -> Result<MultiRoll, DiceError> {
    if !(MIN_COUNT..=MAX_COUNT).contains(&count) {
        return Err(DiceError::CountOutOfRange(count));
    }
    check_sides(sides)?;

    let rolls = (0..count)
        .map(|_| draw(rng, sides))
        .collect::<Result<Vec<_>, _>>()?;
    let total = rolls.iter().sum();
    Ok(MultiRoll { rolls, total })
}

/// Roll a d20 and classify it
pub fn roll_d20(rng: &dyn RandomSource) -> Result<D20Roll, DiceError> {
    let value = draw(rng, 20)?;
    Ok(D20Roll {
        value,
        tier: D20Tier::for_value(value),
    })
}

/// Roll a d6
pub fn roll_d6(rng: &dyn RandomSource) -> Result<u32, DiceError> {
    roll_one(rng, 6)
}
