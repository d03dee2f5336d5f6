//! The fixed dice tool catalog

use crate::dice::{self, DiceError, MAX_COUNT, MAX_SIDES, MIN_COUNT, MIN_SIDES, RandomSource, render};

use super::schema::{ParamSpec, ValidatedArgs, ValidationError};

const SIDES: ParamSpec = ParamSpec::optional(
    "sides",
    "Number of faces on each die",
    MIN_SIDES,
    MAX_SIDES,
    6,
);
const COUNT: ParamSpec = ParamSpec::required("count", "Number of dice to roll", MIN_COUNT, MAX_COUNT);

/// Handler a descriptor is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// One die of any size
    RollDice,
    /// Several dice of one size
    RollMultipleDice,
    /// One d20 with tier
    RollD20,
    /// One d6
    RollD6,
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: &'static str,
    /// Human text
    pub description: &'static str,
    /// Declared parameters, in schema order
    pub params: &'static [ParamSpec],
    /// Bound handler
    pub kind: ToolKind,
}

/// Catalog entries in advertised order
#[must_use]
pub fn dice_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "roll_dice",
            description: "Roll a single die with the given number of sides",
            params: &[SIDES],
            kind: ToolKind::RollDice,
        },
        ToolDescriptor {
            name: "roll_multiple_dice",
            description: "Roll several dice of the same size and report each face and the total",
            params: &[COUNT, SIDES],
            kind: ToolKind::RollMultipleDice,
        },
        ToolDescriptor {
            name: "roll_d20",
            description: "Roll a d20, calling out critical successes, critical failures and strong rolls",
            params: &[],
            kind: ToolKind::RollD20,
        },
        ToolDescriptor {
            name: "roll_d6",
            description: "Roll a standard six-sided die",
            params: &[],
            kind: ToolKind::RollD6,
        },
    ]
}

/// A validated, ready-to-run tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCall {
    /// `roll_dice`
    RollDice {
        /// Faces on the die
        sides: u32,
    },
    /// `roll_multiple_dice`
    RollMultipleDice {
        /// Dice rolled
        count: u32,
        /// Faces on each die
        sides: u32,
    },
    /// `roll_d20`
    RollD20,
    /// `roll_d6`
    RollD6,
}

impl ToolCall {
    pub(crate) fn bind(kind: ToolKind, args: &ValidatedArgs) -> Result<Self, ValidationError> {
        Ok(match kind {
            ToolKind::RollDice => Self::RollDice {
                sides: args.require(SIDES.name)?,
            },
            ToolKind::RollMultipleDice => Self::RollMultipleDice {
                count: args.require(COUNT.name)?,
                sides: args.require(SIDES.name)?,
            },
            ToolKind::RollD20 => Self::RollD20,
            ToolKind::RollD6 => Self::RollD6,
        })
    }

    /// Run the handler and render its result
    pub fn invoke(&self, rng: &dyn RandomSource) -> Result<String, DiceError> {
        match *self {
            Self::RollDice { sides } => {
                dice::roll_one(rng, sides).map(|v| render::render_single(sides, v))
            }
            Self::RollMultipleDice { count, sides } => {
                dice::roll_many(rng, count, sides).map(|r| render::render_many(count, sides, &r))
            }
            Self::RollD20 => dice::roll_d20(rng).map(|r| render::render_d20(&r)),
            Self::RollD6 => dice::roll_d6(rng).map(render::render_d6),
        }
    }
}
