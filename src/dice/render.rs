//! Chat-style text for dice results

use super::{D20Roll, D20Tier, MultiRoll};

/// `roll_dice` output
#[must_use]
pub fn render_single(sides: u32, value: u32) -> String {
    format!("🎲 Rolled a d{sides}: **{value}**")
}

/// `roll_multiple_dice` output
#[must_use]
pub fn render_many(count: u32, sides: u32, roll: &MultiRoll) -> String {
    let faces = roll
        .rolls
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "🎲 Rolled {count}d{sides}: [{faces}]\nTotal: **{}**",
        roll.total
    )
}

/// `roll_d20` output, with a flourish for notable tiers
#[must_use]
pub fn render_d20(roll: &D20Roll) -> String {
    let flourish = match roll.tier {
        D20Tier::CriticalSuccess => "\n🌟 Natural 20! CRITICAL SUCCESS!",
        D20Tier::CriticalFailure => "\n💀 Natural 1! CRITICAL FAILURE!",
        D20Tier::Strong => "\n💪 Strong roll!",
        D20Tier::None => "",
    };
    format!("🎲 d20 roll: **{}**{flourish}", roll.value)
}

/// `roll_d6` output
#[must_use]
pub fn render_d6(value: u32) -> String {
    format!("🎲 d6 roll: **{value}**")
}
