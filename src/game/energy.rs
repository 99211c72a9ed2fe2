//! Time-based energy regeneration: one point per two whole minutes since the last credit.

use chrono::{DateTime, Utc};

use super::player::PlayerRecord;

/// Minutes of idle time per regenerated energy point.
pub const MINUTES_PER_ENERGY: i64 = 2;

/// Energy that `elapsed_minutes` of idle time is worth.
pub fn regen_amount(elapsed_minutes: i64) -> u32 {
    if elapsed_minutes <= 0 {
        return 0;
    }
    u32::try_from(elapsed_minutes / MINUTES_PER_ENERGY).unwrap_or(u32::MAX)
}

/// Credit regenerated energy to `player` as of `now`. Returns the energy actually added.
///
/// `last_action` only moves forward when a regeneration step was earned, so polling
/// faster than the step leaves the timestamp untouched. Energy is always clamped to
/// `max_energy`, which also repairs records edited by hand.
pub fn regen(player: &mut PlayerRecord, now: DateTime<Utc>) -> u32 {
    player.energy = player.energy.min(player.max_energy);
    let elapsed = now.signed_duration_since(player.last_action).num_minutes();
    let earned = regen_amount(elapsed);
    if earned == 0 {
        return 0;
    }
    let before = player.energy;
    player.energy = before.saturating_add(earned).min(player.max_energy);
    player.last_action = now;
    player.energy - before
}
