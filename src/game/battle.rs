//! Turn-based boss battles.
//!
//! A battle lives inside the player record (`PlayerRecord::battle`) and moves through
//! `no battle -> active -> finished(won | lost)`. [`BattleEngine`] owns no state of its own:
//! every call takes the player, reads the immutable [`BattleCatalog`] and pulls randomness
//! from the caller's [`Dice`], one draw per roll in this order:
//!
//! 1. miss roll for the player's move
//! 2. crit roll (only when the move connects)
//! 3. one roll per move effect, in declared order (only when the move connects)
//! 4. counterattack damage (only when the boss is alive and not stunned)
//!
//! A bleed tick happens before all of that and draws nothing. HP values are never clamped;
//! a killing blow leaves the raw negative value in the state.

use serde::{Deserialize, Serialize};

use super::catalog::{BattleCatalog, Boss, Effect, EffectKind, Move};
use super::dice::Dice;
use super::errors::GameError;
use super::player::PlayerRecord;

/// Rolling battle log length.
pub const LOG_CAPACITY: usize = 20;
pub const MAX_BLEED_STACKS: u32 = 3;
/// Stacked bleed damage is capped at this multiple of one application.
pub const BLEED_DAMAGE_CAP_FACTOR: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleedState {
    pub remaining: u32,
    pub damage_per_turn: i32,
    pub stacks: u32,
    /// Largest single application so far; stacked damage is capped relative to it.
    #[serde(default)]
    pub strongest: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffects {
    #[serde(default)]
    pub bleed: Option<BleedState>,
    #[serde(default)]
    pub stunned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleState {
    pub boss_id: String,
    #[serde(default)]
    pub boss_name: String,
    pub player_hp: i32,
    pub player_max_hp: i32,
    pub boss_hp: i32,
    pub boss_max_hp: i32,
    #[serde(default)]
    pub effects: ActiveEffects,
    pub turn: u32,
    #[serde(default)]
    pub log: Vec<String>,
    pub active: bool,
    pub finished: bool,
    pub player_won: bool,
}

impl BattleState {
    fn new(player: &PlayerRecord, boss: &Boss) -> Self {
        let player_max_hp = player.battle_max_hp();
        BattleState {
            boss_id: boss.id.clone(),
            boss_name: boss.name.clone(),
            player_hp: player_max_hp,
            player_max_hp,
            boss_hp: boss.max_hp,
            boss_max_hp: boss.max_hp,
            effects: ActiveEffects::default(),
            turn: 0,
            log: vec![format!(
                "⚔️ Battle with {} begins! You {} HP vs {} HP",
                boss.name, player_max_hp, boss.max_hp
            )],
            active: true,
            finished: false,
            player_won: false,
        }
    }

    fn finish(&mut self, won: bool) {
        self.active = false;
        self.finished = true;
        self.player_won = won;
    }

    fn append_log(&mut self, lines: &[String]) {
        self.log.extend(lines.iter().cloned());
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }

    /// Boss HP as a fraction of its maximum.
    pub fn boss_hp_fraction(&self) -> f64 {
        if self.boss_max_hp <= 0 {
            return 0.0;
        }
        f64::from(self.boss_hp) / f64::from(self.boss_max_hp)
    }
}

/// Result of one `take_turn` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub turn: u32,
    /// Log lines produced by this call only.
    pub lines: Vec<String>,
    pub finished: bool,
    pub player_won: bool,
}

impl TurnReport {
    fn settled(battle: &BattleState) -> Self {
        TurnReport {
            turn: battle.turn,
            lines: Vec::new(),
            finished: battle.finished,
            player_won: battle.player_won,
        }
    }
}

/// Reward paid out by `end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootReward {
    pub exp: u64,
    pub rub: i64,
    pub usd: i64,
    pub items: Vec<String>,
}

impl LootReward {
    pub fn is_empty(&self) -> bool {
        self.exp == 0 && self.rub == 0 && self.usd == 0 && self.items.is_empty()
    }
}

/// Roll a boss's loot table: rub, then usd (each only when configured), then one draw per
/// item drop in table order.
pub fn roll_loot(boss: &Boss, dice: &mut dyn Dice) -> LootReward {
    let table = &boss.loot;
    let rub = table
        .rub
        .map(|(lo, hi)| dice.range_inclusive(lo, hi))
        .unwrap_or(0);
    let usd = table
        .usd
        .map(|(lo, hi)| dice.range_inclusive(lo, hi))
        .unwrap_or(0);
    let mut items = Vec::new();
    for drop in &table.items {
        if dice.chance(drop.chance) {
            items.push(drop.id.clone());
        }
    }
    LootReward {
        exp: table.exp,
        rub,
        usd,
        items,
    }
}

fn truncate_mul(value: i32, factor: f64) -> i32 {
    (f64::from(value) * factor) as i32
}

/// Stateless battle rules over a shared catalog.
#[derive(Debug, Clone, Copy)]
pub struct BattleEngine<'a> {
    catalog: &'a BattleCatalog,
}

impl<'a> BattleEngine<'a> {
    pub fn new(catalog: &'a BattleCatalog) -> Self {
        Self { catalog }
    }

    /// Start a battle against `boss_id`. Fails if a battle is already active.
    pub fn start<'p>(
        &self,
        player: &'p mut PlayerRecord,
        boss_id: &str,
    ) -> Result<&'p BattleState, GameError> {
        if player.has_active_battle() {
            return Err(GameError::AlreadyActive);
        }
        let boss = self.catalog.get_boss(boss_id)?;
        if let Some(old) = player.battle.as_ref() {
            log::warn!(
                "player {} starts a new battle with unclaimed result vs {}",
                player.user_id,
                old.boss_id
            );
        }
        log::info!("player {} engages {}", player.user_id, boss.id);
        let state = BattleState::new(player, boss);
        Ok(player.battle.insert(state))
    }

    /// Resolve one turn using `move_id`.
    ///
    /// A finished battle is returned as-is (empty `lines`, no draws). Every error is raised
    /// before anything is mutated.
    pub fn take_turn(
        &self,
        player: &mut PlayerRecord,
        dice: &mut dyn Dice,
        move_id: &str,
    ) -> Result<TurnReport, GameError> {
        let strength = player.strength;
        let battle = player.battle.as_mut().ok_or(GameError::NotActive)?;
        if battle.finished {
            return Ok(TurnReport::settled(battle));
        }
        if !battle.active {
            return Err(GameError::NotActive);
        }
        let mv = self.catalog.get_move(move_id)?;
        let boss = self.catalog.get_boss(&battle.boss_id)?;
        if player.energy < mv.energy_cost {
            return Err(GameError::InsufficientEnergy {
                needed: mv.energy_cost,
                available: player.energy,
            });
        }

        let lines = resolve_turn(battle, &mut player.energy, strength, mv, boss, dice);
        battle.append_log(&lines);
        if battle.finished {
            log::info!(
                "player {} {} vs {} on turn {}",
                player.user_id,
                if battle.player_won { "won" } else { "lost" },
                battle.boss_id,
                battle.turn
            );
        }
        Ok(TurnReport {
            turn: battle.turn,
            lines,
            finished: battle.finished,
            player_won: battle.player_won,
        })
    }

    /// Give up an active battle; it finishes as a loss.
    pub fn forfeit(&self, player: &mut PlayerRecord) -> Result<TurnReport, GameError> {
        let battle = player.battle.as_mut().ok_or(GameError::NotActive)?;
        if battle.finished {
            return Ok(TurnReport::settled(battle));
        }
        let line = format!("🏳️ You flee from {}", battle.boss_name);
        battle.finish(false);
        battle.append_log(std::slice::from_ref(&line));
        Ok(TurnReport {
            turn: battle.turn,
            lines: vec![line],
            finished: true,
            player_won: false,
        })
    }

    /// Pay out a finished battle and clear it from the player.
    ///
    /// Not idempotent on its own: the caller must persist the cleared record before
    /// accepting another `end` for the same player.
    pub fn end(
        &self,
        player: &mut PlayerRecord,
        dice: &mut dyn Dice,
    ) -> Result<LootReward, GameError> {
        let battle = player.battle.as_ref().ok_or(GameError::NotActive)?;
        if !battle.finished {
            return Err(GameError::NotFinished);
        }
        let reward = if battle.player_won {
            match self.catalog.get_boss(&battle.boss_id) {
                Ok(boss) => roll_loot(boss, dice),
                Err(e) => {
                    log::warn!("loot for {} skipped: {}", player.user_id, e);
                    LootReward::default()
                }
            }
        } else {
            LootReward::default()
        };

        player.battle = None;
        player.money_rub = player.money_rub.saturating_add(reward.rub);
        player.money_usd = player.money_usd.saturating_add(reward.usd);
        player.inventory.extend(reward.items.iter().cloned());
        player.grant_exp(reward.exp);
        Ok(reward)
    }
}

fn resolve_turn(
    battle: &mut BattleState,
    energy: &mut u32,
    strength: i32,
    mv: &Move,
    boss: &Boss,
    dice: &mut dyn Dice,
) -> Vec<String> {
    let mut lines = Vec::new();
    battle.turn += 1;

    // Bleed ticks first and can end the fight on its own.
    if let Some(bleed) = battle.effects.bleed.as_mut() {
        if bleed.remaining > 0 {
            battle.boss_hp = battle.boss_hp.saturating_sub(bleed.damage_per_turn);
            bleed.remaining -= 1;
            if bleed.remaining == 0 {
                lines.push(format!(
                    "🩸 Bleeding deals {} damage to {}; the bleeding stops",
                    bleed.damage_per_turn, boss.name
                ));
                battle.effects.bleed = None;
            } else {
                lines.push(format!(
                    "🩸 Bleeding deals {} damage to {} ({} turns left)",
                    bleed.damage_per_turn, boss.name, bleed.remaining
                ));
            }
        }
    }
    if battle.boss_hp <= 0 {
        lines.push(format!("🏆 {} bleeds out. Victory!", boss.name));
        battle.finish(true);
        return lines;
    }

    *energy -= mv.energy_cost;

    let missed = dice.chance(mv.miss_chance);
    if missed {
        lines.push(format!("💨 {} misses!", mv.name));
    } else {
        let mut damage = mv
            .base_damage
            .saturating_add(strength)
            .saturating_sub(boss.defense)
            .max(1);
        if dice.chance(mv.crit_chance) {
            damage = truncate_mul(damage, mv.crit_multiplier);
            lines.push(format!(
                "💥 Critical! {} hits {} for {} damage",
                mv.name, boss.name, damage
            ));
        } else {
            lines.push(format!("👊 {} hits {} for {} damage", mv.name, boss.name, damage));
        }
        battle.boss_hp = battle.boss_hp.saturating_sub(damage);

        for effect in &mv.effects {
            apply_effect(battle, effect, boss, dice, &mut lines);
        }
    }

    if battle.boss_hp <= 0 {
        lines.push(format!("🏆 {} is defeated. Victory!", boss.name));
        battle.finish(true);
        return lines;
    }

    if battle.effects.stunned {
        battle.effects.stunned = false;
        lines.push(format!("💫 {} is stunned and skips a turn", boss.name));
    } else {
        let (lo, hi) = boss.damage_range;
        let mut damage = dice.range_inclusive(i64::from(lo), i64::from(hi)) as i32;
        if battle.boss_hp_fraction() <= boss.rage_threshold {
            damage = truncate_mul(damage, boss.rage_multiplier);
            lines.push(format!(
                "😡 {} is enraged and hits you for {} damage",
                boss.name, damage
            ));
        } else {
            lines.push(format!("🗡️ {} hits you for {} damage", boss.name, damage));
        }
        battle.player_hp = battle.player_hp.saturating_sub(damage);
    }

    if battle.player_hp <= 0 {
        lines.push(format!("☠️ You were defeated by {}", boss.name));
        battle.finish(false);
    }
    lines
}

fn apply_effect(
    battle: &mut BattleState,
    effect: &Effect,
    boss: &Boss,
    dice: &mut dyn Dice,
    lines: &mut Vec<String>,
) {
    match *effect {
        Effect::Bleed {
            turns,
            damage_per_turn,
        } => {
            if dice.chance(boss.resistance(EffectKind::Bleed)) {
                lines.push(format!("🛡️ {} resists bleeding", boss.name));
                return;
            }
            let bleed = match battle.effects.bleed.as_mut() {
                Some(b) => {
                    // a weaker application never lowers the current damage
                    b.strongest = b.strongest.max(damage_per_turn);
                    let cap = b.strongest.saturating_mul(BLEED_DAMAGE_CAP_FACTOR);
                    b.stacks = (b.stacks + 1).min(MAX_BLEED_STACKS);
                    b.damage_per_turn = b
                        .damage_per_turn
                        .saturating_add(damage_per_turn)
                        .min(cap)
                        .max(b.damage_per_turn);
                    b.remaining = turns;
                    b
                }
                None => battle.effects.bleed.insert(BleedState {
                    remaining: turns,
                    damage_per_turn,
                    stacks: 1,
                    strongest: damage_per_turn,
                }),
            };
            lines.push(format!(
                "🩸 {} is bleeding (x{}, {} per turn)",
                boss.name, bleed.stacks, bleed.damage_per_turn
            ));
        }
        Effect::Stun { chance } => {
            let effective = chance * (1.0 - boss.resistance(EffectKind::Stun));
            if dice.chance(effective) {
                battle.effects.stunned = true;
                lines.push(format!("💫 {} is stunned", boss.name));
            } else {
                lines.push(format!("🛡️ {} resists the stun", boss.name));
            }
        }
    }
}
