//! Battle configuration: move and boss definitions loaded from JSON seed files.
//!
//! Seed files are objects keyed by id. Every tuning field in a seed is optional; defaults
//! are filled in here, once, so the engine only ever sees complete records:
//!
//! ```json
//! { "kick": { "name": "Kick", "damage": 14, "energy_cost": 8, "miss_chance": 0.1,
//!             "effects": [{ "type": "stun", "chance": 0.25 }] } }
//! ```
//!
//! A missing or unparsable file yields an empty category (logged, not fatal). A single bad
//! entry is skipped with a warning and the rest of the file still loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::errors::GameError;

pub const DEFAULT_CRIT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_RAGE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_RAGE_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_BLEED_TURNS: u32 = 3;
pub const DEFAULT_BLEED_DAMAGE: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Bleed,
    Stun,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Bleed { turns: u32, damage_per_turn: i32 },
    Stun { chance: f64 },
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Bleed { .. } => EffectKind::Bleed,
            Effect::Stun { .. } => EffectKind::Stun,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: String,
    pub name: String,
    pub base_damage: i32,
    pub energy_cost: u32,
    pub miss_chance: f64,
    pub crit_chance: f64,
    pub crit_multiplier: f64,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub id: String,
    pub chance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    pub exp: u64,
    /// Inclusive primary currency range, `None` when the boss pays no rubles.
    pub rub: Option<(i64, i64)>,
    pub usd: Option<(i64, i64)>,
    pub items: Vec<ItemDrop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boss {
    pub id: String,
    pub name: String,
    pub max_hp: i32,
    pub defense: i32,
    /// Inclusive counterattack damage range.
    pub damage_range: (i32, i32),
    pub rage_threshold: f64,
    pub rage_multiplier: f64,
    pub resistances: BTreeMap<EffectKind, f64>,
    pub loot: LootTable,
}

impl Boss {
    /// Resist fraction for an effect kind, 0.0 when not configured.
    pub fn resistance(&self, kind: EffectKind) -> f64 {
        self.resistances.get(&kind).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Seed formats (loosely typed, everything optional)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EffectSeed {
    Bleed {
        turns: Option<u32>,
        #[serde(alias = "damage")]
        damage_per_turn: Option<i32>,
    },
    Stun {
        chance: Option<f64>,
    },
}

#[derive(Debug, Deserialize)]
struct MoveSeed {
    name: Option<String>,
    #[serde(alias = "damage")]
    base_damage: Option<i32>,
    #[serde(alias = "energy")]
    energy_cost: Option<u32>,
    miss_chance: Option<f64>,
    crit_chance: Option<f64>,
    crit_multiplier: Option<f64>,
    #[serde(default)]
    effects: Vec<EffectSeed>,
}

#[derive(Debug, Deserialize)]
struct ItemDropSeed {
    id: String,
    chance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LootSeed {
    exp: Option<u64>,
    rub: Option<[i64; 2]>,
    usd: Option<[i64; 2]>,
    #[serde(default)]
    items: Vec<ItemDropSeed>,
}

#[derive(Debug, Deserialize)]
struct BossSeed {
    name: Option<String>,
    #[serde(alias = "max_hp")]
    hp: Option<i32>,
    defense: Option<i32>,
    #[serde(alias = "damage_range")]
    damage: Option<[i32; 2]>,
    rage_threshold: Option<f64>,
    #[serde(alias = "rage_bonus")]
    rage_multiplier: Option<f64>,
    #[serde(default)]
    resistances: BTreeMap<String, f64>,
    #[serde(default)]
    loot: LootSeed,
}

fn probability(value: Option<f64>, default: f64, what: &str, id: &str) -> f64 {
    let v = value.unwrap_or(default);
    if !v.is_finite() || !(0.0..=1.0).contains(&v) {
        log::warn!("catalog: {} for '{}' out of range ({}), clamping", what, id, v);
        if v.is_finite() {
            return v.clamp(0.0, 1.0);
        }
        return default;
    }
    v
}

fn multiplier(value: Option<f64>, default: f64, what: &str, id: &str) -> f64 {
    let v = value.unwrap_or(default);
    if !v.is_finite() || v < 1.0 {
        log::warn!("catalog: {} for '{}' below 1.0 ({}), using 1.0", what, id, v);
        return 1.0;
    }
    v
}

fn ordered<T: PartialOrd + Copy>(pair: [T; 2]) -> (T, T) {
    if pair[0] <= pair[1] {
        (pair[0], pair[1])
    } else {
        (pair[1], pair[0])
    }
}

impl EffectSeed {
    fn into_effect(self, move_id: &str) -> Effect {
        match self {
            EffectSeed::Bleed {
                turns,
                damage_per_turn,
            } => Effect::Bleed {
                turns: turns.unwrap_or(DEFAULT_BLEED_TURNS).max(1),
                damage_per_turn: damage_per_turn.unwrap_or(DEFAULT_BLEED_DAMAGE).max(0),
            },
            EffectSeed::Stun { chance } => Effect::Stun {
                chance: probability(chance, 0.0, "stun chance", move_id),
            },
        }
    }
}

impl MoveSeed {
    fn into_move(self, id: &str) -> Move {
        Move {
            id: id.to_string(),
            name: self.name.unwrap_or_else(|| id.to_string()),
            base_damage: self.base_damage.unwrap_or(0),
            energy_cost: self.energy_cost.unwrap_or(0),
            miss_chance: probability(self.miss_chance, 0.0, "miss_chance", id),
            crit_chance: probability(self.crit_chance, 0.0, "crit_chance", id),
            crit_multiplier: multiplier(
                self.crit_multiplier,
                DEFAULT_CRIT_MULTIPLIER,
                "crit_multiplier",
                id,
            ),
            effects: self
                .effects
                .into_iter()
                .map(|e| e.into_effect(id))
                .collect(),
        }
    }
}

impl BossSeed {
    fn into_boss(self, id: &str) -> Boss {
        let mut resistances = BTreeMap::new();
        for (key, value) in self.resistances {
            let kind = match key.to_ascii_lowercase().as_str() {
                "bleed" => EffectKind::Bleed,
                "stun" => EffectKind::Stun,
                other => {
                    log::warn!("catalog: boss '{}' has unknown resistance '{}'", id, other);
                    continue;
                }
            };
            resistances.insert(kind, probability(Some(value), 0.0, "resistance", id));
        }
        let loot = LootTable {
            exp: self.loot.exp.unwrap_or(0),
            rub: self.loot.rub.map(ordered),
            usd: self.loot.usd.map(ordered),
            items: self
                .loot
                .items
                .into_iter()
                .map(|item| ItemDrop {
                    chance: probability(item.chance, 0.0, "drop chance", &item.id),
                    id: item.id,
                })
                .collect(),
        };
        Boss {
            id: id.to_string(),
            name: self.name.unwrap_or_else(|| id.to_string()),
            max_hp: self.hp.unwrap_or(1).max(1),
            defense: self.defense.unwrap_or(0).max(0),
            damage_range: ordered(self.damage.unwrap_or([0, 0])),
            rage_threshold: probability(
                self.rage_threshold,
                DEFAULT_RAGE_THRESHOLD,
                "rage_threshold",
                id,
            ),
            rage_multiplier: multiplier(
                self.rage_multiplier,
                DEFAULT_RAGE_MULTIPLIER,
                "rage_multiplier",
                id,
            ),
            resistances,
            loot,
        }
    }
}

/// Parse an id-keyed seed object, skipping entries that fail to decode.
fn parse_entries<S, T>(
    label: &str,
    content: &str,
    convert: impl Fn(S, &str) -> T,
) -> BTreeMap<String, T>
where
    S: serde::de::DeserializeOwned,
{
    let raw: BTreeMap<String, serde_json::Value> =
        match serde_json::from_str(content.trim_start_matches('\0')) {
            Ok(map) => map,
            Err(e) => {
                log::warn!("catalog: malformed {} data: {}", label, e);
                return BTreeMap::new();
            }
        };
    let mut out = BTreeMap::new();
    for (id, value) in raw {
        let key = id.trim().to_ascii_lowercase();
        match serde_json::from_value::<S>(value) {
            Ok(seed) => {
                let record = convert(seed, &key);
                out.insert(key, record);
            }
            Err(e) => log::warn!("catalog: skipping {} '{}': {}", label, id, e),
        }
    }
    out
}

/// Parse a moves seed document. Malformed input yields an empty map.
pub fn parse_moves(content: &str) -> BTreeMap<String, Move> {
    parse_entries("move", content, |seed: MoveSeed, id| seed.into_move(id))
}

/// Parse a bosses seed document. Malformed input yields an empty map.
pub fn parse_bosses(content: &str) -> BTreeMap<String, Boss> {
    parse_entries("boss", content, |seed: BossSeed, id| seed.into_boss(id))
}

fn read_seed(label: &str, path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            log::warn!("catalog: unable to read {} file {}: {}", label, path.display(), e);
            None
        }
    }
}

/// Immutable move and boss tables shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BattleCatalog {
    moves: BTreeMap<String, Move>,
    bosses: BTreeMap<String, Boss>,
}

impl BattleCatalog {
    pub fn new(
        moves: impl IntoIterator<Item = Move>,
        bosses: impl IntoIterator<Item = Boss>,
    ) -> Self {
        BattleCatalog {
            moves: moves.into_iter().map(|m| (m.id.clone(), m)).collect(),
            bosses: bosses.into_iter().map(|b| (b.id.clone(), b)).collect(),
        }
    }

    /// Load both seed files. Never fails: a missing or malformed file leaves its table empty.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(moves_path: P, bosses_path: Q) -> Self {
        let moves = read_seed("moves", moves_path.as_ref())
            .map(|s| parse_moves(&s))
            .unwrap_or_default();
        let bosses = read_seed("bosses", bosses_path.as_ref())
            .map(|s| parse_bosses(&s))
            .unwrap_or_default();
        log::info!(
            "catalog: loaded {} moves and {} bosses",
            moves.len(),
            bosses.len()
        );
        BattleCatalog { moves, bosses }
    }

    pub fn get_move(&self, id: &str) -> Result<&Move, GameError> {
        self.moves
            .get(id)
            .ok_or_else(|| GameError::UnknownMove(id.to_string()))
    }

    pub fn get_boss(&self, id: &str) -> Result<&Boss, GameError> {
        self.bosses
            .get(id)
            .ok_or_else(|| GameError::UnknownBoss(id.to_string()))
    }

    pub fn moves(&self) -> &BTreeMap<String, Move> {
        &self.moves
    }

    pub fn bosses(&self) -> &BTreeMap<String, Boss> {
        &self.bosses
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.bosses.is_empty()
    }
}
