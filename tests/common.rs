//! Test utilities & fixtures.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bomzh::game::catalog::{BattleCatalog, Boss, LootTable, Move};
use bomzh::game::dice::ScriptedDice;
use bomzh::http::{Request, Router};
use bomzh::service::GameService;
use bomzh::storage::PlayerStore;

/// Seed files shipped with the crate.
pub fn seeds_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("seeds")
}

/// A 20-damage jab for a strength-10 player against zero defense.
pub fn jab() -> Move {
    Move {
        id: "jab".into(),
        name: "Jab".into(),
        base_damage: 10,
        energy_cost: 5,
        miss_chance: 0.0,
        crit_chance: 0.0,
        crit_multiplier: 1.5,
        effects: Vec::new(),
    }
}

pub fn thug() -> Boss {
    Boss {
        id: "thug".into(),
        name: "Thug".into(),
        max_hp: 100,
        defense: 0,
        damage_range: (10, 20),
        rage_threshold: 0.3,
        rage_multiplier: 1.5,
        resistances: BTreeMap::new(),
        loot: LootTable {
            exp: 40,
            rub: Some((20, 40)),
            usd: None,
            items: Vec::new(),
        },
    }
}

pub fn scenario_catalog() -> BattleCatalog {
    BattleCatalog::new(vec![jab()], vec![thug()])
}

pub async fn service_in(dir: &Path, catalog: BattleCatalog, dice: ScriptedDice) -> Arc<GameService> {
    let store = PlayerStore::open(dir).await.expect("open store");
    Arc::new(GameService::new(Arc::new(catalog), store, Box::new(dice)))
}

pub fn router_for(service: Arc<GameService>, static_dir: &Path) -> Router {
    Router::new(service, static_dir, 64 * 1024)
}

pub fn get(target: &str) -> Request {
    Request::new("GET", target).expect("request")
}

pub fn post_json(target: &str, body: serde_json::Value) -> Request {
    Request::new("POST", target)
        .expect("request")
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}
