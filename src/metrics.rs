//! Request and game counters.
//!
//! One [`Metrics`] lives inside each `GameService`; `GET /metrics` serves a [`Snapshot`].
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    http_requests: AtomicU64,
    http_errors: AtomicU64,
    bot_updates: AtomicU64,
    actions: AtomicU64,
    battles_started: AtomicU64,
    battles_won: AtomicU64,
    battles_lost: AtomicU64,
    turns: AtomicU64,
    loot_payouts: AtomicU64,
    storage_errors: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            started: Instant::now(),
            http_requests: AtomicU64::new(0),
            http_errors: AtomicU64::new(0),
            bot_updates: AtomicU64::new(0),
            actions: AtomicU64::new(0),
            battles_started: AtomicU64::new(0),
            battles_won: AtomicU64::new(0),
            battles_lost: AtomicU64::new(0),
            turns: AtomicU64::new(0),
            loot_payouts: AtomicU64::new(0),
            storage_errors: AtomicU64::new(0),
        }
    }

    pub fn inc_http_request(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_http_error(&self) {
        self.http_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_bot_update(&self) {
        self.bot_updates.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_action(&self) {
        self.actions.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_battle_started(&self) {
        self.battles_started.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_turn(&self) {
        self.turns.fetch_add(1, Ordering::Relaxed);
    }
    pub fn inc_storage_error(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a battle result the first time it is observed.
    pub fn record_outcome(&self, player_won: bool) {
        if player_won {
            self.battles_won.fetch_add(1, Ordering::Relaxed);
        } else {
            self.battles_lost.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_loot_payout(&self) {
        self.loot_payouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            http_requests: self.http_requests.load(Ordering::Relaxed),
            http_errors: self.http_errors.load(Ordering::Relaxed),
            bot_updates: self.bot_updates.load(Ordering::Relaxed),
            actions: self.actions.load(Ordering::Relaxed),
            battles_started: self.battles_started.load(Ordering::Relaxed),
            battles_won: self.battles_won.load(Ordering::Relaxed),
            battles_lost: self.battles_lost.load(Ordering::Relaxed),
            turns: self.turns.load(Ordering::Relaxed),
            loot_payouts: self.loot_payouts.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub uptime_secs: u64,
    pub http_requests: u64,
    pub http_errors: u64,
    pub bot_updates: u64,
    pub actions: u64,
    pub battles_started: u64,
    pub battles_won: u64,
    pub battles_lost: u64,
    pub turns: u64,
    pub loot_payouts: u64,
    pub storage_errors: u64,
}
