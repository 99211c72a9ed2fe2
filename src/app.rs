//! Wiring from a [`Config`] to a ready-to-serve [`Router`].

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::bot::BotHandler;
use crate::config::Config;
use crate::game::catalog::BattleCatalog;
use crate::game::dice::{Dice, RngDice};
use crate::http::Router;
use crate::service::GameService;
use crate::storage::PlayerStore;

/// Random source for the configured seed, or entropy when none is set.
pub fn make_dice(seed: Option<u64>) -> Box<dyn Dice + Send> {
    match seed {
        Some(seed) => {
            log::info!("using fixed battle seed {}", seed);
            Box::new(RngDice::seeded(seed))
        }
        None => Box::new(RngDice::from_entropy()),
    }
}

pub async fn build_service(config: &Config) -> Result<Arc<GameService>> {
    let catalog = BattleCatalog::load(&config.game.moves_file, &config.game.bosses_file);
    if catalog.is_empty() {
        log::warn!("battle catalog is empty; battles are unavailable");
    }
    let store = PlayerStore::open(&config.storage.data_dir)
        .await
        .map_err(|e| anyhow!("Failed to open player store in {}: {}", config.storage.data_dir, e))?;
    Ok(Arc::new(GameService::new(
        Arc::new(catalog),
        store,
        make_dice(config.game.rng_seed),
    )))
}

pub async fn build_router(config: &Config) -> Result<Arc<Router>> {
    let service = build_service(config).await?;
    let mut router = Router::new(
        service,
        &config.server.static_dir,
        config.server.max_body_bytes,
    );
    if config.bot.webhook_enabled() {
        log::info!("bot webhook enabled at /webhook/<token>");
        router = router.with_bot(BotHandler::new(&config.bot.token, &config.bot.webapp_url));
    } else if config.bot.enabled {
        log::warn!("bot enabled without a token; webhook disabled");
    }
    Ok(Arc::new(router))
}
