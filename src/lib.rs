//! # Bomzh - a persistent street-life game server
//!
//! Players gather bottles, dig through trash and train, then spend energy fighting
//! data-driven bosses in turn-based battles. State is kept per player and served to a
//! thin web client and a chat bot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bomzh::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let router = bomzh::app::build_router(&config).await?;
//!     let listener = tokio::net::TcpListener::bind(config.listen_addr()?).await?;
//!     bomzh::http::serve(listener, router, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - rules: player records, energy, actions, the battle engine and its catalog
//! - [`service`] - load / mutate / persist cycle shared by every front end
//! - [`storage`] - JSON snapshot of all player records
//! - [`http`] - HTTP/1.1 server, API routes and static files
//! - [`bot`] - chat commands answered through a webhook
//! - [`config`] - TOML configuration with environment overrides
//! - [`validation`] - request field and path validation
//!
//! ```text
//! ┌──────────┐  ┌──────────┐
//! │   http   │  │   bot    │ ← front ends
//! └──────────┘  └──────────┘
//!        │           │
//! ┌───────────────────────┐
//! │  service (one lock)   │ ← regen, rules, persist
//! └───────────────────────┘
//!        │           │
//! ┌──────────┐  ┌──────────┐
//! │   game   │  │ storage  │
//! └──────────┘  └──────────┘
//! ```

pub mod app;
pub mod bot;
pub mod config;
pub mod game;
pub mod http;
pub mod logutil;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod validation;
