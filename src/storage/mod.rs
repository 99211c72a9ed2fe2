//! # Storage - player record persistence
//!
//! All player records live in one JSON object keyed by player id:
//!
//! ```text
//! data/
//! ├── players.json        ← { "<user_id>": PlayerRecord, ... }
//! └── players.json.lock   ← fs2 exclusive lock held while the snapshot is replaced
//! ```
//!
//! The whole mapping is kept in memory and rewritten as one atomic snapshot (temp file,
//! fsync, rename, directory fsync) after every mutation. Callers serialise access; the
//! file lock only guards against a second process pointed at the same data directory.
//!
//! ```rust,no_run
//! use bomzh::storage::PlayerStore;
//! use chrono::Utc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bomzh::game::GameError> {
//!     let mut store = PlayerStore::open("./data").await?;
//!     let (player, created) = store.get_or_create("42", Utc::now());
//!     player.money_rub += 5;
//!     if created {
//!         println!("new player");
//!     }
//!     store.save().await?;
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::game::{GameError, PlayerRecord};

pub const PLAYERS_FILE: &str = "players.json";
/// Refuse to load a snapshot larger than this.
pub const MAX_SNAPSHOT_BYTES: u64 = 64 * 1024 * 1024;

/// In-memory player table backed by a JSON snapshot file.
#[derive(Debug)]
pub struct PlayerStore {
    path: PathBuf,
    players: BTreeMap<String, PlayerRecord>,
}

impl PlayerStore {
    /// Open (or create) the store under `data_dir`.
    ///
    /// A missing snapshot starts an empty table. A snapshot that fails to parse is an error:
    /// overwriting it with an empty table would lose every player.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, GameError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir).await?;
        let path = dir.join(PLAYERS_FILE);
        let players = match fs::metadata(&path).await {
            Ok(meta) if meta.len() > MAX_SNAPSHOT_BYTES => {
                return Err(GameError::Storage(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("{} exceeds {} bytes", path.display(), MAX_SNAPSHOT_BYTES),
                )));
            }
            Ok(_) => {
                let data = fs::read_to_string(&path).await?;
                let cleaned = data.trim_start_matches('\0');
                if cleaned.trim().is_empty() {
                    BTreeMap::new()
                } else {
                    serde_json::from_str(cleaned)?
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        log::info!("loaded {} player(s) from {}", players.len(), path.display());
        Ok(PlayerStore { path, players })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, user_id: &str) -> Option<&PlayerRecord> {
        self.players.get(user_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    /// Fetch a record, creating it with starting stats on first reference.
    /// The flag is true when the record was just created.
    pub fn get_or_create(&mut self, user_id: &str, now: DateTime<Utc>) -> (&mut PlayerRecord, bool) {
        let mut created = false;
        let record = self.players.entry(user_id.to_string()).or_insert_with(|| {
            created = true;
            PlayerRecord::new(user_id, now)
        });
        if created {
            log::info!("new player {}", user_id);
        }
        (record, created)
    }

    /// Write the whole table to disk as one atomic snapshot.
    ///
    /// The locked write and its fsyncs run on the blocking pool.
    pub async fn save(&self) -> Result<(), GameError> {
        let content = serde_json::to_string_pretty(&self.players)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_file_locked(&path, &content))
            .await
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))??;
        log::trace!("saved {} player(s)", self.players.len());
        Ok(())
    }
}

/// Replace `path` with `content`: write a unique temp file, fsync, rename over the target,
/// then fsync the directory. An fs2 lock on `<path>.lock` is held throughout.
fn write_file_locked(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(PLAYERS_FILE);

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(dir.join(format!("{}.lock", base)))?;
    lock_file.lock_exclusive()?;

    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                fill_temp(&candidate, &mut tmp, content)?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(e),
        }
    };

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    drop(lock_file);
    Ok(())
}

/// Write `content` into the freshly created temp file at `path`, removing it on failure.
fn fill_temp(path: &Path, file: &mut impl Write, content: &str) -> std::io::Result<()> {
    let written = file.write_all(content.as_bytes()).and_then(|_| file.flush());
    if written.is_err() {
        let _ = std::fs::remove_file(path);
    }
    written
}
