//! # Feature: Config Store
//!
//! JSON-backed persistence for the banned-word list and the per-community
//! welcome channel map. Both documents are read and rewritten wholesale.
//!
//! All writes go through a single writer lock, so a read-modify-write of the
//! welcome map or a rewrite of the word list never interleaves with another.
//! Each write goes to a staging file that is renamed over the target, so
//! lock-free readers see either the old document or the new one, never a
//! partial write. A missing file is not an error: the word list is seeded, the
//! welcome map is empty.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Words written to disk the first time the bot starts without a word list
pub const DEFAULT_BANNED_WORDS: [&str; 6] = ["ควย", "เย็ด", "มึง", "กู", "สัส", "เหี้ย"];

/// Community id (as a string key) to welcome channel id
pub type WelcomeConfig = BTreeMap<String, u64>;

pub struct ConfigStore {
    banned_words_path: PathBuf,
    welcome_config_path: PathBuf,
    writer: Mutex<()>,
}

impl ConfigStore {
    pub fn new(banned_words_path: impl Into<PathBuf>, welcome_config_path: impl Into<PathBuf>) -> Self {
        ConfigStore {
            banned_words_path: banned_words_path.into(),
            welcome_config_path: welcome_config_path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn banned_words_path(&self) -> &Path {
        &self.banned_words_path
    }

    pub fn welcome_config_path(&self) -> &Path {
        &self.welcome_config_path
    }

    /// Load the banned-word list, seeding and persisting the defaults if no file exists
    pub async fn load_banned_words(&self) -> Result<Vec<String>> {
        match read_json::<Vec<String>>(&self.banned_words_path).await? {
            Some(words) => {
                debug!(
                    "Loaded {} banned words from {}",
                    words.len(),
                    self.banned_words_path.display()
                );
                Ok(words)
            }
            None => {
                let words: Vec<String> = DEFAULT_BANNED_WORDS.iter().map(|w| w.to_string()).collect();
                self.save_banned_words(&words).await?;
                info!(
                    "No banned word list found, seeded {} default words at {}",
                    words.len(),
                    self.banned_words_path.display()
                );
                Ok(words)
            }
        }
    }

    /// Overwrite the banned-word list on disk
    pub async fn save_banned_words(&self, words: &[String]) -> Result<()> {
        let _guard = self.writer.lock().await;
        write_json(&self.banned_words_path, &words).await
    }

    /// Read the welcome channel map fresh from disk
    pub async fn load_welcome_config(&self) -> Result<WelcomeConfig> {
        Ok(read_json::<WelcomeConfig>(&self.welcome_config_path)
            .await?
            .unwrap_or_default())
    }

    /// Welcome channel configured for a community, read fresh from disk
    pub async fn welcome_channel(&self, community_id: u64) -> Result<Option<u64>> {
        let config = self.load_welcome_config().await?;
        Ok(config.get(&community_id.to_string()).copied())
    }

    /// Set (or overwrite) a community's welcome channel and persist immediately
    pub async fn set_welcome_channel(&self, community_id: u64, channel_id: u64) -> Result<()> {
        let _guard = self.writer.lock().await;
        let mut config = read_json::<WelcomeConfig>(&self.welcome_config_path)
            .await?
            .unwrap_or_default();
        config.insert(community_id.to_string(), channel_id);
        write_json(&self.welcome_config_path, &config).await
    }
}

/// Read a JSON document, returning `None` when the file does not exist
async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Replace a JSON document atomically. Callers hold the writer lock, so the
/// staging path is never shared.
async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let staging = staging_path(path);

    tokio::fs::write(&staging, content)
        .await
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    tokio::fs::rename(&staging, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
