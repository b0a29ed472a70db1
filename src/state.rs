//! Runtime state shared by the dispatcher, the command surface and the status
//! scheduler. Constructed once at startup and passed around as `Arc<BotState>`.

use crate::gateway::Gateway;
use crate::policy::{self, Verdict};
use crate::status::{MetricsSampler, StatusSample};
use crate::store::ConfigStore;
use anyhow::Result;
use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct BotState {
    started_at: Instant,
    community_name: String,
    store: ConfigStore,
    banned_words: Mutex<Vec<String>>,
    sampler: Mutex<MetricsSampler>,
    rotation_index: AtomicUsize,
}

impl BotState {
    /// Build state from the store, loading (or seeding) the banned-word list
    pub async fn load(store: ConfigStore, community_name: impl Into<String>) -> Result<Self> {
        let words = store.load_banned_words().await?;
        info!("Loaded {} banned words", words.len());
        Ok(Self::with_words(store, words, community_name))
    }

    /// Build state around an already loaded word list
    pub fn with_words(store: ConfigStore, words: Vec<String>, community_name: impl Into<String>) -> Self {
        BotState {
            started_at: Instant::now(),
            community_name: community_name.into(),
            store,
            banned_words: Mutex::new(words),
            sampler: Mutex::new(MetricsSampler::new()),
            rotation_index: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn community_name(&self) -> &str {
        &self.community_name
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Snapshot of the banned-word list in stored order
    pub async fn banned_words(&self) -> Vec<String> {
        self.banned_words.lock().await.clone()
    }

    pub async fn banned_word_count(&self) -> usize {
        self.banned_words.lock().await.len()
    }

    /// Run the content policy against the current word list
    pub async fn evaluate(&self, text: &str, is_privileged: bool) -> Verdict {
        let words = self.banned_words.lock().await;
        policy::evaluate(text, is_privileged, &words[..])
    }

    /// Append a word and persist. Returns `false` if the exact word is already listed.
    ///
    /// The list stays locked until the file is written, and the in-memory change is
    /// rolled back if the write fails, so memory and disk never disagree.
    pub async fn add_banned_word(&self, word: &str) -> Result<bool> {
        let mut words = self.banned_words.lock().await;
        if words.iter().any(|w| w == word) {
            return Ok(false);
        }

        words.push(word.to_string());
        if let Err(e) = self.store.save_banned_words(&words).await {
            words.pop();
            return Err(e);
        }
        Ok(true)
    }

    /// Remove the first exact match and persist. Returns `false` if the word is not listed.
    pub async fn remove_banned_word(&self, word: &str) -> Result<bool> {
        let mut words = self.banned_words.lock().await;
        let Some(position) = words.iter().position(|w| w == word) else {
            return Ok(false);
        };

        let removed = words.remove(position);
        if let Err(e) = self.store.save_banned_words(&words).await {
            words.insert(position, removed);
            return Err(e);
        }
        Ok(true)
    }

    pub fn rotation_index(&self) -> usize {
        self.rotation_index.load(Ordering::Relaxed)
    }

    pub fn set_rotation_index(&self, index: usize) {
        self.rotation_index.store(index, Ordering::Relaxed);
    }

    /// Assemble a fresh health snapshot
    pub async fn sample(&self, gateway: &dyn Gateway) -> StatusSample {
        let latency_ms = gateway
            .latency()
            .await
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let metrics = self.sampler.lock().await.sample();
        let member_count = gateway
            .community_member_counts()
            .await
            .iter()
            .map(|(_, count)| count)
            .sum();

        StatusSample {
            latency_ms,
            memory_mb: metrics.memory_mb,
            cpu_percent: metrics.cpu_percent,
            member_count,
            uptime: self.uptime(),
        }
    }
}
