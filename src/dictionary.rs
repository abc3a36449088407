//! Word validation gate: the public dictionary API or an offline word list.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

pub const DICTIONARY_API_BASE: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("dictionary request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid dictionary url '{0}'")]
    BadUrl(String),
}

/// Something that can tell whether a word exists.
#[async_trait]
pub trait Dictionary: Send + Sync {
    /// Look the word up. `Err` means the lookup itself failed.
    async fn lookup(&self, word: &str) -> Result<bool, DictionaryError>;

    /// Lookup with every failure folded into "not a word".
    async fn validate(&self, word: &str) -> bool {
        match self.lookup(word).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(word, error = %e, "dictionary lookup failed, treating word as invalid");
                false
            }
        }
    }
}

/// Client for `GET {base}/{word}`: a 200 carrying a JSON array means the
/// word exists; any other status means it does not.
pub struct DictionaryApi {
    client: reqwest::Client,
    base_url: String,
}

impl DictionaryApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn word_url(&self, word: &str) -> Result<Url, DictionaryError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| DictionaryError::BadUrl(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| DictionaryError::BadUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push(word);
        Ok(url)
    }
}

impl Default for DictionaryApi {
    fn default() -> Self {
        Self::new(DICTIONARY_API_BASE, Duration::from_secs(10))
    }
}

#[async_trait]
impl Dictionary for DictionaryApi {
    async fn lookup(&self, word: &str) -> Result<bool, DictionaryError> {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Ok(false);
        }
        let url = self.word_url(&word)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%word, %status, "dictionary rejected word");
            return Ok(false);
        }
        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(_) => return Ok(false),
        };
        Ok(body.is_array())
    }
}

/// In-memory word set, one word per line.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    pub fn parse(text: &str) -> Self {
        let words = text
            .lines()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphabetic()))
            .collect();
        Self { words }
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let list = Self::parse(&content);
        tracing::info!(path = %path.display(), words = list.len(), "loaded word list");
        Ok(list)
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|w| w.as_str())
    }
}

#[async_trait]
impl Dictionary for WordList {
    async fn lookup(&self, word: &str) -> Result<bool, DictionaryError> {
        Ok(self.contains(word))
    }
}
