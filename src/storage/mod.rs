//! Local data directory.
//!
//! Layout:
//! - `raw/`: cached API responses (see `fetch`)
//! - `match_data.json`: last fetched match envelope, pretty printed
//! - `summaries/<match_id>/<player>/`: derived summary JSON files
//! - `history/feedback.jsonl`: generated coaching feedback

pub mod cache;
pub mod jsonl;

use std::path::PathBuf;
use thiserror::Error;

pub use cache::SummaryCache;
pub use jsonl::{FeedbackLog, JsonlReader, JsonlWriter};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn match_data_path(&self) -> PathBuf {
        self.data_dir.join("match_data.json")
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.data_dir.join("summaries")
    }

    /// Summary directory for one match. Empty ids share `unknown/`.
    pub fn match_summaries_dir(&self, match_id: &str) -> PathBuf {
        let id = if match_id.is_empty() {
            "unknown"
        } else {
            match_id
        };
        self.summaries_dir().join(id)
    }

    /// Summary directory for one player in one match.
    pub fn player_summaries_dir(&self, match_id: &str, player: &str) -> PathBuf {
        self.match_summaries_dir(match_id).join(path_safe(player))
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("history")
    }

    pub fn feedback_log_path(&self) -> PathBuf {
        self.history_dir().join("feedback.jsonl")
    }
}

/// Player names may contain spaces and non-ASCII letters; only path
/// separators and control characters are replaced.
fn path_safe(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '.' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.trim().is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
