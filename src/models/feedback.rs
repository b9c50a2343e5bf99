//! Persisted coaching feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One generated piece of coaching feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Derived from match, player, question and creation time.
    pub id: String,

    pub match_id: String,
    pub player: String,

    /// Model that produced the feedback.
    pub model: String,

    pub created_at: DateTime<Utc>,

    /// Follow-up question, if this was an `ask` rather than general feedback.
    #[serde(default)]
    pub question: Option<String>,

    pub feedback: String,
}

impl FeedbackRecord {
    pub fn new(
        match_id: impl Into<String>,
        player: impl Into<String>,
        model: impl Into<String>,
        question: Option<String>,
        feedback: impl Into<String>,
    ) -> Self {
        let match_id = match_id.into();
        let player = player.into();
        let created_at = Utc::now();
        let id = record_id(&[
            &match_id,
            &player,
            question.as_deref().unwrap_or(""),
            &created_at.to_rfc3339(),
        ]);

        Self {
            id,
            match_id,
            player,
            model: model.into(),
            created_at,
            question,
            feedback: feedback.into(),
        }
    }
}

/// First 16 hex chars of the SHA256 of the `|`-joined fields.
fn record_id(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())[..16].to_string()
}
