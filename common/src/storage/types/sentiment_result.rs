use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_flexible_id, tuple_id, SourceType, StoredObject};

/// Document-level sentiment scores for one `(source, model)` pair.
/// The record id encodes the `(source_type, source_id, model_name)`
/// uniqueness tuple, so recomputation is a stored no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentResult {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub label: String,
    pub positive_score: f64,
    pub negative_score: f64,
    pub neutral_score: f64,
    pub model_name: String,
    pub analyzed_at: DateTime<Utc>,
}

impl SentimentResult {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_type: SourceType,
        source_id: String,
        label: String,
        positive_score: f64,
        negative_score: f64,
        neutral_score: f64,
        model_name: String,
    ) -> Self {
        Self {
            id: tuple_id([source_type.as_str(), &source_id, &model_name]),
            source_type,
            source_id,
            label,
            positive_score,
            negative_score,
            neutral_score,
            model_name,
            analyzed_at: Utc::now(),
        }
    }
}

impl StoredObject for SentimentResult {
    fn table_name() -> &'static str {
        "sentiment_result"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}
