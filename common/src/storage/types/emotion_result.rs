use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_flexible_id, tuple_id, SourceType, StoredObject};

/// Document-level scores over the seven-emotion label set, plus the
/// dominant label. Unique per `(source_type, source_id, model_name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionResult {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub anger_score: f64,
    pub disgust_score: f64,
    pub fear_score: f64,
    pub joy_score: f64,
    pub neutral_score: f64,
    pub sadness_score: f64,
    pub surprise_score: f64,
    pub dominant_emotion: String,
    pub model_name: String,
    pub analyzed_at: DateTime<Utc>,
}

impl EmotionResult {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_type: SourceType,
        source_id: String,
        scores: [f64; 7],
        dominant_emotion: String,
        model_name: String,
    ) -> Self {
        let [anger, disgust, fear, joy, neutral, sadness, surprise] = scores;
        Self {
            id: tuple_id([source_type.as_str(), &source_id, &model_name]),
            source_type,
            source_id,
            anger_score: anger,
            disgust_score: disgust,
            fear_score: fear,
            joy_score: joy,
            neutral_score: neutral,
            sadness_score: sadness,
            surprise_score: surprise,
            dominant_emotion,
            model_name,
            analyzed_at: Utc::now(),
        }
    }
}

impl StoredObject for EmotionResult {
    fn table_name() -> &'static str {
        "emotion_result"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}
