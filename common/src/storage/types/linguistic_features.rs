use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_flexible_id, tuple_id, SourceType, StoredObject};

/// Rule-based linguistic features for one source row. Model-agnostic,
/// so the uniqueness tuple is just `(source_type, source_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinguisticFeatures {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub flesch_reading_ease: f64,
    pub avg_sentence_length: f64,
    pub lexical_diversity: f64,
    pub first_person_ratio: f64,
    pub exclamation_count: usize,
    pub question_count: usize,
    pub analyzed_at: DateTime<Utc>,
}

impl LinguisticFeatures {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_type: SourceType,
        source_id: String,
        flesch_reading_ease: f64,
        avg_sentence_length: f64,
        lexical_diversity: f64,
        first_person_ratio: f64,
        exclamation_count: usize,
        question_count: usize,
    ) -> Self {
        Self {
            id: tuple_id([source_type.as_str(), &source_id]),
            source_type,
            source_id,
            flesch_reading_ease,
            avg_sentence_length,
            lexical_diversity,
            first_person_ratio,
            exclamation_count,
            question_count,
            analyzed_at: Utc::now(),
        }
    }
}

impl StoredObject for LinguisticFeatures {
    fn table_name() -> &'static str {
        "linguistic_features"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}
