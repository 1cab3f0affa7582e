use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{deserialize_flexible_id, StoredObject};
use crate::{error::AppError, storage::db::SurrealDbClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Interviewer,
    Astronaut,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Interviewer => f.write_str("interviewer"),
            Speaker::Astronaut => f.write_str("astronaut"),
        }
    }
}

/// One speaker turn from an oral-history transcript, in transcript order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OralHistorySegment {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub astronaut_name: String,
    pub pdf_url: String,
    pub interview_date: Option<NaiveDate>,
    pub segment_index: usize,
    pub speaker: Speaker,
    pub text: String,
    pub word_count: usize,
    pub scraped_at: DateTime<Utc>,
}

impl OralHistorySegment {
    pub fn new(
        astronaut_name: String,
        pdf_url: String,
        segment_index: usize,
        speaker: Speaker,
        text: String,
    ) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            id: Uuid::new_v4().to_string(),
            astronaut_name,
            pdf_url,
            interview_date: None,
            segment_index,
            speaker,
            text,
            word_count,
            scraped_at: Utc::now(),
        }
    }

    /// Number of segments already stored for an astronaut. Used as the
    /// re-scrape guard: a transcript is only processed when this is zero.
    pub async fn count_for_astronaut(
        db: &SurrealDbClient,
        astronaut_name: &str,
    ) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: usize,
        }

        let mut response = db
            .query(
                "SELECT count() FROM oral_history_segment \
                 WHERE astronaut_name = $name GROUP ALL",
            )
            .bind(("name", astronaut_name.to_string()))
            .await?;
        let row: Option<CountRow> = response.take(0)?;

        Ok(row.map_or(0, |r| r.count))
    }
}

impl StoredObject for OralHistorySegment {
    fn table_name() -> &'static str {
        "oral_history_segment"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}
