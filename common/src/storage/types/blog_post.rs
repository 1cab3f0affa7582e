use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_flexible_id, tuple_id, StoredObject};

/// One extracted blog post. The record id is derived from the URL, which
/// makes the URL the effective uniqueness key under `INSERT IGNORE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogPost {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub published_date: NaiveDate,
    pub text: String,
    pub word_count: usize,
    pub expedition_id: Option<u32>,
    pub scraped_at: DateTime<Utc>,
}

impl BlogPost {
    pub fn new(
        url: String,
        title: String,
        author: Option<String>,
        published_date: NaiveDate,
        text: String,
        expedition_id: Option<u32>,
    ) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            id: tuple_id([url.as_str()]),
            url,
            title,
            author,
            published_date,
            text,
            word_count,
            expedition_id,
            scraped_at: Utc::now(),
        }
    }
}

impl StoredObject for BlogPost {
    fn table_name() -> &'static str {
        "blog_post"
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}
