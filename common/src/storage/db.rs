use std::ops::Deref;

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tracing::debug;

use super::types::StoredObject;
use crate::error::AppError;

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        db.signin(Root { username, password }).await?;
        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Declares the uniqueness tuples and lookup indexes the pipeline
    /// relies on. Idempotent, runs at every startup.
    pub async fn ensure_initialized(&self) -> Result<(), Error> {
        self.client
            .query(
                "DEFINE INDEX IF NOT EXISTS unique_blog_post_url ON TABLE blog_post FIELDS url UNIQUE;
                DEFINE INDEX IF NOT EXISTS idx_blog_post_date ON TABLE blog_post FIELDS published_date;
                DEFINE INDEX IF NOT EXISTS idx_oral_history_astronaut ON TABLE oral_history_segment FIELDS astronaut_name;
                DEFINE INDEX IF NOT EXISTS unique_sentiment_result ON TABLE sentiment_result FIELDS source_type, source_id, model_name UNIQUE;
                DEFINE INDEX IF NOT EXISTS unique_emotion_result ON TABLE emotion_result FIELDS source_type, source_id, model_name UNIQUE;
                DEFINE INDEX IF NOT EXISTS unique_linguistic_features ON TABLE linguistic_features FIELDS source_type, source_id UNIQUE;",
            )
            .await?;

        Ok(())
    }

    /// Conflict-ignoring insert keyed by the record id.
    ///
    /// Records built with a deterministic [`tuple_id`](super::types::tuple_id)
    /// make this the idempotency gate: repeated or crash-replayed inserts
    /// leave at most one stored row and never raise a duplicate error.
    ///
    /// Returns `true` when a new row was stored, `false` when the insert
    /// was ignored as a duplicate.
    pub async fn insert_ignore<T>(&self, item: T) -> Result<bool, AppError>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        let sql = format!("INSERT IGNORE INTO {} $content", T::table_name());
        let mut response = self.client.query(sql).bind(("content", item)).await?;
        let created: Vec<T> = response.take(0)?;

        if created.is_empty() {
            debug!(table = T::table_name(), "insert ignored duplicate row");
        }

        Ok(!created.is_empty())
    }

    /// Left-anti-join returning rows of `source_table` that have no result
    /// in `results_table` for the given `(source_type, source_id[, model])`
    /// tuple. Dropping `model` widens the join key for model-agnostic
    /// analyses such as linguistic features.
    pub async fn find_unprocessed<T>(
        &self,
        source_table: &str,
        results_table: &str,
        source_type: &str,
        model_name: Option<&str>,
    ) -> Result<Vec<T>, AppError>
    where
        T: StoredObject,
    {
        let mut response = match model_name {
            Some(model) => {
                let sql = format!(
                    "SELECT * FROM {source_table} WHERE record::id(id) NOT IN \
                     (SELECT VALUE source_id FROM {results_table} \
                      WHERE source_type = $source_type AND model_name = $model_name)"
                );
                self.client
                    .query(sql)
                    .bind(("source_type", source_type.to_string()))
                    .bind(("model_name", model.to_string()))
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT * FROM {source_table} WHERE record::id(id) NOT IN \
                     (SELECT VALUE source_id FROM {results_table} \
                      WHERE source_type = $source_type)"
                );
                self.client
                    .query(sql)
                    .bind(("source_type", source_type.to_string()))
                    .await?
            }
        };

        let rows: Vec<T> = response.take(0)?;
        Ok(rows)
    }

    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: StoredObject,
    {
        self.client.select(T::table_name()).await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{
        blog_post::BlogPost, sentiment_result::SentimentResult, SourceType,
    };
    use chrono::NaiveDate;
    use uuid::Uuid;

    async fn memory_db() -> SurrealDbClient {
        let database = Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("test_ns", &database)
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized()
            .await
            .expect("Failed to initialize schema");
        db
    }

    fn sample_post(url: &str) -> BlogPost {
        BlogPost::new(
            url.to_string(),
            "Crew Completes Spacewalk".to_string(),
            Some("Mark Garcia".to_string()),
            NaiveDate::from_ymd_opt(2023, 6, 1).expect("valid date"),
            "The crew completed a six hour spacewalk outside the station today."
                .to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn insert_ignore_is_idempotent() {
        let db = memory_db().await;
        let post = sample_post("https://blogs.nasa.gov/spacestation/2023/06/01/spacewalk/");

        assert!(db.insert_ignore(post.clone()).await.expect("first insert"));
        assert!(!db.insert_ignore(post).await.expect("second insert"));

        let stored: Vec<BlogPost> = db.get_all_stored_items().await.expect("select");
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn unprocessed_set_shrinks_after_result_insert() {
        let db = memory_db().await;
        let post = sample_post("https://blogs.nasa.gov/spacestation/2023/06/01/spacewalk/");
        let post_id = post.id.clone();
        db.insert_ignore(post).await.expect("insert post");

        let pending: Vec<BlogPost> = db
            .find_unprocessed("blog_post", "sentiment_result", "blog", Some("model-x"))
            .await
            .expect("query");
        assert_eq!(pending.len(), 1);

        let result = SentimentResult::new(
            SourceType::Blog,
            post_id.clone(),
            "positive".to_string(),
            0.9,
            0.05,
            0.05,
            "model-x".to_string(),
        );
        db.insert_ignore(result).await.expect("insert result");

        let pending: Vec<BlogPost> = db
            .find_unprocessed("blog_post", "sentiment_result", "blog", Some("model-x"))
            .await
            .expect("query");
        assert!(pending.is_empty(), "row must leave the unprocessed set");

        // A different model still sees the row as unprocessed.
        let other_model: Vec<BlogPost> = db
            .find_unprocessed("blog_post", "sentiment_result", "blog", Some("model-y"))
            .await
            .expect("query");
        assert_eq!(other_model.len(), 1);
    }

    #[tokio::test]
    async fn model_agnostic_join_key_ignores_model_name() {
        let db = memory_db().await;
        let post = sample_post("https://blogs.nasa.gov/spacestation/2023/06/02/science/");
        let post_id = post.id.clone();
        db.insert_ignore(post).await.expect("insert post");

        let result = SentimentResult::new(
            SourceType::Blog,
            post_id,
            "neutral".to_string(),
            0.1,
            0.1,
            0.8,
            "model-x".to_string(),
        );
        db.insert_ignore(result).await.expect("insert result");

        let pending: Vec<BlogPost> = db
            .find_unprocessed("blog_post", "sentiment_result", "blog", None)
            .await
            .expect("query");
        assert!(pending.is_empty());
    }
}
