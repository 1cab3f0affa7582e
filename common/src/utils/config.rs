use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_blog_base_url")]
    pub blog_base_url: String,
    #[serde(default = "default_oral_history_index_url")]
    pub oral_history_index_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_blog_rate_limit_ms")]
    pub blog_rate_limit_ms: u64,
    #[serde(default = "default_pdf_rate_limit_ms")]
    pub pdf_rate_limit_ms: u64,
    /// Overrides listing-page auto-detection when set.
    #[serde(default)]
    pub max_listing_pages: Option<u32>,
    #[serde(default = "default_expeditions_path")]
    pub expeditions_path: String,
    #[serde(default = "default_inference_api_url")]
    pub inference_api_url: String,
    #[serde(default)]
    pub inference_api_key: Option<String>,
    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,
    #[serde(default = "default_emotion_model")]
    pub emotion_model: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_blog_base_url() -> String {
    "https://blogs.nasa.gov/spacestation".to_string()
}

fn default_oral_history_index_url() -> String {
    "https://www.nasa.gov/history/johnson-history-resources/".to_string()
}

fn default_user_agent() -> String {
    "AstroSentimentResearch/1.0 (academic project)".to_string()
}

fn default_blog_rate_limit_ms() -> u64 {
    1_500
}

fn default_pdf_rate_limit_ms() -> u64 {
    2_000
}

fn default_expeditions_path() -> String {
    "./data/expeditions.json".to_string()
}

fn default_inference_api_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_sentiment_model() -> String {
    "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string()
}

fn default_emotion_model() -> String {
    "j-hartmann/emotion-english-distilroberta-base".to_string()
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
