use std::sync::Arc;
use std::time::Duration;

use analysis_pipeline::{
    oracle::HttpClassifier,
    runner::{AnalysisRunner, Analyzer},
};
use anyhow::Context;
use common::{storage::db::SurrealDbClient, utils::config::get_config};
use tokenizers::Tokenizer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn analyzer_for(
    client: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
    model: &str,
) -> anyhow::Result<Analyzer> {
    let tokenizer = Tokenizer::from_pretrained(model, None)
        .map_err(|err| anyhow::anyhow!("failed to load tokenizer for {model}: {err}"))?;
    let classifier = HttpClassifier::new(
        client.clone(),
        base_url.to_string(),
        model.to_string(),
        api_key.map(str::to_string),
    );
    Ok(Analyzer {
        classifier: Arc::new(classifier),
        codec: Arc::new(tokenizer),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = get_config().context("failed to load configuration")?;

    let db = SurrealDbClient::new(
        &config.surrealdb_address,
        &config.surrealdb_username,
        &config.surrealdb_password,
        &config.surrealdb_namespace,
        &config.surrealdb_database,
    )
    .await
    .context("failed to connect to surrealdb")?;
    db.ensure_initialized()
        .await
        .context("failed to initialize schema")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .context("failed to build http client")?;

    let api_key = config.inference_api_key.as_deref();
    let sentiment = analyzer_for(
        &client,
        &config.inference_api_url,
        api_key,
        &config.sentiment_model,
    )?;
    let emotion = analyzer_for(
        &client,
        &config.inference_api_url,
        api_key,
        &config.emotion_model,
    )?;

    let summary = AnalysisRunner::new(&db, Some(sentiment), Some(emotion), true)
        .run()
        .await
        .context("analysis run failed")?;
    info!(
        sentiment = summary.sentiment_stored,
        emotion = summary.emotion_stored,
        linguistic = summary.linguistic_stored,
        skipped = summary.skipped_short,
        failed = summary.failed,
        "analysis complete"
    );

    Ok(())
}
