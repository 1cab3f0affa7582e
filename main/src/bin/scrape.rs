use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use common::{
    storage::{db::SurrealDbClient, types::expedition::load_expeditions},
    utils::config::get_config,
};
use scraping_pipeline::{
    blog::BlogScraper,
    cache::ContentCache,
    checkpoint::CheckpointStore,
    fetcher::RateLimitedFetcher,
    oral_history::OralHistoryScraper,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

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

    let expeditions = match load_expeditions(&config.expeditions_path) {
        Ok(expeditions) => expeditions,
        Err(err) => {
            warn!(path = %config.expeditions_path, error = %err, "no expedition metadata, posts will be unmapped");
            Vec::new()
        }
    };

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build http client")?;

    let data_dir = Path::new(&config.data_dir);
    let html_cache = ContentCache::new(data_dir.join("raw").join("html"));
    html_cache.ensure_dir().await?;
    let pdf_cache = ContentCache::new(data_dir.join("raw").join("pdfs"));
    pdf_cache.ensure_dir().await?;

    let checkpoints =
        CheckpointStore::new(data_dir.join("raw").join("blog_scrape_checkpoint.json"));
    let base_url = Url::parse(&config.blog_base_url).context("invalid blog base url")?;

    let mut blog_fetcher = RateLimitedFetcher::new(
        client.clone(),
        html_cache,
        Duration::from_millis(config.blog_rate_limit_ms),
    );
    let blog_summary = BlogScraper::new(
        &db,
        &mut blog_fetcher,
        &checkpoints,
        &expeditions,
        base_url,
        config.max_listing_pages,
    )
    .run()
    .await
    .context("blog scrape failed")?;
    info!(
        pages = blog_summary.pages_visited,
        new = blog_summary.new_posts,
        duplicates = blog_summary.duplicate_posts,
        skipped = blog_summary.skipped_posts,
        "blog scrape complete"
    );

    let mut pdf_fetcher = RateLimitedFetcher::new(
        client,
        pdf_cache,
        Duration::from_millis(config.pdf_rate_limit_ms),
    );
    let oral_summary =
        OralHistoryScraper::new(&db, &mut pdf_fetcher, config.oral_history_index_url.clone())
            .run()
            .await
            .context("oral history scrape failed")?;
    info!(
        processed = oral_summary.transcripts_processed,
        skipped = oral_summary.transcripts_skipped,
        segments = oral_summary.segments_stored,
        "oral history scrape complete"
    );

    Ok(())
}
