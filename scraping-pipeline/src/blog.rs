//! ISS blog archive traversal: listing pages, post extraction, and the
//! checkpointed scrape loop.

use std::sync::LazyLock;

use chrono::NaiveDate;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            blog_post::BlogPost,
            expedition::{map_date_to_expedition, Expedition},
        },
    },
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::{
    cache::sanitize_key,
    checkpoint::CheckpointStore,
    fetcher::RateLimitedFetcher,
};

/// Extracted bodies shorter than this are treated as extraction misses.
const MIN_BODY_CHARS: usize = 50;
/// Cache keys derived from URLs are clipped to stay comfortably inside
/// file-name length limits.
const MAX_SLUG_CHARS: usize = 80;

#[allow(clippy::expect_used)]
static URL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").expect("valid regex"));
#[allow(clippy::expect_used)]
static PAGE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/page/(\d+)").expect("valid regex"));

#[allow(clippy::expect_used)]
fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// One entry on a listing page. Only the link is required; everything
/// else is re-resolved from the post page itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub url: String,
    pub title: String,
}

/// Metadata and body pulled out of a single post page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    pub title: String,
    pub author: Option<String>,
    pub published_date: NaiveDate,
    pub text: String,
}

/// Finds post entries on a listing page. Container selectors are tried
/// in order until one yields nodes; entries without a link are skipped.
pub fn extract_listing(html: &str, base: &Url) -> Vec<ListingItem> {
    let document = Html::parse_document(html);
    let link_selector = selector("h2 a, h1 a, .entry-title a");

    let mut items = Vec::new();
    for container_css in ["article", ".post", ".entry"] {
        let containers: Vec<ElementRef> =
            document.select(&selector(container_css)).collect();
        if containers.is_empty() {
            continue;
        }

        for container in containers {
            let Some(link) = container.select(&link_selector).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            items.push(ListingItem {
                url: resolved.to_string(),
                title: collapse_whitespace(&link.text().collect::<String>()),
            });
        }
        break;
    }
    items
}

/// Extracts title, author, date, and body from a post page. A missing or
/// unparseable date and a body under the minimum length are both skips
/// for this document only, never errors.
pub fn extract_post(html: &str, url: &str) -> Option<ExtractedPost> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("h1.entry-title, h1, .post-title"))
        .next()
        .map(|node| collapse_whitespace(&node.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let author = document
        .select(&selector(".byline a, .author a, .entry-author a"))
        .next()
        .map(|node| collapse_whitespace(&node.text().collect::<String>()))
        .filter(|author| !author.is_empty());

    let published_date = extract_date(&document).or_else(|| date_from_url(url))?;

    let content = document
        .select(&selector(
            "div.entry-content, div.post-content, article .content",
        ))
        .next()?;
    let text = extract_body_text(content);
    if text.chars().count() < MIN_BODY_CHARS {
        return None;
    }

    Some(ExtractedPost {
        title,
        author,
        published_date,
        text,
    })
}

/// Scans pagination controls for the highest page index. Best effort:
/// absent controls mean a single page.
pub fn detect_max_pages(html: &str) -> u32 {
    let document = Html::parse_document(html);
    let mut max_page = 1;

    for link in document.select(&selector("a.page-numbers, .pagination a")) {
        let text = collapse_whitespace(&link.text().collect::<String>());
        if let Ok(page) = text.parse::<u32>() {
            max_page = max_page.max(page);
        }
        if let Some(captures) = link.value().attr("href").and_then(|href| PAGE_HREF.captures(href))
        {
            if let Ok(page) = captures[1].parse::<u32>() {
                max_page = max_page.max(page);
            }
        }
    }
    max_page
}

fn extract_date(document: &Html) -> Option<NaiveDate> {
    let stamp = document
        .select(&selector("time[datetime]"))
        .next()
        .and_then(|node| node.value().attr("datetime").map(str::to_string))
        .or_else(|| {
            document
                .select(&selector(".posted-on, .entry-date, .date"))
                .next()
                .map(|node| collapse_whitespace(&node.text().collect::<String>()))
        })?;

    parse_date(&stamp)
}

fn parse_date(stamp: &str) -> Option<NaiveDate> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(stamp) {
        return Some(parsed.date_naive());
    }
    let prefix: String = stamp.chars().take(10).collect();
    if let Ok(parsed) = NaiveDate::parse_from_str(&prefix, "%Y-%m-%d") {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(stamp, "%B %d, %Y").ok()
}

fn date_from_url(url: &str) -> Option<NaiveDate> {
    let captures = URL_DATE.captures(url)?;
    let year = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let day = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Paragraph-level text with boilerplate subtrees (share buttons,
/// related-post blocks, inline metadata) dropped; a paragraph-free body
/// falls back to the flattened text of the whole container.
fn extract_body_text(content: ElementRef) -> String {
    let paragraphs: Vec<String> = content
        .select(&selector("p"))
        .filter(|p| !has_boilerplate_ancestor(*p))
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect();

    if paragraphs.is_empty() {
        collapse_whitespace(&content.text().collect::<String>())
    } else {
        paragraphs.join("\n\n")
    }
}

fn has_boilerplate_ancestor(node: ElementRef) -> bool {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            let element = ancestor.value();
            matches!(element.name(), "script" | "style")
                || element.classes().any(|class| {
                    matches!(class, "sharedaddy" | "jp-relatedposts" | "entry-meta")
                })
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Counters reported at the end of a scrape run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub pages_visited: u32,
    pub new_posts: usize,
    pub duplicate_posts: usize,
    pub skipped_posts: usize,
}

/// Checkpointed traversal of the blog archive, oldest checkpoint first.
pub struct BlogScraper<'a> {
    db: &'a SurrealDbClient,
    fetcher: &'a mut RateLimitedFetcher,
    checkpoints: &'a CheckpointStore,
    expeditions: &'a [Expedition],
    base_url: Url,
    max_pages: Option<u32>,
}

impl<'a> BlogScraper<'a> {
    pub fn new(
        db: &'a SurrealDbClient,
        fetcher: &'a mut RateLimitedFetcher,
        checkpoints: &'a CheckpointStore,
        expeditions: &'a [Expedition],
        base_url: Url,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            db,
            fetcher,
            checkpoints,
            expeditions,
            base_url,
            max_pages,
        }
    }

    /// Walks listing pages from the checkpoint cursor, extracting and
    /// storing every post found. Fetch and extraction failures skip the
    /// affected page or post and move on; the pagination bound is the
    /// sole terminator. Checkpoint and store failures abort the run.
    pub async fn run(&mut self) -> Result<ScrapeSummary, AppError> {
        let mut checkpoint = self.checkpoints.load()?;
        let mut summary = ScrapeSummary::default();

        let mut page = checkpoint.last_listing_page + 1;
        let mut total_pages: Option<u32> = None;

        loop {
            if let Some(total) = total_pages {
                if page > total {
                    break;
                }
            }

            let body = match self.fetch_listing(page).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(page, error = %err, "listing fetch failed, skipping page");
                    if total_pages.is_none() {
                        // Without a bound yet there is nothing to walk to.
                        break;
                    }
                    page += 1;
                    continue;
                }
            };

            if total_pages.is_none() {
                let mut detected = detect_max_pages(&body);
                if let Some(cap) = self.max_pages {
                    detected = detected.min(cap);
                }
                info!(start_page = page, total_pages = detected, "starting blog traversal");
                total_pages = Some(detected);
            }

            let items = extract_listing(&body, &self.base_url);
            if items.is_empty() {
                warn!(page, "no entries on listing page");
            }

            for item in &items {
                if checkpoint.scraped_post_urls.contains(&item.url) {
                    summary.duplicate_posts += 1;
                    continue;
                }
                match self.scrape_post(item).await? {
                    PostOutcome::Stored => {
                        checkpoint.scraped_post_urls.insert(item.url.clone());
                        summary.new_posts += 1;
                    }
                    PostOutcome::Duplicate => {
                        checkpoint.scraped_post_urls.insert(item.url.clone());
                        summary.duplicate_posts += 1;
                    }
                    PostOutcome::Skipped => summary.skipped_posts += 1,
                }
            }

            checkpoint.last_listing_page = page;
            self.checkpoints.save(&mut checkpoint)?;
            summary.pages_visited += 1;
            page += 1;
        }

        info!(
            pages = summary.pages_visited,
            new = summary.new_posts,
            duplicates = summary.duplicate_posts,
            skipped = summary.skipped_posts,
            "blog traversal finished"
        );
        Ok(summary)
    }

    async fn fetch_listing(&mut self, page: u32) -> Result<String, AppError> {
        let url = if page <= 1 {
            self.base_url.to_string()
        } else {
            format!("{}/page/{page}/", self.base_url.as_str().trim_end_matches('/'))
        };
        self.fetcher
            .fetch_text(&format!("listing_{page:04}"), &url)
            .await
    }

    async fn scrape_post(&mut self, item: &ListingItem) -> Result<PostOutcome, AppError> {
        let key = post_cache_key(&item.url);
        let html = match self.fetcher.fetch_text(&key, &item.url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(url = %item.url, error = %err, "post fetch failed");
                return Ok(PostOutcome::Skipped);
            }
        };

        let Some(extracted) = extract_post(&html, &item.url) else {
            warn!(url = %item.url, "post extraction yielded nothing usable");
            return Ok(PostOutcome::Skipped);
        };

        let expedition_id =
            map_date_to_expedition(extracted.published_date, self.expeditions);
        let post = BlogPost::new(
            item.url.clone(),
            extracted.title,
            extracted.author,
            extracted.published_date,
            extracted.text,
            expedition_id,
        );

        if self.db.insert_ignore(post).await? {
            Ok(PostOutcome::Stored)
        } else {
            Ok(PostOutcome::Duplicate)
        }
    }
}

enum PostOutcome {
    Stored,
    Duplicate,
    Skipped,
}

fn post_cache_key(url: &str) -> String {
    let stripped = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let slug: String = sanitize_key(stripped)
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect();
    format!("post_{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://blogs.nasa.gov/spacestation").expect("valid url")
    }

    #[test]
    fn listing_uses_primary_article_selector() {
        let html = r#"
            <html><body>
              <article>
                <h2><a href="/spacestation/2024/01/15/docking/">Progress Docks</a></h2>
                <time datetime="2024-01-15T10:00:00+00:00">January 15, 2024</time>
              </article>
              <article>
                <h2><a href="https://blogs.nasa.gov/spacestation/2024/01/16/eva/">Spacewalk Set</a></h2>
              </article>
            </body></html>"#;
        let items = extract_listing(html, &base());

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].url,
            "https://blogs.nasa.gov/spacestation/2024/01/15/docking/"
        );
        assert_eq!(items[0].title, "Progress Docks");
        assert_eq!(
            items[1].url,
            "https://blogs.nasa.gov/spacestation/2024/01/16/eva/"
        );
    }

    #[test]
    fn listing_falls_back_to_post_class_containers() {
        let html = r#"
            <div class="post">
              <h2><a href="/spacestation/2023/12/01/science/">Science Recap</a></h2>
            </div>"#;
        let items = extract_listing(html, &base());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Science Recap");
    }

    #[test]
    fn listing_entries_without_links_are_skipped() {
        let html = r#"
            <article><h2>No link here</h2></article>
            <article><h2><a href="/spacestation/2023/12/02/cargo/">Cargo Ship</a></h2></article>"#;
        let items = extract_listing(html, &base());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Cargo Ship");
    }

    #[test]
    fn extracts_full_post_with_structured_date() {
        let html = r#"
            <html><body>
              <h1 class="entry-title">Crew Completes Spacewalk</h1>
              <span class="byline">By <a href="/author/mgarcia">Mark Garcia</a></span>
              <time datetime="2023-06-01T14:30:00+00:00">June 1, 2023</time>
              <div class="entry-content">
                <p>Two astronauts ventured outside the station today to install
                   a new roll-out solar array on the truss.</p>
                <div class="sharedaddy"><p>Share this on social media now!</p></div>
                <p>The excursion lasted six hours and twelve minutes.</p>
              </div>
            </body></html>"#;
        let post = extract_post(html, "https://blogs.nasa.gov/spacestation/2023/06/01/eva/")
            .expect("post");

        assert_eq!(post.title, "Crew Completes Spacewalk");
        assert_eq!(post.author.as_deref(), Some("Mark Garcia"));
        assert_eq!(
            post.published_date,
            NaiveDate::from_ymd_opt(2023, 6, 1).expect("valid date")
        );
        assert!(post.text.contains("roll-out solar array"));
        assert!(post.text.contains("six hours and twelve minutes"));
        assert!(!post.text.contains("social media"));
    }

    #[test]
    fn date_falls_back_to_url_path() {
        let html = r#"
            <h1>Undated Post</h1>
            <div class="entry-content">
              <p>The station crew spent the day packing the cargo craft with
                 completed experiment samples for return to Earth.</p>
            </div>"#;
        let post = extract_post(html, "https://blogs.nasa.gov/spacestation/2022/03/09/packing/")
            .expect("post");
        assert_eq!(
            post.published_date,
            NaiveDate::from_ymd_opt(2022, 3, 9).expect("valid date")
        );
    }

    #[test]
    fn missing_date_everywhere_skips_the_post() {
        let html = r#"
            <h1>Undated</h1>
            <div class="entry-content">
              <p>Plenty of body text here, easily past the minimum length gate
                 for extraction, but no date is recoverable anywhere.</p>
            </div>"#;
        assert!(extract_post(html, "https://blogs.nasa.gov/spacestation/about/").is_none());
    }

    #[test]
    fn short_body_skips_the_post() {
        let html = r#"
            <h1>Stub</h1>
            <time datetime="2023-06-01T00:00:00+00:00">June 1</time>
            <div class="entry-content"><p>Too short.</p></div>"#;
        assert!(extract_post(html, "https://blogs.nasa.gov/spacestation/2023/06/01/stub/").is_none());
    }

    #[test]
    fn paragraph_free_body_flattens_container_text() {
        let html = r#"
            <h1>Flat</h1>
            <time datetime="2023-06-01T00:00:00+00:00">June 1</time>
            <div class="entry-content">The crew worked through a full day of
              biomedical research and maintenance on the oxygen generator.</div>"#;
        let post = extract_post(html, "https://blogs.nasa.gov/spacestation/2023/06/01/flat/")
            .expect("post");
        assert!(post.text.starts_with("The crew worked"));
    }

    #[test]
    fn max_pages_from_pagination_controls() {
        let html = r#"
            <nav class="pagination">
              <a class="page-numbers" href="/spacestation/page/2/">2</a>
              <a class="page-numbers" href="/spacestation/page/3/">3</a>
              <a class="page-numbers" href="/spacestation/page/412/">412</a>
            </nav>"#;
        assert_eq!(detect_max_pages(html), 412);
    }

    #[test]
    fn max_pages_defaults_to_one() {
        assert_eq!(detect_max_pages("<html><body><p>no nav</p></body></html>"), 1);
    }

    #[test]
    fn max_pages_reads_hrefs_when_link_text_is_not_numeric() {
        let html = r#"
            <nav class="pagination">
              <a href="/spacestation/page/27/">Older Posts</a>
            </nav>"#;
        assert_eq!(detect_max_pages(html), 27);
    }

    use std::time::Duration;

    use crate::{cache::ContentCache, checkpoint::CheckpointStore, fetcher::RateLimitedFetcher};
    use common::storage::db::SurrealDbClient;

    async fn memory_db() -> SurrealDbClient {
        let database = uuid::Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("test_ns", &database)
            .await
            .expect("memory db");
        db.ensure_initialized().await.expect("schema");
        db
    }

    fn listing_html(post_path: &str, title: &str) -> String {
        format!(
            r#"<nav class="pagination">
                 <a class="page-numbers" href="/spacestation/page/3/">3</a>
               </nav>
               <article><h2><a href="{post_path}">{title}</a></h2></article>"#
        )
    }

    fn post_html(title: &str, date: &str) -> String {
        format!(
            r#"<h1 class="entry-title">{title}</h1>
               <time datetime="{date}T12:00:00+00:00">{date}</time>
               <div class="entry-content">
                 <p>The crew spent the day running research across the many
                    laboratories of the orbiting complex before a joint meal.</p>
               </div>"#
        )
    }

    /// Pages 1 and 3 are cached; page 2 is neither cached nor reachable.
    /// The traversal must skip page 2 and still scrape page 3.
    #[tokio::test]
    async fn failed_listing_page_does_not_abort_the_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ContentCache::new(dir.path().join("html"));
        cache.ensure_dir().await.expect("cache dir");

        // Refused immediately; only cache misses ever touch it.
        let base = Url::parse("http://127.0.0.1:1/spacestation").expect("valid url");

        cache
            .put_html(
                "listing_0001",
                &listing_html("/spacestation/2024/01/15/first/", "First"),
            )
            .await
            .expect("seed listing 1");
        cache
            .put_html(
                "listing_0003",
                &listing_html("/spacestation/2024/01/17/third/", "Third"),
            )
            .await
            .expect("seed listing 3");
        for (url, title, date) in [
            ("http://127.0.0.1:1/spacestation/2024/01/15/first/", "First", "2024-01-15"),
            ("http://127.0.0.1:1/spacestation/2024/01/17/third/", "Third", "2024-01-17"),
        ] {
            cache
                .put_html(&post_cache_key(url), &post_html(title, date))
                .await
                .expect("seed post");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(250))
            .build()
            .expect("client");
        let mut fetcher =
            RateLimitedFetcher::new(client, cache, Duration::from_millis(1));
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoint.json"));
        let db = memory_db().await;

        let summary = BlogScraper::new(&db, &mut fetcher, &checkpoints, &[], base, None)
            .run()
            .await
            .expect("run");

        assert_eq!(summary.new_posts, 2);
        assert_eq!(summary.pages_visited, 2);
        let checkpoint = checkpoints.load().expect("load");
        assert_eq!(checkpoint.last_listing_page, 3);
        assert_eq!(checkpoint.scraped_post_urls.len(), 2);
    }

    /// An entry-free listing page mid-archive is noise, not a terminator.
    #[tokio::test]
    async fn empty_listing_page_does_not_stop_the_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = ContentCache::new(dir.path().join("html"));
        cache.ensure_dir().await.expect("cache dir");

        let base = Url::parse("http://127.0.0.1:1/spacestation").expect("valid url");

        cache
            .put_html(
                "listing_0001",
                &listing_html("/spacestation/2024/01/15/first/", "First"),
            )
            .await
            .expect("seed listing 1");
        cache
            .put_html("listing_0002", "<html><body><p>maintenance</p></body></html>")
            .await
            .expect("seed listing 2");
        cache
            .put_html(
                "listing_0003",
                &listing_html("/spacestation/2024/01/17/third/", "Third"),
            )
            .await
            .expect("seed listing 3");
        for (url, title, date) in [
            ("http://127.0.0.1:1/spacestation/2024/01/15/first/", "First", "2024-01-15"),
            ("http://127.0.0.1:1/spacestation/2024/01/17/third/", "Third", "2024-01-17"),
        ] {
            cache
                .put_html(&post_cache_key(url), &post_html(title, date))
                .await
                .expect("seed post");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(250))
            .build()
            .expect("client");
        let mut fetcher =
            RateLimitedFetcher::new(client, cache, Duration::from_millis(1));
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoint.json"));
        let db = memory_db().await;

        let summary = BlogScraper::new(&db, &mut fetcher, &checkpoints, &[], base, None)
            .run()
            .await
            .expect("run");

        assert_eq!(summary.new_posts, 2);
        assert_eq!(summary.pages_visited, 3);
        assert_eq!(checkpoints.load().expect("load").last_listing_page, 3);
    }

    #[test]
    fn post_cache_keys_are_sanitized_and_bounded() {
        let key = post_cache_key("https://blogs.nasa.gov/spacestation/2023/06/01/eva/");
        assert_eq!(key, "post_blogs.nasa.gov_spacestation_2023_06_01_eva_");
        let long = format!("https://blogs.nasa.gov/{}", "x".repeat(300));
        assert!(post_cache_key(&long).len() <= MAX_SLUG_CHARS + "post_".len());
    }
}
