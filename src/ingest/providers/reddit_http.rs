// src/ingest/providers/reddit_http.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::{FetchOptions, Fetcher, Item};

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const DEFAULT_USER_AGENT: &str = concat!("reddit-stream/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct RedditClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Total HTTP attempts per fetch, the first one included. 0 is treated as 1.
    pub max_attempts: u8,
    pub bearer_token: Option<String>,
}

impl Default for RedditClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            bearer_token: None,
        }
    }
}

impl RedditClientConfig {
    /// REDDIT_BASE_URL, REDDIT_USER_AGENT, REDDIT_BEARER_TOKEN. A token without
    /// an explicit base URL switches to the OAuth host.
    pub fn from_env() -> Self {
        let bearer_token = std::env::var("REDDIT_BEARER_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let base_url = std::env::var("REDDIT_BASE_URL").unwrap_or_else(|_| {
            if bearer_token.is_some() {
                OAUTH_BASE_URL.to_string()
            } else {
                DEFAULT_BASE_URL.to_string()
            }
        });
        Self {
            base_url,
            user_agent: std::env::var("REDDIT_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            bearer_token,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Thing,
}

#[derive(Debug, Deserialize)]
struct Thing {
    id: String,
    created_utc: f64,
    author: Option<String>,
    subreddit: Option<String>,
    permalink: Option<String>,
    title: Option<String>,
    body: Option<String>,
    selftext: Option<String>,
}

/// Parse a Reddit Listing JSON document into items (source order kept).
pub fn parse_listing(s: &str) -> Result<Vec<Item>> {
    let listing: Listing = serde_json::from_str(s).context("parsing reddit listing json")?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|c| Item {
            id: c.data.id,
            created_utc: c.data.created_utc.floor() as i64,
            author: c.data.author,
            subreddit: c.data.subreddit,
            permalink: c.data.permalink,
            title: c.data.title,
            body: c.data.body,
            selftext: c.data.selftext,
        })
        .collect())
}

fn query_pairs(opts: &FetchOptions) -> Vec<(String, String)> {
    let mut out = vec![("raw_json".to_string(), "1".to_string())];
    for (k, v) in opts {
        let v = match v {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push((k.clone(), v));
    }
    out
}

/// HTTP fetcher over Reddit's public (or OAuth) listing endpoints.
#[derive(Clone)]
pub struct RedditClient {
    cfg: RedditClientConfig,
    client: Client,
}

impl RedditClient {
    pub fn new(cfg: RedditClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&cfg.user_agent)
            .timeout(cfg.timeout)
            .build()
            .context("building reddit http client")?;
        Ok(Self { cfg, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(RedditClientConfig::from_env())
    }

    pub fn listing_url(&self, scope: &str, listing: &str) -> String {
        format!(
            "{}/r/{}/{}.json",
            self.cfg.base_url.trim_end_matches('/'),
            scope,
            listing
        )
    }

    async fn get_listing(&self, scope: &str, listing: &str, opts: &FetchOptions) -> Result<Vec<Item>> {
        let url = self.listing_url(scope, listing);
        let query = query_pairs(opts);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let mut req = self.client.get(&url).query(&query);
            if let Some(token) = &self.cfg.bearer_token {
                req = req.bearer_auth(token);
            }

            let err = match req.send().await {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        let body = rsp.text().await.context("reddit http .text()")?;
                        return parse_listing(&body);
                    }
                    if !is_transient(status) {
                        return Err(anyhow!("reddit {url} returned {status}"));
                    }
                    anyhow!("reddit {url} returned {status}")
                }
                Err(e) => anyhow::Error::new(e).context(format!("reddit get {url}")),
            };

            if attempt >= self.cfg.max_attempts.max(1) {
                counter!("stream_provider_errors_total").increment(1);
                return Err(err);
            }
            tracing::debug!(target: "stream", error = ?err, attempt, "retrying reddit fetch");
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

/// 500ms doubling per failed attempt, capped at 32s.
fn backoff_delay(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << attempt.saturating_sub(1).min(6))
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl Fetcher for RedditClient {
    async fn fetch_new_comments(&self, scope: &str, opts: &FetchOptions) -> Result<Vec<Item>> {
        self.get_listing(scope, "comments", opts).await
    }

    async fn fetch_new_submissions(&self, scope: &str, opts: &FetchOptions) -> Result<Vec<Item>> {
        self.get_listing(scope, "new", opts).await
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
