use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.surmon.me";
pub const COMMENTS_PER_PAGE: u32 = 66;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Recent,
    Hot,
}

impl SortMode {
    /// Value of the `sort` query parameter.
    pub fn as_param(&self) -> i32 {
        match self {
            SortMode::Recent => -1,
            SortMode::Hot => 2,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortMode::Recent => SortMode::Hot,
            SortMode::Hot => SortMode::Recent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Recent => "recent",
            SortMode::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentQuery {
    pub post_id: i64,
    pub sort: SortMode,
    pub per_page: u32,
    pub page: u32,
}

impl CommentQuery {
    pub fn new(post_id: i64, sort: SortMode, page: u32) -> Self {
        Self {
            post_id,
            sort,
            per_page: COMMENTS_PER_PAGE,
            page,
        }
    }

    fn into_params(self) -> Vec<(&'static str, String)> {
        vec![
            ("sort", self.sort.as_param().to_string()),
            ("post_id", self.post_id.to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub post_id: i64,
    #[serde(default)]
    pub pid: i64,
    #[serde(default)]
    pub content: String,
    pub author: Author,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Pagination {
    pub current_page: u32,
    pub total_page: u32,
    pub total: u64,
}

impl Pagination {
    pub fn is_last_page(&self) -> bool {
        self.current_page == self.total_page
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentPage {
    pub data: Vec<Comment>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    result: Option<T>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("api: client user agent required");
        }
        let base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base).with_context(|| format!("api: parse base url {base}"))?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()
                .context("api: build HTTP client")?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn comments(&self, query: &CommentQuery) -> Result<CommentPage> {
        let url = self
            .base_url
            .join("comment")
            .context("api: build comment url")?;
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .query(&query.into_params())
            .send()
            .context("api: request comments")?;

        let status = response.status();
        if !status.is_success() {
            bail!("api: comment request failed with status {status}");
        }

        let envelope: Envelope<CommentPage> = response
            .json()
            .context("api: decode comment response")?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T> {
    if let Some(code) = envelope.code {
        if code <= 0 {
            let message = envelope.message.unwrap_or_default();
            bail!("api: server rejected request (code {code}): {message}");
        }
    }
    match envelope.result {
        Some(result) => Ok(result),
        None => bail!("api: response missing result"),
    }
}
