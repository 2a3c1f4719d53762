//! Reddit API adapter: OAuth client-credentials login and the paginated
//! `/r/<subreddit>/new` listing, exposed through the `SubmissionFeed` seam.

use crate::config::RedditConfig;
use crate::error::ListingError;
use crate::table::Cell;
use anyhow::{anyhow, bail, ensure, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// One upstream submission: the raw attribute map of a listing child.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Submission {
    attrs: Map<String, Value>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(val: Value) -> Result<Self> {
        match val {
            Value::Object(attrs) => Ok(Self { attrs }),
            other => bail!("submission payload is not an object: {}", other),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").and_then(Value::as_str)
    }

    /// Creation time in Unix seconds; `None` when absent or not numeric.
    pub fn created_utc(&self) -> Option<f64> {
        self.attrs.get("created_utc").and_then(Value::as_f64)
    }

    /// Attribute lookup with `Cell::Null` for anything the submission lacks.
    pub fn attribute(&self, name: &str) -> Cell {
        self.attrs.get(name).map(Cell::from_json).unwrap_or(Cell::Null)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attrs.iter()
    }
}

pub type SubmissionIter<'a> = Box<dyn Iterator<Item = Result<Submission>> + 'a>;

/// Authenticated source of submissions.
///
/// Items are yielded newest first. A per-item `Err` means that one submission
/// could not be read; callers decide whether to skip it. An item error that
/// is a [`ListingError`] means the listing itself failed and no further items
/// follow.
pub trait SubmissionFeed {
    fn newest(&self, subreddit: &str, limit: usize) -> Result<SubmissionIter<'_>>;
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

/// Authenticated handle to the Reddit API (application-only OAuth).
pub struct RedditClient {
    http: Client,
    token: String,
    api_url: String,
    page_size: usize,
}

impl RedditClient {
    /// Log in with the configured credentials. Any failure here is fatal to the run.
    pub fn connect(cfg: &RedditConfig) -> Result<Self> {
        let client = Self::try_connect(cfg);
        match &client {
            Ok(_) => tracing::info!("Reddit API client initialized and authenticated."),
            Err(e) => tracing::error!("Error initializing Reddit API connection: {:#}", e),
        }
        client
    }

    fn try_connect(cfg: &RedditConfig) -> Result<Self> {
        ensure!(!cfg.client_id.is_empty(), "reddit.client_id is required");
        ensure!(!cfg.client_secret.is_empty(), "reddit.client_secret is required");
        ensure!(!cfg.user_agent.is_empty(), "reddit.user_agent is required");

        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building HTTP client")?;

        let url = format!("{}/api/v1/access_token", cfg.auth_url.trim_end_matches('/'));
        let token: AccessToken = http
            .post(&url)
            .basic_auth(&cfg.client_id, Some(&cfg.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .context("Reddit rejected the client credentials")?
            .json()
            .context("decoding access token response")?;
        tracing::debug!("Access token obtained (expires in {:?}s)", token.expires_in);

        Ok(Self {
            http,
            token: token.access_token,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            page_size: cfg.page_size.clamp(1, 100),
        })
    }

    fn fetch_page(&self, subreddit: &str, after: Option<&str>, limit: usize) -> Result<ListingData> {
        let url = format!("{}/r/{}/new", self.api_url, subreddit);
        let limit = limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![("limit", limit.as_str()), ("raw_json", "1")];
        if let Some(cursor) = after {
            query.push(("after", cursor));
        }
        let listing: Listing = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("listing r/{subreddit}"))?
            .json()
            .context("decoding listing")?;
        Ok(listing.data)
    }
}

impl SubmissionFeed for RedditClient {
    /// The first page is requested before returning, so a listing that cannot
    /// be read at all fails here rather than as an item.
    fn newest(&self, subreddit: &str, limit: usize) -> Result<SubmissionIter<'_>> {
        let mut listing = NewListing {
            client: self,
            subreddit: subreddit.to_string(),
            remaining: limit,
            after: None,
            buffer: VecDeque::new(),
            exhausted: limit == 0,
        };
        if !listing.exhausted {
            listing.refill()?;
        }
        Ok(Box::new(listing))
    }
}

/// Lazily walks listing pages until `remaining` hits zero or the listing ends.
/// A failed page request is yielded once as a `ListingError` and ends the walk.
struct NewListing<'a> {
    client: &'a RedditClient,
    subreddit: String,
    remaining: usize,
    after: Option<String>,
    buffer: VecDeque<Result<Submission>>,
    exhausted: bool,
}

impl NewListing<'_> {
    fn refill(&mut self) -> Result<(), ListingError> {
        let want = self.remaining.min(self.client.page_size);
        let page = self
            .client
            .fetch_page(&self.subreddit, self.after.as_deref(), want)
            .map_err(|e| {
                self.exhausted = true;
                ListingError { subreddit: self.subreddit.clone(), reason: format!("{e:#}") }
            })?;
        if page.children.is_empty() || page.after.is_none() {
            self.exhausted = true;
        }
        self.after = page.after;
        for thing in page.children {
            let item = if thing.kind == "t3" {
                Submission::from_json(thing.data)
            } else {
                Err(anyhow!("unexpected listing item kind '{}'", thing.kind))
            };
            self.buffer.push_back(item);
        }
        Ok(())
    }
}

impl Iterator for NewListing<'_> {
    type Item = Result<Submission>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.refill() {
                self.remaining = 0;
                return Some(Err(e.into()));
            }
        }
        let item = self.buffer.pop_front()?;
        self.remaining -= 1;
        Some(item)
    }
}
