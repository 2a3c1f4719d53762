//! Extraction: one bounded pull of the newest submissions, a post-fetch
//! creation-time cutoff, and projection onto the configured columns.

use crate::config::{EtlConfig, RedditConfig};
use crate::date::StartDate;
use crate::error::ListingError;
use crate::progress::make_count_progress;
use crate::reddit::{RedditClient, Submission, SubmissionFeed};
use crate::table::{Cell, Table};
use anyhow::{anyhow, Context, Result};
use tracing::Level;

pub struct Extractor<F> {
    feed: F,
    subreddit: String,
    columns: Vec<String>,
    progress: bool,
}

impl Extractor<RedditClient> {
    /// Authenticate against Reddit with the configured credentials.
    pub fn connect(cfg: &EtlConfig) -> Result<Self> {
        let client = RedditClient::connect(&cfg.reddit)?;
        Ok(Self::new(client, &cfg.reddit))
    }
}

impl<F: SubmissionFeed> Extractor<F> {
    pub fn new(feed: F, cfg: &RedditConfig) -> Self {
        tracing::info!("Extractor initialized for r/{} ({} columns).", cfg.subreddit, cfg.columns.len());
        Self { feed, subreddit: cfg.subreddit.clone(), columns: cfg.columns.clone(), progress: false }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Pull up to `max_items` newest submissions and keep those created at or
    /// after midnight UTC of `start_date` ("YYYY-MM-DD").
    pub fn extract(&self, start_date: &str, max_items: usize) -> Result<Table> {
        let start: StartDate = start_date.parse()?;
        self.extract_since(start, max_items)
    }

    pub fn extract_since(&self, start: StartDate, max_items: usize) -> Result<Table> {
        let cutoff = start.unix_timestamp() as f64;
        tracing::debug!("Extracting r/{} since {} (cutoff {}), limit {}", self.subreddit, start, cutoff, max_items);

        let submissions = self
            .feed
            .newest(&self.subreddit, max_items)
            .with_context(|| format!("fetching newest submissions of r/{}", self.subreddit))?;

        let pb = if self.progress {
            Some(make_count_progress(max_items as u64, &format!("r/{}", self.subreddit)))
        } else {
            None
        };

        let mut rows = Vec::new();
        let mut first = true;
        for item in submissions {
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            let submission = match item.and_then(|s| created_of(&s).map(|ts| (s, ts))) {
                Ok((s, ts)) => {
                    if first && tracing::enabled!(Level::DEBUG) {
                        log_submission(&s);
                    }
                    first = false;
                    if ts < cutoff {
                        continue;
                    }
                    s
                }
                Err(e) if e.is::<ListingError>() => {
                    if let Some(pb) = &pb {
                        pb.abandon_with_message("listing failed");
                    }
                    tracing::error!("Error fetching posts from Reddit: {:#}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Error fetching post from Reddit, skipping: {:#}", e);
                    continue;
                }
            };
            rows.push(self.project(&submission));
        }

        if let Some(pb) = pb {
            pb.finish_with_message(format!("{} posts kept", rows.len()));
        }

        let table = Table::from_rows(&self.columns, rows)?;
        tracing::info!("{} posts extracted from Reddit.", table.num_rows());
        Ok(table)
    }

    /// Configured columns in order; absent attributes become `Cell::Null`.
    pub fn project(&self, submission: &Submission) -> Vec<Cell> {
        self.columns.iter().map(|c| submission.attribute(c)).collect()
    }
}

fn created_of(s: &Submission) -> Result<f64> {
    s.created_utc()
        .ok_or_else(|| anyhow!("submission {} has no numeric created_utc", s.id().unwrap_or("<unknown>")))
}

fn log_submission(s: &Submission) {
    let mut info = format!("Title: {}\n", s.attribute("title"));
    for (key, value) in s.attributes() {
        info.push_str(&format!("{key}: {value}\n"));
    }
    info.push_str(&"-".repeat(30));
    tracing::debug!("{}", info);
}
