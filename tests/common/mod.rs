#![allow(dead_code)]

use anyhow::{anyhow, Result};
use rdetl::{
    EtlConfig, ListingError, StoreConnection, StoreConnector, Submission, SubmissionFeed, SubmissionIter, Table,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// 2021-01-01T00:00:00Z
pub const NEW_YEAR_2021: i64 = 1_609_459_200;

/// Config mirroring a typical deployment: a few projected columns, title/author
/// defaults, and the full post-transform schema.
pub const SAMPLE_CONFIG: &str = r#"
reddit:
  client_id: test_id
  client_secret: test_secret
  user_agent: test_agent
  subreddit: r/DataEngineering
  columns: id,title,author,created_utc

duckdb:
  connection_string: ":memory:"
  table_name: reddit_posts

transformation:
  date_column: created_utc

default_values:
  title: NoTitle
  author: UnknownAuthor

schema:
  title: text
  author: text
  created_utc: float64
  created_datetime: datetime
  created_date: date
  day: text
  month: text
  week_of_year: int64
  stored_at: datetime

queries:
  total_posts: SELECT COUNT(*) AS total FROM reddit_posts
  posts_per_day: SELECT "day", COUNT(*) AS n FROM reddit_posts GROUP BY "day" ORDER BY "day"

logging:
  level: debug
"#;

pub fn sample_config() -> EtlConfig {
    EtlConfig::from_yaml_str(SAMPLE_CONFIG).unwrap()
}

/// Sample config pointed at a fresh on-disk DuckDB file. Keep the returned
/// directory alive for as long as the database is needed.
pub fn sample_config_on_disk() -> (EtlConfig, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db: PathBuf = dir.path().join("reddit.duckdb");
    let cfg = sample_config().with_connection_string(db.to_string_lossy().to_string());
    (cfg, dir)
}

pub fn submission(id: &str, title: &str, author: &str, created_utc: f64) -> Submission {
    Submission::new()
        .with("id", id)
        .with("title", title)
        .with("author", author)
        .with("created_utc", created_utc)
}

/// One entry of a scripted feed: a submission, a per-item failure, or a
/// failed page request partway through the walk.
#[derive(Clone, Debug)]
pub enum FeedItem {
    Post(Submission),
    Broken(String),
    PageFailed(String),
}

/// In-memory feed that replays a fixed list, newest first, honouring `limit`.
#[derive(Clone, Debug, Default)]
pub struct StaticFeed {
    pub items: Vec<FeedItem>,
    pub requests: Rc<RefCell<Vec<(String, usize)>>>,
    /// When set, `newest` itself fails with this reason.
    pub unreachable: Option<String>,
}

impl StaticFeed {
    pub fn new(posts: Vec<Submission>) -> Self {
        Self { items: posts.into_iter().map(FeedItem::Post).collect(), ..Default::default() }
    }
    pub fn with_broken(mut self, at: usize, msg: &str) -> Self {
        self.items.insert(at, FeedItem::Broken(msg.to_string()));
        self
    }
    pub fn with_page_failure(mut self, at: usize, reason: &str) -> Self {
        self.items.insert(at, FeedItem::PageFailed(reason.to_string()));
        self
    }
    pub fn unreachable(reason: &str) -> Self {
        Self { unreachable: Some(reason.to_string()), ..Default::default() }
    }
}

impl SubmissionFeed for StaticFeed {
    fn newest(&self, subreddit: &str, limit: usize) -> Result<SubmissionIter<'_>> {
        self.requests.borrow_mut().push((subreddit.to_string(), limit));
        let listing_error =
            |reason: &str| ListingError { subreddit: subreddit.to_string(), reason: reason.to_string() };
        if let Some(reason) = &self.unreachable {
            return Err(listing_error(reason).into());
        }
        let items: Vec<Result<Submission>> = self
            .items
            .iter()
            .take(limit)
            .map(|item| match item {
                FeedItem::Post(s) => Ok(s.clone()),
                FeedItem::Broken(msg) => Err(anyhow!("{}", msg)),
                FeedItem::PageFailed(reason) => Err(listing_error(reason).into()),
            })
            .collect();
        Ok(Box::new(items.into_iter()))
    }
}

/// Store fake that records every call, including connection open/close.
#[derive(Clone, Debug, Default)]
pub struct RecordingConnector {
    pub log: Rc<RefCell<Vec<String>>>,
    pub staged_rows: Rc<RefCell<Vec<usize>>>,
    /// Fail any `execute` whose SQL starts with this prefix.
    pub fail_on: Option<String>,
}

pub struct RecordingConnection {
    log: Rc<RefCell<Vec<String>>>,
    staged_rows: Rc<RefCell<Vec<usize>>>,
    fail_on: Option<String>,
}

impl StoreConnector for RecordingConnector {
    type Connection = RecordingConnection;

    fn connect(&self) -> Result<RecordingConnection> {
        self.log.borrow_mut().push("connect".to_string());
        Ok(RecordingConnection {
            log: self.log.clone(),
            staged_rows: self.staged_rows.clone(),
            fail_on: self.fail_on.clone(),
        })
    }

    fn target(&self) -> &str {
        "recording"
    }
}

impl StoreConnection for RecordingConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.log.borrow_mut().push(sql.to_string());
        match &self.fail_on {
            Some(prefix) if sql.starts_with(prefix.as_str()) => Err(anyhow!("forced failure on `{}`", sql)),
            _ => Ok(()),
        }
    }
    fn register(&mut self, name: &str, table: &Table) -> Result<()> {
        self.log.borrow_mut().push(format!("register {name}"));
        self.staged_rows.borrow_mut().push(table.num_rows());
        Ok(())
    }
    fn unregister(&mut self, name: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("unregister {name}"));
        Ok(())
    }
    fn query(&mut self, sql: &str) -> Result<Table> {
        self.log.borrow_mut().push(format!("query {sql}"));
        Ok(Table::default())
    }
}

impl Drop for RecordingConnection {
    fn drop(&mut self) {
        self.log.borrow_mut().push("close".to_string());
    }
}

/// One HTTP request as seen by [`RedditStub`].
#[derive(Clone, Debug)]
pub struct StubRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Minimal HTTP/1.1 server on a local port standing in for both the OAuth and
/// the API host. Every request is recorded, then answered by `handler` with a
/// status code and a JSON body.
pub struct RedditStub {
    pub url: String,
    pub requests: Arc<Mutex<Vec<StubRequest>>>,
}

impl RedditStub {
    pub fn start<H>(handler: H) -> Self
    where
        H: Fn(&StubRequest) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let Some(req) = read_request(&stream) else { continue };
                seen.lock().unwrap().push(req.clone());
                let (status, body) = handler(&req);
                let _ = write_response(stream, status, &body);
            }
        });
        Self { url, requests }
    }

    /// Config whose auth and API endpoints both point at this stub.
    pub fn config(&self) -> EtlConfig {
        let mut cfg = sample_config();
        cfg.reddit.auth_url = self.url.clone();
        cfg.reddit.api_url = self.url.clone();
        cfg
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Listing requests only, in the order they arrived.
    pub fn listing_requests(&self) -> Vec<StubRequest> {
        self.requests().into_iter().filter(|r| r.method == "GET").collect()
    }
}

fn read_request(stream: &TcpStream) -> Option<StubRequest> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut h = String::new();
        reader.read_line(&mut h).ok()?;
        let h = h.trim_end();
        if h.is_empty() {
            break;
        }
        let (k, v) = h.split_once(':')?;
        headers.push((k.trim().to_string(), v.trim().to_string()));
    }
    let len = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).ok()?;

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q),
        None => (target.clone(), ""),
    };
    let query = query
        .split('&')
        .filter(|kv| !kv.is_empty())
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (kv.to_string(), String::new()),
        })
        .collect();
    Some(StubRequest { method, path, query, headers, body: String::from_utf8_lossy(&body).into_owned() })
}

fn write_response(mut stream: TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = if status < 400 { "OK" } else { "Error" };
    write!(
        stream,
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}

pub fn token_response() -> (u16, String) {
    (200, json!({"access_token": "tok", "token_type": "bearer", "expires_in": 3600}).to_string())
}

/// Listing data for a post with id `id`, created `offset` seconds after 2021-01-01.
pub fn post_data(id: &str, offset: i64) -> Value {
    json!({
        "id": id,
        "name": format!("t3_{id}"),
        "title": format!("post {id}"),
        "author": "someone",
        "created_utc": (NEW_YEAR_2021 + offset) as f64,
    })
}

pub fn listing_body(children: Vec<(&str, Value)>, after: Option<&str>) -> String {
    let children: Vec<Value> = children.into_iter().map(|(kind, data)| json!({"kind": kind, "data": data})).collect();
    json!({"kind": "Listing", "data": {"after": after, "children": children}}).to_string()
}

/// Serve `ids` (newest first) the way the listing endpoint pages: honour
/// `limit` and `after`, and set `after` only while more posts remain.
pub fn paged_listing(ids: &[&str], req: &StubRequest) -> String {
    let start = match req.param("after") {
        Some(cursor) => ids.iter().position(|id| format!("t3_{id}") == cursor).map_or(ids.len(), |i| i + 1),
        None => 0,
    };
    let limit: usize = req.param("limit").and_then(|l| l.parse().ok()).unwrap_or(25);
    let end = (start + limit).min(ids.len());
    let page = &ids[start..end];
    let children = page.iter().enumerate().map(|(i, id)| ("t3", post_data(id, -((start + i) as i64)))).collect();
    let after = if end < ids.len() { page.last().map(|id| format!("t3_{id}")) } else { None };
    listing_body(children, after.as_deref())
}
