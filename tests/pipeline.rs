#[path = "common/mod.rs"]
mod common;

use common::*;
use rdetl::{
    Cell, DataType, Extractor, Loader, QueryRunner, RedditDuckDbEtl, TransformError, Transformer, CREATED_DATE,
    CREATED_DATETIME, DAY, MONTH, STORED_AT, WEEK_OF_YEAR,
};
use time::macros::{date, datetime};

/// start_date 2021-01-01, max_items 1, one qualifying post: the destination
/// ends up with one row and every derived column populated.
#[test]
fn end_to_end_single_post() {
    rdetl::init_tracing_once("debug");
    let (cfg, _dir) = sample_config_on_disk();
    let feed = StaticFeed::new(vec![submission("test_id", "Test Title", "alice", NEW_YEAR_2021 as f64)]);
    let etl = RedditDuckDbEtl::new(
        Extractor::new(feed, &cfg.reddit),
        Transformer::new(&cfg),
        Loader::from_config(&cfg),
    );

    let summary = etl.run("2021-01-01", 1).unwrap();
    assert_eq!(summary.extracted, 1);
    assert_eq!(summary.loaded, 1);

    let out = etl.loader().query("SELECT * FROM reddit_posts").unwrap();
    assert_eq!(out.num_rows(), 1);
    assert_eq!(
        out.column_names(),
        vec![
            "id", "title", "author", "created_utc", CREATED_DATETIME, CREATED_DATE, DAY, MONTH, WEEK_OF_YEAR,
            STORED_AT
        ]
    );
    let cell = |name: &str| out.column(name).unwrap().cells()[0].clone();
    assert_eq!(cell("id"), Cell::from("test_id"));
    assert_eq!(cell(CREATED_DATETIME), Cell::Datetime(datetime!(2021-01-01 0:00)));
    assert_eq!(cell(CREATED_DATE), Cell::Date(date!(2021 - 01 - 01)));
    assert_eq!(cell(DAY), Cell::from("Friday"));
    assert_eq!(cell(MONTH), Cell::from("January"));
    assert_eq!(cell(WEEK_OF_YEAR), Cell::Int(53));
    assert_eq!(out.column(STORED_AT).unwrap().dtype(), DataType::Datetime);
}

/// Validation failure aborts before load: the previous destination survives.
#[test]
fn schema_failure_aborts_before_load() {
    let (cfg, _dir) = sample_config_on_disk();
    let loader = Loader::from_config(&cfg);
    loader
        .load(&rdetl::Table::from_rows(&["keep"], vec![vec![Cell::Int(1)]]).unwrap())
        .unwrap();

    let strict = cfg.clone().with_expected_type("score", DataType::Int64);
    let feed = StaticFeed::new(vec![submission("p", "t", "a", NEW_YEAR_2021 as f64)]);
    let etl = RedditDuckDbEtl::new(Extractor::new(feed, &strict.reddit), Transformer::new(&strict), loader);

    let err = etl.run("2021-01-01", 10).unwrap_err();
    let TransformError::SchemaValidation(mismatch) = err.downcast_ref::<TransformError>().unwrap();
    assert_eq!(mismatch.column, "score");
    assert_eq!(mismatch.found, None);

    let kept = etl.loader().query("SELECT * FROM reddit_posts").unwrap();
    assert_eq!(kept.column_names(), vec!["keep"]);
}

/// A failed listing aborts the run, even with no schema to catch the empty
/// pull, and the destination keeps its rows.
#[test]
fn listing_failure_leaves_destination_untouched() {
    let (mut cfg, _dir) = sample_config_on_disk();
    cfg.schema.clear();
    let loader = Loader::from_config(&cfg);
    loader
        .load(&rdetl::Table::from_rows(&["keep"], vec![vec![Cell::Int(1)]]).unwrap())
        .unwrap();

    let etl = RedditDuckDbEtl::new(
        Extractor::new(StaticFeed::unreachable("HTTP status client error (403 Forbidden)"), &cfg.reddit),
        Transformer::new(&cfg),
        loader,
    );

    let err = etl.run("2021-01-01", 10).unwrap_err();
    assert!(err.downcast_ref::<rdetl::ListingError>().is_some());

    let kept = etl.loader().query("SELECT COUNT(*) AS n FROM reddit_posts").unwrap();
    assert_eq!(kept.column("n").unwrap().cells(), &[Cell::Int(1)]);
}

/// A bad start date aborts the run without touching the store.
#[test]
fn bad_start_date_aborts_run() {
    let cfg = sample_config();
    let connector = RecordingConnector::default();
    let log = connector.log.clone();
    let etl = RedditDuckDbEtl::new(
        Extractor::new(StaticFeed::default(), &cfg.reddit),
        Transformer::new(&cfg),
        Loader::new(connector, "reddit_posts"),
    );

    assert!(etl.run("01/01/2021", 10).is_err());
    assert!(log.borrow().is_empty());
}

/// Queries run in config order; a failing one is logged and the rest still run.
#[test]
fn query_runner_continues_after_failure() {
    let (cfg, _dir) = sample_config_on_disk();
    let feed = StaticFeed::new(vec![
        submission("a", "t", "x", NEW_YEAR_2021 as f64),
        submission("b", "t", "y", (NEW_YEAR_2021 + 86_400) as f64),
    ]);
    RedditDuckDbEtl::new(Extractor::new(feed, &cfg.reddit), Transformer::new(&cfg), Loader::from_config(&cfg))
        .run("2021-01-01", 10)
        .unwrap();

    let mut queries = cfg.queries.clone();
    queries.shift_insert(1, "broken".to_string(), "SELECT * FROM nowhere".to_string());
    let runner = QueryRunner::new(Loader::from_config(&cfg), queries);

    let summary = runner.run_queries().unwrap();
    assert_eq!(summary.succeeded, vec!["total_posts".to_string(), "posts_per_day".to_string()]);
    assert_eq!(summary.failed, vec!["broken".to_string()]);

    let total = Loader::from_config(&cfg).query(&cfg.queries["total_posts"]).unwrap();
    assert_eq!(total.column("total").unwrap().cells(), &[Cell::Int(2)]);
}

#[test]
fn query_runner_requires_queries() {
    let runner = QueryRunner::new(Loader::new(RecordingConnector::default(), "t"), Default::default());

    assert!(runner.run_queries().is_err());
}
