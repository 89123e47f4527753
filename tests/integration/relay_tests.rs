//! Integration tests for the relay
//!
//! These tests use wiremock for both the source websites and the Telegram
//! Bot API, and run sweeps and delivery ticks end-to-end against an on-disk
//! database.

use feedrelay::config::{parse_config, Config};
use feedrelay::crawler::{import_sources, HttpFetcher, SweepRunner};
use feedrelay::delivery::{Deliverer, TickOutcome};
use feedrelay::notify::TelegramNotifier;
use feedrelay::storage::{open_storage, OutboxStore, SqliteStorage};
use feedrelay::{Clock, ManualClock};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOG_PAGE: &str = r#"<html><body>
  <div class="posts">
    <div class="post"><h2>First   post</h2><a class="more" href="post-1">read</a></div>
    <div class="post"><h2>Second post</h2><a class="more" href="./post-2">read</a></div>
    <div class="post"><h2></h2><a class="more" href="/untitled">read</a></div>
  </div>
</body></html>"#;

const NEWS_PAGE: &str = r#"<html><body>
  <article><h3>Headline</h3><a href="/news/headline">more</a></article>
</body></html>"#;

struct Harness {
    _dir: TempDir,
    store: Arc<SqliteStorage>,
    clock: Arc<ManualClock>,
    runner: SweepRunner<SqliteStorage>,
    deliverer: Deliverer<SqliteStorage>,
}

fn test_config(site: &MockServer, telegram: &MockServer, db_path: &str) -> Config {
    let content = format!(
        r#"
[scheduler]
max-retries = 2
visit-timeout = 5

[database]
path = "{db}"

[telegram]
token = "42:secret"
channel = "relay"
api-base = "{telegram}"

[[source]]
name = "Blog"
url = "{site}/blog/"
article-selector = "div.post"
title-selector = "h2"
detail-selector = "a.more"
tags = ["blog"]

[[source]]
name = "News"
url = "{site}/news"
article-selector = "article"
title-selector = "h3"
detail-selector = "a"
channels = ["first", "second"]
"#,
        db = db_path,
        telegram = telegram.uri(),
        site = site.uri(),
    );
    parse_config(&content).expect("valid test config")
}

fn harness(site: &MockServer, telegram: &MockServer) -> Harness {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("relay.db");
    let config = test_config(site, telegram, db_path.to_str().unwrap());

    let store = Arc::new(open_storage(&db_path).unwrap());
    assert_eq!(import_sources(store.as_ref(), &config), 2);

    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let fetcher = Arc::new(HttpFetcher::new(&config.fetcher).unwrap());
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram));

    let runner = SweepRunner::new(
        Arc::clone(&store),
        fetcher,
        Arc::clone(&clock) as Arc<dyn Clock>,
        config.scheduler.max_retries,
        config.scheduler.visit_timeout(),
    );
    let deliverer = Deliverer::new(
        Arc::clone(&store),
        notifier,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );

    Harness {
        _dir: dir,
        store,
        clock,
        runner,
        deliverer,
    }
}

async fn mount_sites(site: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/blog/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BLOG_PAGE))
        .mount(site)
        .await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NEWS_PAGE))
        .mount(site)
        .await;
}

fn telegram_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": {}}))
}

async fn sent_messages(telegram: &MockServer) -> Vec<(String, String)> {
    telegram
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            (
                body["chat_id"].as_str().unwrap().to_string(),
                body["text"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_sweep_then_deliver_everything() {
    let site = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_sites(&site).await;
    Mock::given(method("POST"))
        .and(path("/bot42:secret/sendMessage"))
        .respond_with(telegram_ok())
        .mount(&telegram)
        .await;

    let mut h = harness(&site, &telegram);

    let report = h.runner.run_sweep(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.visited, 2);
    assert_eq!(report.failures, 0);
    assert_eq!(report.articles_new, 3);

    // Relative links resolve against the site root, not the page path
    let first = h
        .store
        .get_item_by_url(&format!("{}/post-1", site.uri()))
        .unwrap()
        .expect("first post stored");
    assert_eq!(first.title, "First post");
    assert!(h
        .store
        .get_item_by_url(&format!("{}/post-2", site.uri()))
        .unwrap()
        .is_some());
    assert!(h
        .store
        .get_item_by_url(&format!("{}/untitled", site.uri()))
        .unwrap()
        .is_none());

    let mut delivered = 0;
    loop {
        match h.deliverer.tick().await.unwrap() {
            TickOutcome::Delivered(_) => delivered += 1,
            TickOutcome::Idle => break,
            other => panic!("unexpected tick outcome: {:?}", other),
        }
    }
    assert_eq!(delivered, 3);
    assert_eq!(h.store.count_items(false).unwrap(), 0);

    let messages = sent_messages(&telegram).await;
    assert_eq!(
        messages[0],
        (
            "@relay".to_string(),
            format!("Blog: [First post]({}/post-1)\n#blog\n", site.uri())
        )
    );
    // The news article goes to both of its channels
    let news: Vec<_> = messages
        .iter()
        .filter(|(_, text)| text.starts_with("News:"))
        .map(|(chat, _)| chat.as_str())
        .collect();
    assert_eq!(news, vec!["@first", "@second"]);
}

#[tokio::test]
async fn test_second_sweep_does_not_resend() {
    let site = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_sites(&site).await;
    Mock::given(method("POST"))
        .respond_with(telegram_ok())
        .mount(&telegram)
        .await;

    let mut h = harness(&site, &telegram);
    let cancel = CancellationToken::new();

    h.runner.run_sweep(&cancel).await.unwrap();
    while h.deliverer.tick().await.unwrap() != TickOutcome::Idle {}
    let sent_after_first = sent_messages(&telegram).await.len();

    // Sources stamped in the second the first sweep closed sit out one sweep
    h.clock.advance(3600);
    let report = h.runner.run_sweep(&cancel).await.unwrap();
    assert_eq!(report.visited, 0);

    h.clock.advance(3600);
    let report = h.runner.run_sweep(&cancel).await.unwrap();
    assert_eq!(report.visited, 2);
    assert_eq!(report.articles_found, 3);
    assert_eq!(report.articles_new, 0);

    assert_eq!(h.deliverer.tick().await.unwrap(), TickOutcome::Idle);
    assert_eq!(sent_messages(&telegram).await.len(), sent_after_first);
}

#[tokio::test]
async fn test_broken_source_does_not_block_others() {
    let site = MockServer::start().await;
    let telegram = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NEWS_PAGE))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&site)
        .await;

    let h = harness(&site, &telegram);
    let report = h.runner.run_sweep(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.visited, 1);
    assert_eq!(report.failures, 2);
    assert_eq!(report.exhausted, 1);
    assert_eq!(h.store.count_items(false).unwrap(), 1);
}

#[tokio::test]
async fn test_rate_limit_pauses_delivery() {
    let site = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_sites(&site).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 7",
            "parameters": {"retry_after": 7}
        })))
        .up_to_n_times(1)
        .mount(&telegram)
        .await;
    Mock::given(method("POST"))
        .respond_with(telegram_ok())
        .mount(&telegram)
        .await;

    let mut h = harness(&site, &telegram);
    h.runner.run_sweep(&CancellationToken::new()).await.unwrap();

    let now = h.clock.now();
    assert_eq!(
        h.deliverer.tick().await.unwrap(),
        TickOutcome::RateLimited { until: now + 7 }
    );

    h.clock.advance(6);
    assert_eq!(
        h.deliverer.tick().await.unwrap(),
        TickOutcome::Suppressed { until: now + 7 }
    );
    assert_eq!(telegram.received_requests().await.unwrap().len(), 1);

    h.clock.advance(1);
    assert!(matches!(
        h.deliverer.tick().await.unwrap(),
        TickOutcome::Delivered(_)
    ));
    assert_eq!(h.store.count_items(true).unwrap(), 1);
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let site = MockServer::start().await;
    let telegram = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(NEWS_PAGE)
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&site)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("relay.db");
    let config = test_config(&site, &telegram, db_path.to_str().unwrap());
    let store = Arc::new(open_storage(&db_path).unwrap());
    import_sources(store.as_ref(), &config);

    let runner = SweepRunner::new(
        Arc::clone(&store),
        Arc::new(HttpFetcher::new(&config.fetcher).unwrap()),
        Arc::new(ManualClock::new(1_700_000_000)),
        1,
        Duration::from_millis(200),
    );

    let report = runner.run_sweep(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.visited, 0);
    assert_eq!(report.failures, 2);
    assert_eq!(store.count_items(false).unwrap(), 0);
}
