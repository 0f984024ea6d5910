// tests/store_upsert.rs
//
// Idempotence and dedup properties of the article and bar stores.

use chrono::NaiveDate;
use sector_scanner::store::{ArticleUpsert, BarUpsert, Store, Upsert};

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn article(url: &str) -> ArticleUpsert {
    ArticleUpsert::new(
        url,
        "Bank credit growth accelerates",
        "Lenders reported stronger quarterly credit growth across segments.",
        d("2025-06-02"),
        "Finnhub",
    )
}

#[tokio::test]
async fn second_identical_upsert_is_a_no_op() {
    let store = Store::connect_in_memory().await.unwrap();
    let a = article("https://news.example/credit");

    assert_eq!(store.articles().upsert(a.clone()).await.unwrap(), Upsert::Inserted);
    assert_eq!(store.articles().upsert(a).await.unwrap(), Upsert::Unchanged);
    assert_eq!(store.articles().count().await.unwrap(), 1);
}

#[tokio::test]
async fn same_url_never_duplicates() {
    let store = Store::connect_in_memory().await.unwrap();
    for i in 0..5 {
        let mut a = article("https://news.example/one");
        a.title = format!("Revision {i}");
        store.articles().upsert(a).await.unwrap();
    }
    assert_eq!(store.articles().count().await.unwrap(), 1);
    let got = store
        .articles()
        .get("https://news.example/one")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.title, "Revision 4");
}

#[tokio::test]
async fn reingest_does_not_clobber_enrichment() {
    let store = Store::connect_in_memory().await.unwrap();
    let url = "https://news.example/enriched";
    store.articles().upsert(article(url)).await.unwrap();
    store.articles().set_sentiment(url, 0.82).await.unwrap();
    store
        .articles()
        .set_entities(url, &["Acme Bank".into()], &["Banking & Financial Services".into()])
        .await
        .unwrap();

    // Plain re-ingest of the same feed item carries no enrichment fields.
    assert_eq!(store.articles().upsert(article(url)).await.unwrap(), Upsert::Unchanged);

    let got = store.articles().get(url).await.unwrap().unwrap();
    assert_eq!(got.sentiment_score, Some(0.82));
    assert_eq!(got.sectors_mentioned, vec!["Banking & Financial Services".to_string()]);
}

#[tokio::test]
async fn enrichment_only_update_preserves_title_and_content() {
    let store = Store::connect_in_memory().await.unwrap();
    let url = "https://news.example/partial";
    store.articles().upsert(article(url)).await.unwrap();

    // An enrichment-style payload with empty title/content must not blank
    // the stored document.
    let mut enrich_only = ArticleUpsert::new(url, "", "", d("2025-06-02"), "Finnhub");
    enrich_only.sentiment_score = Some(0.4);
    assert_eq!(store.articles().upsert(enrich_only).await.unwrap(), Upsert::Updated);

    let got = store.articles().get(url).await.unwrap().unwrap();
    assert_eq!(got.title, "Bank credit growth accelerates");
    assert!(!got.content.is_empty());
    assert_eq!(got.sentiment_score, Some(0.4));
}

#[tokio::test]
async fn missing_enrichment_queries_shrink_as_fields_fill() {
    let store = Store::connect_in_memory().await.unwrap();
    store.articles().upsert(article("https://news.example/a")).await.unwrap();
    store.articles().upsert(article("https://news.example/b")).await.unwrap();

    assert_eq!(store.articles().missing_sentiment().await.unwrap().len(), 2);
    store.articles().set_sentiment("https://news.example/a", 0.6).await.unwrap();
    assert_eq!(store.articles().missing_sentiment().await.unwrap().len(), 1);

    assert_eq!(store.articles().missing_entities().await.unwrap().len(), 2);
    store
        .articles()
        .set_entities("https://news.example/b", &[], &["FMCG".into()])
        .await
        .unwrap();
    // Still missing companies, so /b stays in the missing-entities set.
    assert_eq!(store.articles().missing_entities().await.unwrap().len(), 2);
}

#[tokio::test]
async fn news_watermark_is_max_stored_date_per_source() {
    let store = Store::connect_in_memory().await.unwrap();
    assert!(store.articles().latest_date_for_source("Finnhub").await.unwrap().is_none());

    let mut early = article("https://news.example/early");
    early.publication_date = d("2025-05-20");
    let mut late = article("https://news.example/late");
    late.publication_date = d("2025-06-02");
    store.articles().upsert(early).await.unwrap();
    store.articles().upsert(late).await.unwrap();

    assert_eq!(
        store.articles().latest_date_for_source("Finnhub").await.unwrap(),
        Some(d("2025-06-02"))
    );
    assert!(store.articles().latest_date_for_source("Marketaux").await.unwrap().is_none());
}

fn bar(symbol: &str, date: &str, close: f64) -> BarUpsert {
    BarUpsert {
        symbol: symbol.into(),
        date: d(date),
        open: Some(close - 1.0),
        high: Some(close + 1.0),
        low: Some(close - 2.0),
        close,
        volume: Some(10_000.0),
    }
}

#[tokio::test]
async fn bar_upsert_is_idempotent_on_composite_key() {
    let store = Store::connect_in_memory().await.unwrap();
    let b = bar("^NSEI", "2025-06-02", 100.0);

    assert_eq!(store.bars().upsert(b.clone()).await.unwrap(), Upsert::Inserted);
    assert_eq!(store.bars().upsert(b.clone()).await.unwrap(), Upsert::Unchanged);

    let mut revised = b;
    revised.close = 101.0;
    assert_eq!(store.bars().upsert(revised).await.unwrap(), Upsert::Updated);
    assert_eq!(store.bars().count().await.unwrap(), 1);
}

#[tokio::test]
async fn bar_series_come_back_sorted_by_date() {
    let store = Store::connect_in_memory().await.unwrap();
    store.bars().upsert(bar("^NSEI", "2025-06-04", 102.0)).await.unwrap();
    store.bars().upsert(bar("^NSEI", "2025-06-02", 100.0)).await.unwrap();
    store.bars().upsert(bar("^NSEI", "2025-06-03", 101.0)).await.unwrap();
    store.bars().upsert(bar("^CNXIT", "2025-06-02", 50.0)).await.unwrap();

    let series = store.bars().series("^NSEI").await.unwrap();
    let dates: Vec<_> = series.iter().map(|b| b.date).collect();
    assert_eq!(dates, vec![d("2025-06-02"), d("2025-06-03"), d("2025-06-04")]);

    assert_eq!(store.bars().latest_date("^NSEI").await.unwrap(), Some(d("2025-06-04")));

    let all = store.bars().all_series().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["^CNXIT"].len(), 1);
}

#[tokio::test]
async fn empty_url_is_rejected() {
    let store = Store::connect_in_memory().await.unwrap();
    let a = ArticleUpsert::new("", "Title", "Body", d("2025-06-02"), "Finnhub");
    assert!(store.articles().upsert(a).await.is_err());
}
