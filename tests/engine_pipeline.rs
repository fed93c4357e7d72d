// tests/engine_pipeline.rs
mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use call_analytics::aggregate::{Distribution, SentimentCounts};
use call_analytics::cache::MokaAnalyticsCache;
use call_analytics::error::ProviderError;
use call_analytics::model::{AnalysisRecord, LeadQuality, Sentiment};
use call_analytics::trends::Trend;
use call_analytics::{AnalyticsEngine, AnalyticsError, EngineSettings};
use chrono::{Duration as ChronoDuration, Utc};
use common::*;

fn engine(provider: Arc<dyn call_analytics::provider::CallProvider>) -> AnalyticsEngine {
    AnalyticsEngine::new(provider, tenants(), EngineSettings::default())
}

#[tokio::test]
async fn other_tenants_never_surface() {
    let provider = StaticProvider::new(vec![
        raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 0.10),
        raw_call("b1", "asst-b", 5, 60, "customer-ended-call", 5.00),
        raw_call("a2", "asst-a", 20, 2, "no-answer", 0.05),
        raw_call("x1", "", 1, 60, "customer-ended-call", 1.00),
    ]);
    let snap = engine(provider).compute_analytics("asst-a", 7, 50).await.unwrap();

    assert_eq!(snap.metrics.total_calls, 2);
    assert_eq!(snap.metrics.answered_calls, 1);
    assert_eq!(snap.metrics.missed_calls, 1);
    assert!((snap.metrics.total_cost - 0.15).abs() < 1e-9);
    assert!(snap.recent_calls.iter().all(|c| c.owner_id == "asst-a"));
    assert_eq!(snap.recent_calls.len(), 2);
}

#[tokio::test]
async fn recent_calls_are_newest_first_despite_provider_order() {
    let provider = StaticProvider::new(vec![
        raw_call("mid", "asst-a", 60, 30, "customer-ended-call", 0.0),
        raw_call("oldest", "asst-a", 600, 30, "customer-ended-call", 0.0),
        raw_call("newest", "asst-a", 1, 30, "customer-ended-call", 0.0),
    ]);
    let snap = engine(provider).compute_analytics("asst-a", 7, 2).await.unwrap();
    let ids = snap.recent_calls.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["newest", "mid"]);
}

#[tokio::test]
async fn calls_outside_range_are_excluded() {
    let provider = StaticProvider::new(vec![
        raw_call("fresh", "asst-a", 60, 30, "customer-ended-call", 1.0),
        raw_call("stale", "asst-a", 60 * 24 * 10, 30, "customer-ended-call", 1.0),
    ]);
    let snap = engine(provider).compute_analytics("asst-a", 7, 50).await.unwrap();
    assert_eq!(snap.metrics.total_calls, 1);
    assert_eq!(snap.recent_calls[0].id, "fresh");
}

#[tokio::test]
async fn no_store_falls_back_to_estimates() {
    let calls = (0..10)
        .map(|i| raw_call(&format!("c{i}"), "asst-a", 30 + i, 45, "assistant-ended-call", 0.0))
        .collect();
    let snap = engine(StaticProvider::new(calls))
        .compute_analytics("asst-a", 7, 50)
        .await
        .unwrap();
    assert_eq!(snap.metrics.answered_calls, 10);
    assert_eq!(
        snap.metrics.sentiment_distribution,
        Distribution::EstimatedFallback {
            counts: SentimentCounts {
                positive: 6,
                neutral: 3,
                negative: 1
            }
        }
    );
}

#[tokio::test]
async fn store_rows_become_real_distribution_and_enrich_calls() {
    let provider = StaticProvider::new(vec![
        raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 0.0),
        raw_call("a2", "asst-a", 20, 60, "customer-ended-call", 0.0),
    ]);
    let row = |id: &str, s: Sentiment, l: LeadQuality| AnalysisRecord {
        call_id: id.into(),
        owner_id: "asst-a".into(),
        sentiment: Some(s),
        lead_quality: Some(l),
        analyzed_at: Utc::now() - ChronoDuration::minutes(5),
    };
    let store = RowsStore {
        rows: vec![
            row("a1", Sentiment::Positive, LeadQuality::Hot),
            row("a2", Sentiment::Negative, LeadQuality::Cold),
            // analysis for a call that is no longer visible
            row("gone", Sentiment::Positive, LeadQuality::Hot),
        ],
        fail: false,
    };

    let snap = engine(provider)
        .with_store(Arc::new(store))
        .compute_analytics("asst-a", 7, 50)
        .await
        .unwrap();

    assert!(snap.metrics.sentiment_distribution.is_real());
    assert_eq!(
        snap.metrics.sentiment_distribution.counts(),
        Some(&SentimentCounts {
            positive: 1,
            neutral: 0,
            negative: 1
        })
    );
    let a1 = snap.recent_calls.iter().find(|c| c.id == "a1").unwrap();
    assert_eq!(a1.analysis.lead_quality, Some(LeadQuality::Hot));
}

#[tokio::test]
async fn failing_store_degrades_to_estimates() {
    let provider = StaticProvider::new(vec![raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 0.0)]);
    let snap = engine(provider)
        .with_store(Arc::new(RowsStore {
            rows: vec![],
            fail: true,
        }))
        .compute_analytics("asst-a", 7, 50)
        .await
        .unwrap();
    assert!(matches!(
        snap.metrics.sentiment_distribution,
        Distribution::EstimatedFallback { .. }
    ));
}

#[tokio::test]
async fn provider_failure_is_fatal() {
    let err = engine(Arc::new(FailingProvider))
        .compute_analytics("asst-a", 7, 50)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalyticsError::ProviderUnavailable(_)));
}

// paused clock: the 10s default timeout elapses without real waiting
#[tokio::test(start_paused = true)]
async fn hanging_provider_times_out() {
    let engine = AnalyticsEngine::new(Arc::new(HangingProvider), tenants(), EngineSettings::default());
    assert_eq!(engine.settings().fetch_timeout, Duration::from_secs(10));

    let started = Instant::now();
    let err = engine.compute_analytics("asst-a", 7, 50).await.unwrap_err();
    assert!(matches!(
        err,
        AnalyticsError::ProviderUnavailable(ProviderError::Timeout(t)) if t == Duration::from_secs(10)
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unknown_user_gets_empty_snapshot_without_fetch() {
    let provider = StaticProvider::new(vec![raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 1.0)]);
    let engine = engine(provider.clone());

    let snap = engine.compute_for_user("stranger", 7, 50).await.unwrap();
    assert_eq!(snap.metrics.total_calls, 0);
    assert!(snap.recent_calls.is_empty());
    assert_eq!(provider.fetch_count(), 0);

    let snap = engine.compute_for_user("user-a", 7, 50).await.unwrap();
    assert_eq!(snap.metrics.total_calls, 1);
}

#[tokio::test]
async fn cache_serves_repeat_requests() {
    let provider = StaticProvider::new(vec![raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 1.0)]);
    let engine = engine(provider.clone()).with_cache(Arc::new(MokaAnalyticsCache::new(16)));

    let first = engine.compute_analytics("asst-a", 7, 50).await.unwrap();
    let second = engine.compute_analytics("asst-a", 7, 50).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.fetch_count(), 1);

    // different range is a different key
    engine.compute_analytics("asst-a", 30, 50).await.unwrap();
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test]
async fn disabled_cache_recomputes_every_time() {
    let provider = StaticProvider::new(vec![raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 1.0)]);
    let engine = engine(provider.clone());
    engine.compute_analytics("asst-a", 7, 50).await.unwrap();
    engine.compute_analytics("asst-a", 7, 50).await.unwrap();
    assert_eq!(provider.fetch_count(), 2);
}

#[tokio::test]
async fn trends_compare_halves_of_the_range() {
    // 7-day range: midpoint is 3 days ago
    let provider = StaticProvider::new(vec![
        raw_call("r1", "asst-a", 60, 120, "customer-ended-call", 1.0),
        raw_call("r2", "asst-a", 120, 120, "customer-ended-call", 1.0),
        raw_call("o1", "asst-a", 60 * 24 * 5, 30, "customer-ended-call", 3.0),
    ]);
    let snap = engine(provider).compute_analytics("asst-a", 7, 50).await.unwrap();
    assert_eq!(snap.trends.call_volume_trend, Trend::Up);
    assert_eq!(snap.trends.avg_duration_trend, Trend::Up);
    assert_eq!(snap.trends.cost_trend, Trend::Down);
}

#[tokio::test]
async fn empty_provider_response_is_stable_and_zero() {
    let snap = engine(StaticProvider::new(vec![]))
        .compute_analytics("asst-a", 7, 50)
        .await
        .unwrap();
    assert_eq!(snap.metrics.total_calls, 0);
    assert_eq!(snap.trends.call_volume_trend, Trend::Stable);
    assert_eq!(snap.trends.cost_trend, Trend::Stable);
}

#[tokio::test]
async fn unbounded_range_does_not_overflow() {
    let provider = StaticProvider::new(vec![raw_call("a1", "asst-a", 10, 60, "customer-ended-call", 1.0)]);
    let settings = EngineSettings {
        max_days: u32::MAX,
        ..EngineSettings::default()
    };
    let engine = AnalyticsEngine::new(provider, tenants(), settings);

    let snap = engine.compute_analytics("asst-a", u32::MAX, 10).await.unwrap();
    assert_eq!(snap.metrics.total_calls, 1);

    let snap = engine
        .compute_at("asst-a", u32::MAX, 10, Utc::now())
        .await
        .unwrap();
    assert_eq!(snap.recent_calls.len(), 1);
}
