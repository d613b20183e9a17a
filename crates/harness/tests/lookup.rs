use chrono::{TimeDelta, TimeZone, Utc};

use profilesync_core::{LocalRank, RankingsSnapshot};
use profilesync_engine::{FetchError, SyncConfig, SyncError};
use profilesync_harness::fixtures::{full_player, partial_player, tag};
use profilesync_harness::{TestApp, init_tracing};
use profilesync_storage::PlayerStore;

// ============================================================================
// Session cache
// ============================================================================

#[tokio::test]
async fn search_result_lives_for_an_hour() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let app = TestApp::new()?;
    app.fetcher.set_player(partial_player("#QY8R", "Visitor"));

    let found = app.sync.search_player("qy8r").await?;
    assert_eq!(found, partial_player("#QY8R", "Visitor"));

    app.clock.advance(TimeDelta::seconds(3599));
    assert_eq!(app.sync.last_searched(), Some(found));

    app.clock.advance(TimeDelta::seconds(1));
    assert_eq!(app.sync.last_searched(), None);
    Ok(())
}

#[tokio::test]
async fn search_never_touches_the_store() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let app = TestApp::new()?;
    app.fetcher.set_player(full_player("#QY8R", "Visitor"));
    app.sync.search_player("#QY8R").await?;

    assert_eq!(app.sync.with_store(|s| s.record_count().unwrap()), 0);
    assert!(app.sync.current().is_none());
    Ok(())
}

#[tokio::test]
async fn second_search_replaces_the_first() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let app = TestApp::new()?;
    app.fetcher.set_player(partial_player("#2PP", "One"));
    app.fetcher.set_player(partial_player("#QY8R", "Two"));

    app.sync.search_player("#2PP").await?;
    app.sync.search_player("#QY8R").await?;
    assert_eq!(app.sync.last_searched().unwrap().tag, tag("#QY8R"));

    app.sync.clear_last_searched();
    assert!(app.sync.last_searched().is_none());
    Ok(())
}

#[tokio::test]
async fn failed_search_keeps_previous_result() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let app = TestApp::new()?;
    app.fetcher.set_player(partial_player("#2PP", "One"));
    app.sync.search_player("#2PP").await?;

    let err = app.sync.search_player("#QY8R").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
    assert_eq!(err.user_message(), "No player with that tag was found.");
    assert_eq!(app.sync.last_searched().unwrap().tag, tag("#2PP"));
    Ok(())
}

#[tokio::test]
async fn custom_ttl_is_honoured() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = SyncConfig::from_toml_str("session_ttl_secs = 60")?;
    let app = TestApp::with_config(config)?;
    app.fetcher.set_player(partial_player("#2PP", "One"));
    app.sync.search_player("#2PP").await?;

    app.clock.advance(TimeDelta::seconds(60));
    assert!(app.sync.last_searched().is_none());
    Ok(())
}

// ============================================================================
// Rankings
// ============================================================================

#[tokio::test]
async fn rankings_pass_through() {
    init_tracing();
    let app = TestApp::new().unwrap();
    let ranked = RankingsSnapshot {
        global_rank: Some(1_204),
        local_rank: Some(LocalRank {
            location_name: "Finland".into(),
            rank: 3,
        }),
    };
    app.fetcher.set_rankings(tag("#2PP"), ranked.clone());

    assert_eq!(app.sync.rankings(&tag("#2PP")).await, ranked);
    assert_eq!(app.fetcher.rankings_calls(), 1);
}

#[tokio::test]
async fn missing_rankings_read_as_unranked() {
    init_tracing();
    let app = TestApp::new().unwrap();
    assert!(app.sync.rankings(&tag("#2PP")).await.is_unranked());

    app.fetcher.set_rankings(
        tag("#2PP"),
        RankingsSnapshot {
            global_rank: Some(9),
            local_rank: None,
        },
    );
    app.fetcher.fail_next(FetchError::Decode("truncated body".into()));
    assert!(app.sync.rankings(&tag("#2PP")).await.is_unranked());
}

// ============================================================================
// Daily reset
// ============================================================================

#[tokio::test]
async fn stale_profile_refreshes_once_after_reset() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let app = TestApp::new()?;
    app.fetcher.set_player(full_player("#2PP", "Chief"));
    app.sync.save_as_my_profile("#2PP").await?;
    let calls = app.fetcher.calls();

    // Saved at 12:00; the next boundary is 05:00 tomorrow.
    assert_eq!(
        app.sync.next_reset(),
        Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap()
    );
    app.clock.advance(TimeDelta::hours(10));
    assert!(!app.sync.refresh_if_stale().await?);
    assert_eq!(app.fetcher.calls(), calls);

    app.clock.advance(TimeDelta::hours(7));
    assert!(app.sync.refresh_if_stale().await?);
    assert_eq!(app.fetcher.calls(), calls + 1);

    let stored = app.sync.with_store(|s| s.get_my_profile().unwrap()).unwrap();
    assert_eq!(
        stored.refreshed_at,
        Utc.with_ymd_and_hms(2024, 1, 2, 5, 0, 0).unwrap()
    );
    assert!(!app.sync.refresh_if_stale().await?);
    Ok(())
}

#[tokio::test]
async fn nothing_to_refresh_without_profile() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let app = TestApp::new()?;
    app.clock.advance(TimeDelta::days(3));
    assert!(!app.sync.refresh_if_stale().await?);
    assert_eq!(app.fetcher.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn reset_hour_comes_from_config() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = SyncConfig::from_toml_str("reset_hour_utc = 13")?;
    let app = TestApp::with_config(config)?;
    assert_eq!(
        app.sync.next_reset(),
        Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap()
    );
    Ok(())
}
