use chrono::TimeDelta;
use profilesync_harness::fixtures::{full_player, partial_player, tag, unit};
use profilesync_harness::test_epoch;
use profilesync_storage::{PlayerStore, SqliteStore, StorageError};

// ============================================================================
// Single "my profile" slot
// ============================================================================

#[test]
fn upsert_flags_only_the_latest_profile() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    store.upsert_as_my_profile(&full_player("#2PP", "First"), test_epoch())?;
    store.upsert_as_my_profile(&full_player("#QY8R", "Second"), test_epoch())?;

    let mine = store.get_my_profile()?.expect("a profile is flagged");
    assert_eq!(mine.tag, tag("#QY8R"));
    assert_eq!(store.my_profile_count()?, 1);

    // The previous profile stays as an ordinary record.
    let previous = store.get_by_tag(&tag("#2PP"))?.expect("record kept");
    assert!(!previous.is_my_profile);
    assert_eq!(store.record_count()?, 2);

    Ok(())
}

#[test]
fn reclaiming_an_old_record_moves_the_flag_back() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    for t in ["#2PP", "#QY8R", "#2PP"] {
        store.upsert_as_my_profile(&full_player(t, "Chief"), test_epoch())?;
    }
    assert_eq!(store.get_my_profile()?.unwrap().tag, tag("#2PP"));
    assert_eq!(store.my_profile_count()?, 1);
    assert_eq!(store.record_count()?, 2);
    Ok(())
}

#[test]
fn has_my_profile_follows_flag() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    assert!(!store.has_my_profile()?);
    store.upsert_as_my_profile(&partial_player("#2PP", "Chief"), test_epoch())?;
    assert!(store.has_my_profile()?);
    Ok(())
}

// ============================================================================
// Non-destructive merge
// ============================================================================

#[test]
fn later_partial_save_keeps_earlier_sections() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    let full = full_player("#2PP", "Chief");
    store.upsert_as_my_profile(&full, test_epoch())?;

    let mut partial = partial_player("#2PP", "Chief");
    partial.trophies = 4999;
    partial.heroes = Some(Vec::new());
    store.upsert_as_my_profile(&partial, test_epoch() + TimeDelta::hours(1))?;

    let stored = store.get_my_profile()?.unwrap().to_snapshot()?;
    assert_eq!(stored.trophies, 4999);
    assert_eq!(stored.heroes, full.heroes);
    assert_eq!(stored.troops, full.troops);
    assert_eq!(stored.spells, full.spells);
    assert_eq!(stored.hero_equipment, full.hero_equipment);
    assert_eq!(stored.clan, full.clan);
    assert_eq!(stored.league, full.league);
    assert_eq!(stored.legend_statistics, full.legend_statistics);
    assert_eq!(stored.town_hall_weapon_level, Some(2));
    Ok(())
}

#[test]
fn newer_collections_replace_stored_ones() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    store.upsert_as_my_profile(&full_player("#2PP", "Chief"), test_epoch())?;

    let mut upgraded = partial_player("#2PP", "Chief");
    upgraded.heroes = Some(vec![unit("Barbarian King", 86, 95)]);
    store.upsert_as_my_profile(&upgraded, test_epoch())?;

    let stored = store.get_my_profile()?.unwrap().to_snapshot()?;
    assert_eq!(stored.heroes, Some(vec![unit("Barbarian King", 86, 95)]));
    Ok(())
}

#[test]
fn same_snapshot_twice_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    let snapshot = full_player("#2PP", "Chief");

    let once = store.upsert_as_my_profile(&snapshot, test_epoch())?;
    let twice = store.upsert_as_my_profile(&snapshot, test_epoch())?;
    assert_eq!(once, twice);
    assert_eq!(store.get_my_profile()?.unwrap(), once);
    Ok(())
}

#[test]
fn empty_collections_are_stable_across_saves() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    let mut snapshot = full_player("#2PP", "Chief");
    snapshot.hero_equipment = Some(Vec::new());
    snapshot.spells = Some(Vec::new());

    let once = store.upsert_as_my_profile(&snapshot, test_epoch())?;
    let twice = store.upsert_as_my_profile(&snapshot, test_epoch())?;
    assert_eq!(once.content_hash, twice.content_hash);
    assert_eq!(once, twice);
    assert_eq!(twice.to_snapshot()?, snapshot);
    Ok(())
}

#[test]
fn blobs_decode_losslessly() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    let snapshot = full_player("#9LQ2YCGV", "Chief");
    store.upsert_as_my_profile(&snapshot, test_epoch())?;

    let stored = store.get_by_tag(&tag("#9LQ2YCGV"))?.unwrap();
    assert_eq!(stored.to_snapshot()?, snapshot);
    assert_eq!(stored.content_hash, snapshot.content_hash()?);
    Ok(())
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn failed_upsert_leaves_prior_state() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    store.upsert_as_my_profile(&full_player("#2PP", "First"), test_epoch())?;
    store.upsert_as_my_profile(&full_player("#QY8R", "Second"), test_epoch())?;

    // Corrupt the stored clan blob of the non-profile record.
    store.conn().execute(
        "UPDATE players SET clan = X'C1' WHERE tag = '#2PP'",
        [],
    )?;

    let result = store.upsert_as_my_profile(&partial_player("#2PP", "First"), test_epoch());
    assert!(matches!(result, Err(StorageError::Serialization(_))));

    // The flag did not move and nothing was half-written.
    assert_eq!(store.get_my_profile()?.unwrap().tag, tag("#QY8R"));
    assert_eq!(store.my_profile_count()?, 1);
    let untouched = store.get_by_tag(&tag("#2PP"))?.unwrap();
    assert_eq!(untouched.name, "First");
    assert_eq!(untouched.clan.as_deref(), Some(&[0xC1u8][..]));
    Ok(())
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn remove_deletes_flagged_record_only() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    store.upsert_as_my_profile(&full_player("#2PP", "First"), test_epoch())?;
    store.upsert_as_my_profile(&full_player("#QY8R", "Second"), test_epoch())?;

    assert_eq!(store.remove_my_profile()?, 1);
    assert!(!store.has_my_profile()?);
    assert!(store.get_by_tag(&tag("#QY8R"))?.is_none());
    assert!(store.get_by_tag(&tag("#2PP"))?.is_some());

    assert_eq!(store.remove_my_profile()?, 0);
    Ok(())
}

#[test]
fn remove_cleans_up_duplicate_flags() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    store.upsert_as_my_profile(&full_player("#2PP", "First"), test_epoch())?;
    store.upsert_as_my_profile(&full_player("#QY8R", "Second"), test_epoch())?;
    store
        .conn()
        .execute("UPDATE players SET is_my_profile = 1", [])?;
    assert_eq!(store.my_profile_count()?, 2);

    assert_eq!(store.remove_my_profile()?, 2);
    assert_eq!(store.record_count()?, 0);
    Ok(())
}

#[test]
fn clear_all_wipes_everything() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open_in_memory()?;
    store.upsert_as_my_profile(&full_player("#2PP", "First"), test_epoch())?;
    store.upsert_as_my_profile(&full_player("#QY8R", "Second"), test_epoch())?;
    store.clear_all()?;
    assert_eq!(store.record_count()?, 0);
    assert!(store.get_my_profile()?.is_none());
    Ok(())
}
