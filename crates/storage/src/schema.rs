use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;

    let found: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    if found > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    tag TEXT PRIMARY KEY NOT NULL CHECK (length(tag) > 1),
    name TEXT NOT NULL,
    exp_level INTEGER NOT NULL,
    trophies INTEGER NOT NULL,
    best_trophies INTEGER NOT NULL,
    town_hall_level INTEGER NOT NULL,
    war_stars INTEGER NOT NULL,
    donations INTEGER NOT NULL,
    donations_received INTEGER NOT NULL,
    attack_wins INTEGER NOT NULL,
    defense_wins INTEGER NOT NULL,
    clan_capital_contributions INTEGER NOT NULL,
    town_hall_weapon_level INTEGER,
    role TEXT,
    war_preference TEXT,
    builder_hall_level INTEGER,
    builder_base_trophies INTEGER,
    best_builder_base_trophies INTEGER,
    clan BLOB,
    league BLOB,
    builder_base_league BLOB,
    legend_statistics BLOB,
    troops BLOB,
    heroes BLOB,
    spells BLOB,
    hero_equipment BLOB,
    content_hash BLOB NOT NULL CHECK (length(content_hash) = 32),
    is_my_profile INTEGER NOT NULL DEFAULT 0 CHECK (is_my_profile IN (0, 1)),
    created_at INTEGER NOT NULL,
    refreshed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_players_my_profile ON players(is_my_profile) WHERE is_my_profile = 1;
";
