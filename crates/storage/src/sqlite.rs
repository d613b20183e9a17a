use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use profilesync_core::{PlayerSnapshot, PlayerTag, merge_snapshots};

use crate::error::StorageError;
use crate::traits::{PersistedPlayerRecord, PlayerStore};

const RECORD_COLUMNS: &str = "tag, name, exp_level, trophies, best_trophies, town_hall_level, \
     war_stars, donations, donations_received, attack_wins, defense_wins, \
     clan_capital_contributions, town_hall_weapon_level, role, war_preference, \
     builder_hall_level, builder_base_trophies, best_builder_base_trophies, \
     clan, league, builder_base_league, legend_statistics, troops, heroes, spells, \
     hero_equipment, content_hash, is_my_profile, created_at, refreshed_at";

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn to_count(count: i64) -> Result<usize, StorageError> {
    usize::try_from(count)
        .map_err(|_| StorageError::Serialization(format!("row count out of range: {count}")))
}

fn to_instant(millis: i64, label: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::Serialization(format!("{label} out of range: {millis}")))
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn read_record(row: &rusqlite::Row) -> Result<PersistedPlayerRecord, StorageError> {
    let tag: String = row.get(0)?;
    let content_hash: Vec<u8> = row.get(26)?;
    let created_at: i64 = row.get(28)?;
    let refreshed_at: i64 = row.get(29)?;

    Ok(PersistedPlayerRecord {
        tag: PlayerTag::parse(&tag)?,
        name: row.get(1)?,
        exp_level: row.get(2)?,
        trophies: row.get(3)?,
        best_trophies: row.get(4)?,
        town_hall_level: row.get(5)?,
        war_stars: row.get(6)?,
        donations: row.get(7)?,
        donations_received: row.get(8)?,
        attack_wins: row.get(9)?,
        defense_wins: row.get(10)?,
        clan_capital_contributions: row.get(11)?,
        town_hall_weapon_level: row.get(12)?,
        role: row.get(13)?,
        war_preference: row.get(14)?,
        builder_hall_level: row.get(15)?,
        builder_base_trophies: row.get(16)?,
        best_builder_base_trophies: row.get(17)?,
        clan: row.get(18)?,
        league: row.get(19)?,
        builder_base_league: row.get(20)?,
        legend_statistics: row.get(21)?,
        troops: row.get(22)?,
        heroes: row.get(23)?,
        spells: row.get(24)?,
        hero_equipment: row.get(25)?,
        content_hash: to_array::<32>(content_hash, "content_hash")?,
        is_my_profile: row.get(27)?,
        created_at: to_instant(created_at, "created_at")?,
        refreshed_at: to_instant(refreshed_at, "refreshed_at")?,
    })
}

fn select_one(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<PersistedPlayerRecord>, StorageError> {
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM players WHERE {filter} LIMIT 1"))?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(read_record(row)?)),
        None => Ok(None),
    }
}

fn write_record(conn: &Connection, record: &PersistedPlayerRecord) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO players (
            tag, name, exp_level, trophies, best_trophies, town_hall_level,
            war_stars, donations, donations_received, attack_wins, defense_wins,
            clan_capital_contributions, town_hall_weapon_level, role, war_preference,
            builder_hall_level, builder_base_trophies, best_builder_base_trophies,
            clan, league, builder_base_league, legend_statistics, troops, heroes, spells,
            hero_equipment, content_hash, is_my_profile, created_at, refreshed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                  ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)
        ON CONFLICT(tag) DO UPDATE SET
            name = excluded.name,
            exp_level = excluded.exp_level,
            trophies = excluded.trophies,
            best_trophies = excluded.best_trophies,
            town_hall_level = excluded.town_hall_level,
            war_stars = excluded.war_stars,
            donations = excluded.donations,
            donations_received = excluded.donations_received,
            attack_wins = excluded.attack_wins,
            defense_wins = excluded.defense_wins,
            clan_capital_contributions = excluded.clan_capital_contributions,
            town_hall_weapon_level = excluded.town_hall_weapon_level,
            role = excluded.role,
            war_preference = excluded.war_preference,
            builder_hall_level = excluded.builder_hall_level,
            builder_base_trophies = excluded.builder_base_trophies,
            best_builder_base_trophies = excluded.best_builder_base_trophies,
            clan = excluded.clan,
            league = excluded.league,
            builder_base_league = excluded.builder_base_league,
            legend_statistics = excluded.legend_statistics,
            troops = excluded.troops,
            heroes = excluded.heroes,
            spells = excluded.spells,
            hero_equipment = excluded.hero_equipment,
            content_hash = excluded.content_hash,
            is_my_profile = excluded.is_my_profile,
            refreshed_at = excluded.refreshed_at",
        rusqlite::params![
            record.tag.as_str(),
            record.name,
            record.exp_level,
            record.trophies,
            record.best_trophies,
            record.town_hall_level,
            record.war_stars,
            record.donations,
            record.donations_received,
            record.attack_wins,
            record.defense_wins,
            record.clan_capital_contributions,
            record.town_hall_weapon_level,
            record.role,
            record.war_preference,
            record.builder_hall_level,
            record.builder_base_trophies,
            record.best_builder_base_trophies,
            record.clan,
            record.league,
            record.builder_base_league,
            record.legend_statistics,
            record.troops,
            record.heroes,
            record.spells,
            record.hero_equipment,
            &record.content_hash[..],
            record.is_my_profile,
            record.created_at.timestamp_millis(),
            record.refreshed_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

impl PlayerStore for SqliteStore {
    fn get_by_tag(&self, tag: &PlayerTag) -> Result<Option<PersistedPlayerRecord>, StorageError> {
        select_one(&self.conn, "tag = ?1", [tag.as_str()])
    }

    fn get_my_profile(&self) -> Result<Option<PersistedPlayerRecord>, StorageError> {
        select_one(&self.conn, "is_my_profile = 1", [])
    }

    fn has_my_profile(&self) -> Result<bool, StorageError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM players WHERE is_my_profile = 1 LIMIT 1",
                [],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert_as_my_profile(
        &mut self,
        snapshot: &PlayerSnapshot,
        refreshed_at: DateTime<Utc>,
    ) -> Result<PersistedPlayerRecord, StorageError> {
        // IMMEDIATE takes the write lock up front so the read-merge-write below
        // cannot interleave with another writer on the same database.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (merged, created_at) = match select_one(&tx, "tag = ?1", [snapshot.tag.as_str()])? {
            Some(existing) => (
                merge_snapshots(&existing.to_snapshot()?, snapshot.clone()),
                existing.created_at,
            ),
            None => (snapshot.clone(), refreshed_at),
        };

        let record = PersistedPlayerRecord::from_snapshot(&merged, true, created_at, refreshed_at)?;
        write_record(&tx, &record)?;
        tx.execute(
            "UPDATE players SET is_my_profile = 0 WHERE is_my_profile = 1 AND tag <> ?1",
            [record.tag.as_str()],
        )?;
        tx.commit()?;
        Ok(record)
    }

    fn remove_my_profile(&mut self) -> Result<usize, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM players WHERE is_my_profile = 1", [])?;
        Ok(removed)
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM players", [])?;
        Ok(())
    }

    fn my_profile_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM players WHERE is_my_profile = 1",
            [],
            |row| row.get(0),
        )?;
        to_count(count)
    }

    fn record_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;
        to_count(count)
    }
}
