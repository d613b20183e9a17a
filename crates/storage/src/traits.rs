use chrono::{DateTime, Utc};

use profilesync_core::{PlayerSnapshot, PlayerTag};

use crate::blob::{decode_optional, encode_optional};
use crate::error::StorageError;

/// One stored player. Scalars are columns; everything with a variable shape
/// is kept as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPlayerRecord {
    pub tag: PlayerTag,
    pub name: String,
    pub exp_level: u32,
    pub trophies: u32,
    pub best_trophies: u32,
    pub town_hall_level: u32,
    pub war_stars: u32,
    pub donations: u32,
    pub donations_received: u32,
    pub attack_wins: u32,
    pub defense_wins: u32,
    pub clan_capital_contributions: u32,
    pub town_hall_weapon_level: Option<u32>,
    pub role: Option<String>,
    pub war_preference: Option<String>,
    pub builder_hall_level: Option<u32>,
    pub builder_base_trophies: Option<u32>,
    pub best_builder_base_trophies: Option<u32>,
    pub clan: Option<Vec<u8>>,
    pub league: Option<Vec<u8>>,
    pub builder_base_league: Option<Vec<u8>>,
    pub legend_statistics: Option<Vec<u8>>,
    pub troops: Option<Vec<u8>>,
    pub heroes: Option<Vec<u8>>,
    pub spells: Option<Vec<u8>>,
    pub hero_equipment: Option<Vec<u8>>,
    pub content_hash: [u8; 32],
    pub is_my_profile: bool,
    pub created_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
}

impl PersistedPlayerRecord {
    pub fn from_snapshot(
        snapshot: &PlayerSnapshot,
        is_my_profile: bool,
        created_at: DateTime<Utc>,
        refreshed_at: DateTime<Utc>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            tag: snapshot.tag.clone(),
            name: snapshot.name.clone(),
            exp_level: snapshot.exp_level,
            trophies: snapshot.trophies,
            best_trophies: snapshot.best_trophies,
            town_hall_level: snapshot.town_hall_level,
            war_stars: snapshot.war_stars,
            donations: snapshot.donations,
            donations_received: snapshot.donations_received,
            attack_wins: snapshot.attack_wins,
            defense_wins: snapshot.defense_wins,
            clan_capital_contributions: snapshot.clan_capital_contributions,
            town_hall_weapon_level: snapshot.town_hall_weapon_level,
            role: snapshot.role.clone(),
            war_preference: snapshot.war_preference.clone(),
            builder_hall_level: snapshot.builder_hall_level,
            builder_base_trophies: snapshot.builder_base_trophies,
            best_builder_base_trophies: snapshot.best_builder_base_trophies,
            clan: encode_optional(&snapshot.clan)?,
            league: encode_optional(&snapshot.league)?,
            builder_base_league: encode_optional(&snapshot.builder_base_league)?,
            legend_statistics: encode_optional(&snapshot.legend_statistics)?,
            troops: encode_optional(&snapshot.troops)?,
            heroes: encode_optional(&snapshot.heroes)?,
            spells: encode_optional(&snapshot.spells)?,
            hero_equipment: encode_optional(&snapshot.hero_equipment)?,
            content_hash: snapshot.content_hash()?,
            is_my_profile,
            created_at,
            refreshed_at,
        })
    }

    /// Decode back into the shape the rest of the app works with.
    pub fn to_snapshot(&self) -> Result<PlayerSnapshot, StorageError> {
        Ok(PlayerSnapshot {
            tag: self.tag.clone(),
            name: self.name.clone(),
            exp_level: self.exp_level,
            trophies: self.trophies,
            best_trophies: self.best_trophies,
            town_hall_level: self.town_hall_level,
            war_stars: self.war_stars,
            donations: self.donations,
            donations_received: self.donations_received,
            attack_wins: self.attack_wins,
            defense_wins: self.defense_wins,
            clan_capital_contributions: self.clan_capital_contributions,
            town_hall_weapon_level: self.town_hall_weapon_level,
            role: self.role.clone(),
            war_preference: self.war_preference.clone(),
            builder_hall_level: self.builder_hall_level,
            builder_base_trophies: self.builder_base_trophies,
            best_builder_base_trophies: self.best_builder_base_trophies,
            clan: decode_optional(&self.clan, "clan")?,
            league: decode_optional(&self.league, "league")?,
            builder_base_league: decode_optional(&self.builder_base_league, "builder_base_league")?,
            legend_statistics: decode_optional(&self.legend_statistics, "legend_statistics")?,
            troops: decode_optional(&self.troops, "troops")?,
            heroes: decode_optional(&self.heroes, "heroes")?,
            spells: decode_optional(&self.spells, "spells")?,
            hero_equipment: decode_optional(&self.hero_equipment, "hero_equipment")?,
        })
    }
}

/// Durable player records with a single "my profile" slot.
///
/// Implementations must apply every mutation atomically: no reader may see
/// two flagged records or a half-merged row.
pub trait PlayerStore {
    fn get_by_tag(&self, tag: &PlayerTag) -> Result<Option<PersistedPlayerRecord>, StorageError>;

    fn get_my_profile(&self) -> Result<Option<PersistedPlayerRecord>, StorageError>;

    /// Existence check that never loads the row payload.
    fn has_my_profile(&self) -> Result<bool, StorageError>;

    /// Merge `snapshot` into the record for its tag (creating it if needed),
    /// flag that record as my profile and clear the flag everywhere else.
    /// Returns the stored record.
    fn upsert_as_my_profile(
        &mut self,
        snapshot: &PlayerSnapshot,
        refreshed_at: DateTime<Utc>,
    ) -> Result<PersistedPlayerRecord, StorageError>;

    /// Delete every flagged record and return how many were removed.
    fn remove_my_profile(&mut self) -> Result<usize, StorageError>;

    fn clear_all(&mut self) -> Result<(), StorageError>;

    fn my_profile_count(&self) -> Result<usize, StorageError>;

    fn record_count(&self) -> Result<usize, StorageError>;
}
