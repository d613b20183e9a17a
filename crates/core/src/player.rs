use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::tag::PlayerTag;

/// Which village a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Village {
    #[serde(rename = "home")]
    Home,
    #[serde(rename = "builderBase")]
    BuilderBase,
    #[serde(rename = "clanCapital")]
    ClanCapital,
}

/// One entry of a troop, hero, spell or equipment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitLevel {
    pub name: String,
    pub level: u32,
    pub max_level: u32,
    pub village: Village,
    /// Set for boosted temporary variants (super troops).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_troop_is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanInfo {
    pub tag: String,
    pub name: String,
    pub clan_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueInfo {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub rank: u32,
    pub trophies: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendStatistics {
    pub legend_trophies: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_season: Option<SeasonResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_season: Option<SeasonResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_season: Option<SeasonResult>,
}

/// A player's stats as returned by the remote service. May be partial: any
/// optional value can be missing from a given response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town_hall_weapon_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_hall_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_base_trophies: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_builder_base_trophies: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clan: Option<ClanInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<LeagueInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_base_league: Option<LeagueInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_statistics: Option<LegendStatistics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub troops: Option<Vec<UnitLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heroes: Option<Vec<UnitLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spells: Option<Vec<UnitLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_equipment: Option<Vec<UnitLevel>>,
}

impl PlayerSnapshot {
    /// A snapshot with zeroed counters and no optional data.
    pub fn new(tag: PlayerTag, name: impl Into<String>) -> Self {
        Self {
            tag,
            name: name.into(),
            exp_level: 0,
            trophies: 0,
            best_trophies: 0,
            town_hall_level: 0,
            war_stars: 0,
            donations: 0,
            donations_received: 0,
            attack_wins: 0,
            defense_wins: 0,
            clan_capital_contributions: 0,
            town_hall_weapon_level: None,
            role: None,
            war_preference: None,
            builder_hall_level: None,
            builder_base_trophies: None,
            best_builder_base_trophies: None,
            clan: None,
            league: None,
            builder_base_league: None,
            legend_statistics: None,
            troops: None,
            heroes: None,
            spells: None,
            hero_equipment: None,
        }
    }

    /// True when every unit collection is present and non-empty. Search
    /// results frequently are not.
    pub fn has_full_progression(&self) -> bool {
        [&self.troops, &self.heroes, &self.spells]
            .into_iter()
            .all(|c| c.as_ref().is_some_and(|v| !v.is_empty()))
    }

    /// Stable digest of the snapshot contents.
    pub fn content_hash(&self) -> Result<[u8; 32], CoreError> {
        let bytes = rmp_serde::to_vec_named(self)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }
}

/// Leaderboard placement of a player. Missing placements mean unranked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_rank: Option<LocalRank>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRank {
    pub location_name: String,
    pub rank: u32,
}

impl RankingsSnapshot {
    pub fn unranked() -> Self {
        Self::default()
    }

    pub fn is_unranked(&self) -> bool {
        self.global_rank.is_none() && self.local_rank.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, level: u32) -> UnitLevel {
        UnitLevel {
            name: name.into(),
            level,
            max_level: 10,
            village: Village::Home,
            super_troop_is_active: None,
        }
    }

    #[test]
    fn full_progression_requires_non_empty_lists() {
        let mut snapshot = PlayerSnapshot::new(PlayerTag::parse("#2PP").unwrap(), "Chief");
        assert!(!snapshot.has_full_progression());

        snapshot.troops = Some(vec![unit("Barbarian", 3)]);
        snapshot.heroes = Some(vec![unit("Archer Queen", 40)]);
        snapshot.spells = Some(Vec::new());
        assert!(!snapshot.has_full_progression());

        snapshot.spells = Some(vec![unit("Rage Spell", 5)]);
        assert!(snapshot.has_full_progression());
    }

    #[test]
    fn content_hash_tracks_changes() {
        let tag = PlayerTag::parse("#2PP").unwrap();
        let a = PlayerSnapshot::new(tag.clone(), "Chief");
        let mut b = PlayerSnapshot::new(tag, "Chief");
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());

        b.trophies = 1;
        assert_ne!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }

    #[test]
    fn unranked_default() {
        assert!(RankingsSnapshot::unranked().is_unranked());
        let ranked = RankingsSnapshot {
            global_rank: Some(12),
            local_rank: None,
        };
        assert!(!ranked.is_unranked());
    }
}
