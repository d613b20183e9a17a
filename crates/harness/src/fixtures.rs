use profilesync_core::{
    ClanInfo, LeagueInfo, LegendStatistics, PlayerSnapshot, PlayerTag, SeasonResult, UnitLevel,
    Village,
};

pub fn tag(input: &str) -> PlayerTag {
    PlayerTag::parse(input).expect("fixture tag must be valid")
}

pub fn unit(name: &str, level: u32, max_level: u32) -> UnitLevel {
    UnitLevel {
        name: name.to_string(),
        level,
        max_level,
        village: Village::Home,
        super_troop_is_active: None,
    }
}

/// A player with only counters, as search results often come back.
pub fn partial_player(input: &str, name: &str) -> PlayerSnapshot {
    let mut player = PlayerSnapshot::new(tag(input), name);
    player.exp_level = 180;
    player.trophies = 4800;
    player.best_trophies = 5300;
    player.town_hall_level = 15;
    player.war_stars = 1200;
    player.donations = 950;
    player.donations_received = 700;
    player.attack_wins = 40;
    player.defense_wins = 3;
    player.clan_capital_contributions = 250_000;
    player
}

/// A player with every optional section filled in.
pub fn full_player(input: &str, name: &str) -> PlayerSnapshot {
    let mut player = partial_player(input, name);
    player.town_hall_weapon_level = Some(2);
    player.role = Some("coLeader".into());
    player.war_preference = Some("in".into());
    player.builder_hall_level = Some(10);
    player.builder_base_trophies = Some(3900);
    player.best_builder_base_trophies = Some(4100);
    player.clan = Some(ClanInfo {
        tag: "#2Y0QJ8".into(),
        name: "Night Watch".into(),
        clan_level: 20,
        badge_url: Some("https://example.invalid/badge.png".into()),
    });
    player.league = Some(LeagueInfo {
        id: 29_000_022,
        name: "Legend League".into(),
        icon_url: None,
    });
    player.builder_base_league = Some(LeagueInfo {
        id: 44_000_036,
        name: "Diamond League".into(),
        icon_url: None,
    });
    player.legend_statistics = Some(LegendStatistics {
        legend_trophies: 3100,
        current_season: Some(SeasonResult {
            id: None,
            rank: 40_512,
            trophies: 5210,
        }),
        previous_season: None,
        best_season: Some(SeasonResult {
            id: Some("2023-11".into()),
            rank: 9_876,
            trophies: 5640,
        }),
    });
    player.troops = Some(vec![
        unit("Barbarian", 11, 12),
        unit("Dragon", 10, 11),
        UnitLevel {
            super_troop_is_active: Some(true),
            ..unit("Super Wizard", 6, 7)
        },
    ]);
    player.heroes = Some(vec![
        unit("Barbarian King", 85, 95),
        unit("Archer Queen", 88, 95),
    ]);
    player.spells = Some(vec![unit("Rage Spell", 6, 6), unit("Freeze Spell", 7, 7)]);
    player.hero_equipment = Some(vec![unit("Giant Gauntlet", 18, 27)]);
    player
}
