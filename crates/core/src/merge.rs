use crate::player::PlayerSnapshot;

/// Fold a newly fetched snapshot into a previously known one.
///
/// Counters and the name always come from `new`. Optional values from `new`
/// win only when present, and unit collections only when present and
/// non-empty, so a truncated API response never erases data the record
/// already holds.
///
/// Snapshots of different accounts are not merged: `new` is returned as is.
pub fn merge_snapshots(old: &PlayerSnapshot, new: PlayerSnapshot) -> PlayerSnapshot {
    if old.tag != new.tag {
        return new;
    }

    PlayerSnapshot {
        tag: new.tag,
        name: new.name,
        exp_level: new.exp_level,
        trophies: new.trophies,
        best_trophies: new.best_trophies,
        town_hall_level: new.town_hall_level,
        war_stars: new.war_stars,
        donations: new.donations,
        donations_received: new.donations_received,
        attack_wins: new.attack_wins,
        defense_wins: new.defense_wins,
        clan_capital_contributions: new.clan_capital_contributions,

        town_hall_weapon_level: new.town_hall_weapon_level.or(old.town_hall_weapon_level),
        role: new.role.or_else(|| old.role.clone()),
        war_preference: new.war_preference.or_else(|| old.war_preference.clone()),
        builder_hall_level: new.builder_hall_level.or(old.builder_hall_level),
        builder_base_trophies: new.builder_base_trophies.or(old.builder_base_trophies),
        best_builder_base_trophies: new
            .best_builder_base_trophies
            .or(old.best_builder_base_trophies),

        clan: new.clan.or_else(|| old.clan.clone()),
        league: new.league.or_else(|| old.league.clone()),
        builder_base_league: new
            .builder_base_league
            .or_else(|| old.builder_base_league.clone()),
        legend_statistics: new
            .legend_statistics
            .or_else(|| old.legend_statistics.clone()),

        troops: keep_known(new.troops, &old.troops),
        heroes: keep_known(new.heroes, &old.heroes),
        spells: keep_known(new.spells, &old.spells),
        hero_equipment: keep_known(new.hero_equipment, &old.hero_equipment),
    }
}

fn keep_known<T: Clone>(new: Option<Vec<T>>, old: &Option<Vec<T>>) -> Option<Vec<T>> {
    match new {
        Some(items) if !items.is_empty() => Some(items),
        _ => old.clone(),
    }
}
