//! Matchup context features
//!
//! Opponent defensive tier and home/away flag for a single game.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{GridironError, Result, Venue};

/// Defensive strength category of an opponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[serde(alias = "low")]
    Bottom,
    Mid,
    Top,
}

impl Tier {
    /// Numeric encoding, higher = stronger defense
    pub fn ordinal(&self) -> f64 {
        match self {
            Tier::Bottom => 0.0,
            Tier::Mid => 1.0,
            Tier::Top => 2.0,
        }
    }

    pub fn parse(label: &str) -> Result<Self> {
        match label.trim().to_lowercase().as_str() {
            "bottom" | "low" => Ok(Tier::Bottom),
            "mid" => Ok(Tier::Mid),
            "top" => Ok(Tier::Top),
            _ => Err(GridironError::UnknownTier(label.to_string())),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Bottom => write!(f, "bottom"),
            Tier::Mid => write!(f, "mid"),
            Tier::Top => write!(f, "top"),
        }
    }
}

fn team_key(team: &str) -> String {
    team.trim().to_uppercase()
}

/// Team code -> tier lookup shared by training and prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    teams: BTreeMap<String, Tier>,
}

impl TierTable {
    pub fn new(teams: &BTreeMap<String, Tier>) -> Self {
        TierTable {
            teams: teams.iter().map(|(k, v)| (team_key(k), *v)).collect(),
        }
    }

    /// Resolve an opponent; unmapped teams are an error, never a default tier
    pub fn tier_of(&self, team: &str) -> Result<Tier> {
        self.teams
            .get(&team_key(team))
            .copied()
            .ok_or_else(|| GridironError::UnknownOpponent(team.to_string()))
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// Context of one game from the player's point of view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchContext {
    pub tier: Tier,
    pub venue: Venue,
}

impl MatchContext {
    /// Resolve opponent and venue text. Opponent is checked first.
    pub fn resolve(tiers: &TierTable, opponent: &str, venue: &str) -> Result<Self> {
        let tier = tiers.tier_of(opponent)?;
        let venue = Venue::parse(venue)?;
        Ok(MatchContext { tier, venue })
    }

    pub fn tier_ordinal(&self) -> f64 {
        self.tier.ordinal()
    }

    pub fn is_home(&self) -> f64 {
        self.venue.flag()
    }
}

/// 2023 defensive tiers
pub fn default_tier_table() -> BTreeMap<String, Tier> {
    let top = ["KC", "BAL", "SF", "LAC", "DAL", "PIT", "JAX", "BUF", "LAR", "NE"];
    let mid = ["TEN", "IND", "LV", "PHI", "ARI", "DEN", "MIN", "SEA", "GB", "MIA"];
    let bottom = [
        "CIN", "TB", "ATL", "NYG", "NO", "CAR", "HOU", "WAS", "CLE", "NYJ", "CHI", "DET",
    ];

    let mut table = BTreeMap::new();
    for (teams, tier) in [
        (&top[..], Tier::Top),
        (&mid[..], Tier::Mid),
        (&bottom[..], Tier::Bottom),
    ] {
        for team in teams {
            table.insert(team.to_string(), tier);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TierTable {
        TierTable::new(&default_tier_table())
    }

    #[test]
    fn test_ordinal_monotonic() {
        assert!(Tier::Top.ordinal() > Tier::Mid.ordinal());
        assert!(Tier::Mid.ordinal() > Tier::Bottom.ordinal());
    }

    #[test]
    fn test_top_team_ranks_above_bottom_team() {
        let tiers = table();
        let kc = tiers.tier_of("KC").unwrap();
        let chi = tiers.tier_of("CHI").unwrap();
        assert!(kc.ordinal() > chi.ordinal());
    }

    #[test]
    fn test_lookup_normalizes_case() {
        let tiers = table();
        assert_eq!(tiers.tier_of(" kc ").unwrap(), Tier::Top);
    }

    #[test]
    fn test_unknown_opponent() {
        let tiers = table();
        assert!(matches!(
            tiers.tier_of("XXX"),
            Err(GridironError::UnknownOpponent(t)) if t == "XXX"
        ));
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(Tier::parse("LOW").unwrap(), Tier::Bottom);
        assert_eq!(Tier::parse("top").unwrap(), Tier::Top);
        assert!(matches!(
            Tier::parse("elite"),
            Err(GridironError::UnknownTier(_))
        ));
    }

    #[test]
    fn test_default_table_covers_league() {
        assert_eq!(default_tier_table().len(), 32);
    }

    #[test]
    fn test_match_context_resolve() {
        let tiers = table();
        let ctx = MatchContext::resolve(&tiers, "NYG", "Away").unwrap();
        assert_eq!(ctx.tier, Tier::Bottom);
        assert_eq!(ctx.is_home(), 0.0);

        assert!(matches!(
            MatchContext::resolve(&tiers, "NYG", "road"),
            Err(GridironError::InvalidVenue(_))
        ));
        assert!(matches!(
            MatchContext::resolve(&tiers, "XXX", "road"),
            Err(GridironError::UnknownOpponent(_))
        ));
    }
}
