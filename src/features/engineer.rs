//! Training row construction
//!
//! Joins each observation with its player's season averages and the
//! matchup context of that game.

use crate::features::context::{Tier, TierTable};
use crate::features::scoring::ScoringRules;
use crate::features::season::{PlayerKey, PlayerProfile, SeasonAverages};
use crate::schema::{FeatureSource, TargetSource};
use crate::{Cohort, Counter, Observation, StatLine, Venue};

/// One observation with every feature and target it can contribute.
///
/// Unresolvable context (unmapped opponent, unparseable venue) is kept as
/// `None` so the row is excluded at training time rather than guessed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub key: PlayerKey,
    pub cohort: Cohort,
    pub week: u32,
    pub opponent: String,
    pub season: StatLine,
    pub tier: Option<Tier>,
    pub venue: Option<Venue>,
    pub actual: StatLine,
    pub fantasy_points: Option<f64>,
}

impl FeatureSource for FeatureRow {
    fn season_avg(&self, counter: Counter) -> Option<f64> {
        self.season.get(counter)
    }

    fn tier_ordinal(&self) -> Option<f64> {
        self.tier.map(|t| t.ordinal())
    }

    fn is_home(&self) -> Option<f64> {
        self.venue.map(|v| v.flag())
    }
}

impl TargetSource for FeatureRow {
    fn actual(&self, counter: Counter) -> Option<f64> {
        self.actual.get(counter)
    }

    fn fantasy_points(&self) -> Option<f64> {
        self.fantasy_points
    }
}

/// Derives season aggregates and match context from observations
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    tiers: TierTable,
    scoring: ScoringRules,
}

impl FeatureEngineer {
    pub fn new(tiers: TierTable, scoring: ScoringRules) -> Self {
        FeatureEngineer { tiers, scoring }
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// One row per observation; season averages are broadcast to every row
    /// of the same player.
    pub fn build_rows(&self, observations: &[Observation]) -> Vec<FeatureRow> {
        let season = SeasonAverages::from_observations(observations);

        let mut unmapped = 0usize;
        let mut bad_venue = 0usize;

        let rows: Vec<FeatureRow> = observations
            .iter()
            .filter_map(|obs| {
                let key = PlayerKey::of(obs);
                let profile = season.get(&key)?;

                let tier = self.tiers.tier_of(&obs.opponent).ok();
                if tier.is_none() {
                    unmapped += 1;
                }
                let venue = Venue::parse(&obs.venue).ok();
                if venue.is_none() {
                    bad_venue += 1;
                }

                let cohort = key.position.cohort();
                Some(FeatureRow {
                    cohort,
                    season: profile.averages,
                    key,
                    week: obs.week,
                    opponent: obs.opponent.clone(),
                    tier,
                    venue,
                    actual: obs.stats,
                    fantasy_points: self.scoring.score(&obs.stats, cohort),
                })
            })
            .collect();

        if unmapped > 0 {
            log::info!("{} rows have an opponent with no tier mapping", unmapped);
        }
        if bad_venue > 0 {
            log::info!("{} rows have an unparseable venue indicator", bad_venue);
        }
        log::debug!(
            "Built {} feature rows for {} players",
            rows.len(),
            season.len()
        );

        rows
    }

    /// Season-average profile of every player, for lookup at prediction time
    pub fn player_profiles(&self, observations: &[Observation]) -> Vec<PlayerProfile> {
        SeasonAverages::from_observations(observations).into_profiles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::context::default_tier_table;
    use crate::Position;

    fn engineer() -> FeatureEngineer {
        FeatureEngineer::new(
            TierTable::new(&default_tier_table()),
            ScoringRules::default(),
        )
    }

    fn obs(week: u32, opponent: &str, venue: &str, yards: f64) -> Observation {
        Observation {
            player_name: "Davante Adams".to_string(),
            position: Position::Wr,
            week,
            team: "LV".to_string(),
            opponent: opponent.to_string(),
            venue: venue.to_string(),
            stats: StatLine::zeros().with(Counter::ReceivingYards, yards),
        }
    }

    #[test]
    fn test_season_average_broadcast() {
        let rows = engineer().build_rows(&[
            obs(1, "DEN", "home", 10.0),
            obs(2, "KC", "away", 20.0),
            obs(3, "CHI", "HOME", 30.0),
        ]);

        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.season_avg(Counter::ReceivingYards), Some(20.0));
            assert_eq!(row.cohort, Cohort::Skill);
        }
        assert_eq!(rows[0].actual(Counter::ReceivingYards), Some(10.0));
    }

    #[test]
    fn test_context_encoding() {
        let rows = engineer().build_rows(&[
            obs(1, "KC", "Home", 50.0),
            obs(2, "CHI", "away", 50.0),
        ]);

        assert_eq!(rows[0].tier_ordinal(), Some(2.0));
        assert_eq!(rows[0].is_home(), Some(1.0));
        assert_eq!(rows[1].tier_ordinal(), Some(0.0));
        assert_eq!(rows[1].is_home(), Some(0.0));
    }

    #[test]
    fn test_unresolved_context_is_missing() {
        let rows = engineer().build_rows(&[obs(1, "XXX", "neutral", 50.0)]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tier_ordinal(), None);
        assert_eq!(rows[0].is_home(), None);
    }

    #[test]
    fn test_fantasy_points_attached() {
        let rows = engineer().build_rows(&[obs(1, "KC", "home", 100.0)]);
        assert_eq!(rows[0].fantasy_points(), Some(10.0));
    }

    #[test]
    fn test_player_profiles() {
        let profiles = engineer().player_profiles(&[
            obs(1, "KC", "home", 40.0),
            obs(2, "KC", "home", 60.0),
        ]);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].key.short_name, "D.Adams");
        assert_eq!(profiles[0].average(Counter::ReceivingYards), Some(50.0));
    }
}
