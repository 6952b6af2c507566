//! Canonical schemas per cohort and target mode

use crate::schema::{Feature, Schema, Target};
use crate::{Cohort, Counter, TargetMode};

/// Defines the feature/target ordering for every cohort.
///
/// Passing-specific counters are filtered through [`Counter::is_passing`]
/// for the skill cohort, for both features and targets.
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn schema(cohort: Cohort, mode: TargetMode) -> Schema {
        let counters = Counter::for_cohort(cohort);

        let mut features: Vec<Feature> = counters.iter().map(|c| Feature::SeasonAvg(*c)).collect();
        features.push(Feature::OpponentTier);
        features.push(Feature::IsHome);

        let targets = match mode {
            TargetMode::Counters => counters.iter().map(|c| Target::Counter(*c)).collect(),
            TargetMode::Fantasy => vec![Target::FantasyPoints],
        };

        Schema {
            cohort,
            mode,
            features,
            targets,
        }
    }

    /// Schemas for every cohort under one target mode
    pub fn all(mode: TargetMode) -> Vec<Schema> {
        Cohort::ALL
            .into_iter()
            .map(|cohort| Self::schema(cohort, mode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qb_schema_order() {
        let schema = SchemaRegistry::schema(Cohort::Qb, TargetMode::Counters);
        assert_eq!(
            schema.feature_names(),
            vec![
                "passing_yards_season_avg",
                "passing_tds_season_avg",
                "interceptions_season_avg",
                "rushing_yards_season_avg",
                "rushing_tds_season_avg",
                "receptions_season_avg",
                "receiving_yards_season_avg",
                "receiving_tds_season_avg",
                "fumbles_lost_season_avg",
                "opponent_defense_tier",
                "is_home",
            ]
        );
        assert_eq!(schema.n_targets(), 9);
        assert!(schema.is_multi_output());
    }

    #[test]
    fn test_skill_schema_order() {
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        assert_eq!(
            schema.feature_names(),
            vec![
                "rushing_yards_season_avg",
                "rushing_tds_season_avg",
                "receptions_season_avg",
                "receiving_yards_season_avg",
                "receiving_tds_season_avg",
                "fumbles_lost_season_avg",
                "opponent_defense_tier",
                "is_home",
            ]
        );
        assert_eq!(
            schema.target_names(),
            vec![
                "rushing_yards",
                "rushing_tds",
                "receptions",
                "receiving_yards",
                "receiving_tds",
                "fumbles_lost",
            ]
        );
    }

    #[test]
    fn test_skill_schema_never_has_passing_names() {
        for mode in [TargetMode::Counters, TargetMode::Fantasy] {
            let schema = SchemaRegistry::schema(Cohort::Skill, mode);
            for name in schema.feature_names().iter().chain(schema.target_names().iter()) {
                assert!(!name.starts_with("passing"), "{} in skill schema", name);
                assert!(!name.starts_with("interceptions"), "{} in skill schema", name);
            }
        }
    }

    #[test]
    fn test_fantasy_is_single_output() {
        for schema in SchemaRegistry::all(TargetMode::Fantasy) {
            assert_eq!(schema.target_names(), vec!["fantasy_points"]);
            assert!(!schema.is_multi_output());
        }
    }

    #[test]
    fn test_registry_schemas_validate() {
        for mode in [TargetMode::Counters, TargetMode::Fantasy] {
            for schema in SchemaRegistry::all(mode) {
                schema.validate().unwrap();
            }
        }
    }

    #[test]
    fn test_schema_is_stable() {
        let a = SchemaRegistry::schema(Cohort::Qb, TargetMode::Counters);
        let b = SchemaRegistry::schema(Cohort::Qb, TargetMode::Counters);
        assert_eq!(a, b);
    }
}
