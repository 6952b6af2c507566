//! Training matrices for one cohort
//!
//! Rows are filtered to the schema's cohort and then to rows where every
//! feature and every target is present. Anything partial is dropped, never
//! imputed.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::features::{FeatureRow, PlayerKey};
use crate::schema::Schema;
use crate::{GridironError, Result};

/// Feature and target matrices in schema order
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub schema: Schema,
    /// (rows, schema.features)
    pub features: Array2<f64>,
    /// (rows, schema.targets)
    pub targets: Array2<f64>,
    /// Player of each kept row
    pub keys: Vec<PlayerKey>,
    /// Cohort rows dropped for a missing feature or target
    pub excluded: usize,
}

impl TrainingSet {
    pub fn build(rows: &[FeatureRow], schema: &Schema) -> Result<Self> {
        schema.validate()?;

        let n_features = schema.n_features();
        let n_targets = schema.n_targets();
        let mut features = Vec::new();
        let mut targets = Vec::new();
        let mut keys = Vec::new();
        let mut excluded = 0usize;

        for row in rows.iter().filter(|r| r.cohort == schema.cohort) {
            let x = match schema.assemble(row) {
                Ok(x) => x,
                Err(missing) => {
                    log::trace!("Excluding {} week {}: missing {}", row.key, row.week, missing);
                    excluded += 1;
                    continue;
                }
            };
            let y = match schema.extract_targets(row) {
                Some(y) => y,
                None => {
                    log::trace!("Excluding {} week {}: missing target", row.key, row.week);
                    excluded += 1;
                    continue;
                }
            };

            features.extend(x);
            targets.extend(y);
            keys.push(row.key.clone());
        }

        let n = keys.len();
        if excluded > 0 {
            log::info!(
                "{} cohort: excluded {} incomplete training rows, kept {}",
                schema.cohort,
                excluded,
                n
            );
        }

        Ok(TrainingSet {
            schema: schema.clone(),
            features: Array2::from_shape_vec((n, n_features), features)
                .map_err(|e| GridironError::Training(e.to_string()))?,
            targets: Array2::from_shape_vec((n, n_targets), targets)
                .map_err(|e| GridironError::Training(e.to_string()))?,
            keys,
            excluded,
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn select(&self, indices: &[usize]) -> Self {
        TrainingSet {
            schema: self.schema.clone(),
            features: self.features.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
            keys: indices.iter().map(|&i| self.keys[i].clone()).collect(),
            excluded: 0,
        }
    }

    /// Seeded shuffle into (fit, hold-out). Both parts keep at least one row
    /// when the set has two or more.
    pub fn split(&self, holdout_ratio: f64, seed: u64) -> (Self, Self) {
        let n = self.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_holdout = ((n as f64 * holdout_ratio).round() as usize)
            .max(1)
            .min(n.saturating_sub(1));
        let (holdout, fit) = indices.split_at(n_holdout);

        (self.select(fit), self.select(holdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::context::Tier;
    use crate::schema::registry::SchemaRegistry;
    use crate::{Cohort, Counter, Position, StatLine, TargetMode, Venue};

    fn row(name: &str, position: Position, yards: Option<f64>) -> FeatureRow {
        let mut stats = StatLine::zeros();
        stats.set(Counter::RushingYards, yards);
        FeatureRow {
            key: PlayerKey::new(name, position),
            cohort: position.cohort(),
            week: 1,
            opponent: "KC".to_string(),
            season: stats,
            tier: Some(Tier::Top),
            venue: Some(Venue::Home),
            actual: stats,
            fantasy_points: Some(1.0),
        }
    }

    #[test]
    fn test_cohort_filter_and_exclusion() {
        let rows = vec![
            row("Breece Hall", Position::Rb, Some(50.0)),
            row("Tony Pollard", Position::Rb, None),
            row("Josh Allen", Position::Qb, Some(30.0)),
        ];
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        let set = TrainingSet::build(&rows, &schema).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.excluded, 1);
        assert_eq!(set.features.dim(), (1, schema.n_features()));
        assert_eq!(set.targets.dim(), (1, 6));
        assert_eq!(set.keys[0].short_name, "B.Hall");
    }

    #[test]
    fn test_columns_follow_schema_order() {
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        let set = TrainingSet::build(&[row("Breece Hall", Position::Rb, Some(50.0))], &schema)
            .unwrap();

        let rushing = schema
            .feature_names()
            .iter()
            .position(|n| n == "rushing_yards_season_avg")
            .unwrap();
        assert_eq!(set.features[[0, rushing]], 50.0);
        assert_eq!(set.features[[0, schema.n_features() - 2]], 2.0);
        assert_eq!(set.features[[0, schema.n_features() - 1]], 1.0);
    }

    #[test]
    fn test_missing_context_excluded() {
        let mut r = row("Breece Hall", Position::Rb, Some(50.0));
        r.venue = None;
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Fantasy);
        let set = TrainingSet::build(&[r], &schema).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.excluded, 1);
    }

    #[test]
    fn test_split_is_seeded() {
        let rows: Vec<FeatureRow> = (0..10)
            .map(|i| row("Breece Hall", Position::Rb, Some(i as f64)))
            .collect();
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Fantasy);
        let set = TrainingSet::build(&rows, &schema).unwrap();

        let (fit, holdout) = set.split(0.2, 42);
        assert_eq!(fit.len(), 8);
        assert_eq!(holdout.len(), 2);

        let (fit_again, _) = set.split(0.2, 42);
        assert_eq!(fit.features, fit_again.features);
    }
}
