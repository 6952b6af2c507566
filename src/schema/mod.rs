//! Feature and target schemas
//!
//! A [`Schema`] is the ordered contract between training and prediction for
//! one cohort. Both sides build vectors through [`Schema::assemble`], and the
//! schema used at fit time is persisted with the model.

pub mod registry;

pub use registry::SchemaRegistry;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{Cohort, Counter, GridironError, Result, TargetMode};

/// A single model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Feature {
    SeasonAvg(Counter),
    OpponentTier,
    IsHome,
}

impl Feature {
    pub fn name(&self) -> String {
        match self {
            Feature::SeasonAvg(c) => format!("{}_season_avg", c.name()),
            Feature::OpponentTier => "opponent_defense_tier".to_string(),
            Feature::IsHome => "is_home".to_string(),
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "opponent_defense_tier" => Ok(Feature::OpponentTier),
            "is_home" => Ok(Feature::IsHome),
            other => other
                .strip_suffix("_season_avg")
                .and_then(Counter::from_name)
                .map(Feature::SeasonAvg)
                .ok_or_else(|| GridironError::Parse(format!("unknown feature name: {}", name))),
        }
    }

    /// Read this feature's value; `None` when the source lacks it
    pub fn extract<S: FeatureSource + ?Sized>(&self, source: &S) -> Option<f64> {
        match self {
            Feature::SeasonAvg(c) => source.season_avg(*c),
            Feature::OpponentTier => source.tier_ordinal(),
            Feature::IsHome => source.is_home(),
        }
    }

    /// Passing-specific features are banned from skill-position schemas
    pub fn is_passing(&self) -> bool {
        matches!(self, Feature::SeasonAvg(c) if c.is_passing())
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Feature> for String {
    fn from(feature: Feature) -> String {
        feature.name()
    }
}

impl TryFrom<String> for Feature {
    type Error = GridironError;

    fn try_from(name: String) -> Result<Self> {
        Feature::parse(&name)
    }
}

/// A single model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Target {
    Counter(Counter),
    FantasyPoints,
}

impl Target {
    pub fn name(&self) -> String {
        match self {
            Target::Counter(c) => c.name().to_string(),
            Target::FantasyPoints => "fantasy_points".to_string(),
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        if name == "fantasy_points" {
            return Ok(Target::FantasyPoints);
        }
        Counter::from_name(name)
            .map(Target::Counter)
            .ok_or_else(|| GridironError::Parse(format!("unknown target name: {}", name)))
    }

    pub fn extract<S: TargetSource + ?Sized>(&self, source: &S) -> Option<f64> {
        match self {
            Target::Counter(c) => source.actual(*c),
            Target::FantasyPoints => source.fantasy_points(),
        }
    }

    pub fn is_passing(&self) -> bool {
        matches!(self, Target::Counter(c) if c.is_passing())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Target> for String {
    fn from(target: Target) -> String {
        target.name()
    }
}

impl TryFrom<String> for Target {
    type Error = GridironError;

    fn try_from(name: String) -> Result<Self> {
        Target::parse(&name)
    }
}

/// Anything that can supply feature values: training rows and prediction
/// queries alike.
pub trait FeatureSource {
    fn season_avg(&self, counter: Counter) -> Option<f64>;
    fn tier_ordinal(&self) -> Option<f64>;
    fn is_home(&self) -> Option<f64>;
}

/// Anything that can supply observed target values
pub trait TargetSource {
    fn actual(&self, counter: Counter) -> Option<f64>;
    fn fantasy_points(&self) -> Option<f64>;
}

/// Ordered feature and target lists for one cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub cohort: Cohort,
    pub mode: TargetMode,
    pub features: Vec<Feature>,
    pub targets: Vec<Target>,
}

impl Schema {
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    pub fn n_targets(&self) -> usize {
        self.targets.len()
    }

    /// More than one target means one fit predicts the full target vector
    pub fn is_multi_output(&self) -> bool {
        self.targets.len() > 1
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name()).collect()
    }

    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name()).collect()
    }

    /// Build a feature vector in schema order.
    ///
    /// Returns the first feature the source cannot supply on failure.
    pub fn assemble<S: FeatureSource + ?Sized>(
        &self,
        source: &S,
    ) -> std::result::Result<Vec<f64>, Feature> {
        self.features
            .iter()
            .map(|f| f.extract(source).ok_or(*f))
            .collect()
    }

    /// Build a target vector in schema order; `None` if any target is missing
    pub fn extract_targets<S: TargetSource + ?Sized>(&self, source: &S) -> Option<Vec<f64>> {
        self.targets.iter().map(|t| t.extract(source)).collect()
    }

    /// Structural checks run before fitting and after loading an artifact
    pub fn validate(&self) -> Result<()> {
        let fail = |message: String| {
            Err(GridironError::SchemaMismatch {
                cohort: self.cohort,
                message,
            })
        };

        if self.features.is_empty() {
            return fail("schema has no features".to_string());
        }
        if self.targets.is_empty() {
            return fail("schema has no targets".to_string());
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.features.iter().find(|f| !seen.insert(**f)) {
            return fail(format!("duplicate feature {}", dup));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.targets.iter().find(|t| !seen.insert(**t)) {
            return fail(format!("duplicate target {}", dup));
        }

        if self.cohort == Cohort::Skill {
            if let Some(f) = self.features.iter().find(|f| f.is_passing()) {
                return fail(format!("passing feature {} in skill schema", f));
            }
            if let Some(t) = self.targets.iter().find(|t| t.is_passing()) {
                return fail(format!("passing target {} in skill schema", t));
            }
        }

        match (self.mode, self.targets.as_slice()) {
            (TargetMode::Fantasy, [Target::FantasyPoints]) => {}
            (TargetMode::Fantasy, _) => {
                return fail("fantasy schema must have the single target fantasy_points".into())
            }
            (TargetMode::Counters, targets) => {
                if targets.contains(&Target::FantasyPoints) {
                    return fail("counter schema cannot target fantasy_points".to_string());
                }
            }
        }

        Ok(())
    }

    /// Check a vector or model width against this schema
    pub fn check_width(&self, what: &str, n_features: usize, n_targets: usize) -> Result<()> {
        if n_features != self.n_features() || n_targets != self.n_targets() {
            return Err(GridironError::SchemaMismatch {
                cohort: self.cohort,
                message: format!(
                    "{} has {} inputs / {} outputs, schema declares {} / {}",
                    what,
                    n_features,
                    n_targets,
                    self.n_features(),
                    self.n_targets()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl FeatureSource for Fixed {
        fn season_avg(&self, counter: Counter) -> Option<f64> {
            Some(Counter::ALL.iter().position(|c| *c == counter).unwrap() as f64)
        }
        fn tier_ordinal(&self) -> Option<f64> {
            Some(100.0)
        }
        fn is_home(&self) -> Option<f64> {
            None
        }
    }

    #[test]
    fn test_feature_names_round_trip() {
        for f in SchemaRegistry::schema(Cohort::Qb, TargetMode::Counters).features {
            assert_eq!(Feature::parse(&f.name()).unwrap(), f);
        }
        assert!(Feature::parse("yards_after_catch_season_avg").is_err());
    }

    #[test]
    fn test_target_names_round_trip() {
        assert_eq!(Target::parse("fantasy_points").unwrap(), Target::FantasyPoints);
        assert_eq!(
            Target::parse("receptions").unwrap(),
            Target::Counter(Counter::Receptions)
        );
        assert!(Target::parse("sacks").is_err());
    }

    #[test]
    fn test_assemble_reports_missing_feature() {
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        assert_eq!(schema.assemble(&Fixed), Err(Feature::IsHome));
    }

    #[test]
    fn test_validate_rejects_passing_in_skill() {
        let mut schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        schema.features.insert(0, Feature::SeasonAvg(Counter::PassingYards));
        assert!(matches!(
            schema.validate(),
            Err(GridironError::SchemaMismatch { .. })
        ));

        let mut schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        schema.targets.push(Target::Counter(Counter::Interceptions));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut schema = SchemaRegistry::schema(Cohort::Qb, TargetMode::Counters);
        schema.features.push(Feature::IsHome);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_fantasy_target() {
        let mut schema = SchemaRegistry::schema(Cohort::Qb, TargetMode::Fantasy);
        assert!(schema.validate().is_ok());
        schema.targets.push(Target::Counter(Counter::Receptions));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_check_width() {
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Counters);
        assert!(schema.check_width("model", 8, 6).is_ok());
        assert!(matches!(
            schema.check_width("model", 9, 6),
            Err(GridironError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_schema_serializes_names() {
        let schema = SchemaRegistry::schema(Cohort::Skill, TargetMode::Fantasy);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"rushing_yards_season_avg\""));
        assert!(json.contains("\"fantasy_points\""));

        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
