//! NFL player projections from season averages and matchup context
//!
//! Per-game box score rows are reduced to season-average features, joined with
//! the opponent's defensive tier and home/away flag, and fed to one regression
//! model per position cohort. Each trained model is persisted together with
//! the schema it was fit against so prediction always rebuilds the exact
//! feature vector the model expects.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod schema;
pub mod training;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::features::context::Tier;
use crate::features::scoring::ScoringRules;
use crate::model::forest::ForestParams;
use crate::model::mlp::MlpParams;
use crate::model::Estimator;

/// Player position as reported by the box score feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Qb,
    #[serde(rename = "RB")]
    Rb,
    #[serde(rename = "WR")]
    Wr,
    #[serde(rename = "TE")]
    Te,
}

impl Position {
    pub fn code(&self) -> &'static str {
        match self {
            Position::Qb => "QB",
            Position::Rb => "RB",
            Position::Wr => "WR",
            Position::Te => "TE",
        }
    }

    pub fn parse(code: &str) -> Result<Self> {
        match code.trim().to_uppercase().as_str() {
            "QB" => Ok(Position::Qb),
            "RB" => Ok(Position::Rb),
            "WR" => Ok(Position::Wr),
            "TE" => Ok(Position::Te),
            _ => Err(GridironError::UnknownPosition(code.to_string())),
        }
    }

    /// The cohort whose schema applies to this position
    pub fn cohort(&self) -> Cohort {
        match self {
            Position::Qb => Cohort::Qb,
            Position::Rb | Position::Wr | Position::Te => Cohort::Skill,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Group of positions sharing one feature/target schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    Qb,
    Skill,
}

impl Cohort {
    pub const ALL: [Cohort; 2] = [Cohort::Qb, Cohort::Skill];

    pub fn name(&self) -> &'static str {
        match self {
            Cohort::Qb => "qb",
            Cohort::Skill => "skill",
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.cohort() == *self
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Home or away for the player's team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

impl Venue {
    /// Case-insensitive; only "home" and "away" are accepted
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim().to_lowercase().as_str() {
            "home" => Ok(Venue::Home),
            "away" => Ok(Venue::Away),
            _ => Err(GridironError::InvalidVenue(text.to_string())),
        }
    }

    /// Numeric encoding used as the `is_home` feature
    pub fn flag(&self) -> f64 {
        match self {
            Venue::Home => 1.0,
            Venue::Away => 0.0,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "home"),
            Venue::Away => write!(f, "away"),
        }
    }
}

/// Per-game performance counters, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    PassingYards,
    PassingTds,
    Interceptions,
    RushingYards,
    RushingTds,
    Receptions,
    ReceivingYards,
    ReceivingTds,
    FumblesLost,
}

impl Counter {
    pub const ALL: [Counter; 9] = [
        Counter::PassingYards,
        Counter::PassingTds,
        Counter::Interceptions,
        Counter::RushingYards,
        Counter::RushingTds,
        Counter::Receptions,
        Counter::ReceivingYards,
        Counter::ReceivingTds,
        Counter::FumblesLost,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Counter::PassingYards => "passing_yards",
            Counter::PassingTds => "passing_tds",
            Counter::Interceptions => "interceptions",
            Counter::RushingYards => "rushing_yards",
            Counter::RushingTds => "rushing_tds",
            Counter::Receptions => "receptions",
            Counter::ReceivingYards => "receiving_yards",
            Counter::ReceivingTds => "receiving_tds",
            Counter::FumblesLost => "fumbles_lost",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Passing-only counters. Never part of a skill-position schema.
    pub fn is_passing(&self) -> bool {
        matches!(
            self,
            Counter::PassingYards | Counter::PassingTds | Counter::Interceptions
        )
    }

    /// Counters modelled for a cohort, in canonical order
    pub fn for_cohort(cohort: Cohort) -> Vec<Counter> {
        Self::ALL
            .into_iter()
            .filter(|c| cohort == Cohort::Qb || !c.is_passing())
            .collect()
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One value per counter; `None` marks a value missing from the feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub passing_yards: Option<f64>,
    pub passing_tds: Option<f64>,
    pub interceptions: Option<f64>,
    pub rushing_yards: Option<f64>,
    pub rushing_tds: Option<f64>,
    pub receptions: Option<f64>,
    pub receiving_yards: Option<f64>,
    pub receiving_tds: Option<f64>,
    pub fumbles_lost: Option<f64>,
}

impl StatLine {
    pub fn get(&self, counter: Counter) -> Option<f64> {
        match counter {
            Counter::PassingYards => self.passing_yards,
            Counter::PassingTds => self.passing_tds,
            Counter::Interceptions => self.interceptions,
            Counter::RushingYards => self.rushing_yards,
            Counter::RushingTds => self.rushing_tds,
            Counter::Receptions => self.receptions,
            Counter::ReceivingYards => self.receiving_yards,
            Counter::ReceivingTds => self.receiving_tds,
            Counter::FumblesLost => self.fumbles_lost,
        }
    }

    pub fn set(&mut self, counter: Counter, value: Option<f64>) {
        let slot = match counter {
            Counter::PassingYards => &mut self.passing_yards,
            Counter::PassingTds => &mut self.passing_tds,
            Counter::Interceptions => &mut self.interceptions,
            Counter::RushingYards => &mut self.rushing_yards,
            Counter::RushingTds => &mut self.rushing_tds,
            Counter::Receptions => &mut self.receptions,
            Counter::ReceivingYards => &mut self.receiving_yards,
            Counter::ReceivingTds => &mut self.receiving_tds,
            Counter::FumblesLost => &mut self.fumbles_lost,
        };
        *slot = value;
    }

    /// Builder-style setter
    pub fn with(mut self, counter: Counter, value: f64) -> Self {
        self.set(counter, Some(value));
        self
    }

    /// All counters set to zero
    pub fn zeros() -> Self {
        Counter::ALL
            .into_iter()
            .fold(StatLine::default(), |line, c| line.with(c, 0.0))
    }
}

/// One player's box score line for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub player_name: String,
    pub position: Position,
    pub week: u32,
    pub team: String,
    pub opponent: String,
    /// Raw venue indicator as supplied by the feed
    pub venue: String,
    pub stats: StatLine,
}

impl Observation {
    pub fn short_name(&self) -> String {
        features::names::short_name(&self.player_name)
    }

    pub fn cohort(&self) -> Cohort {
        self.position.cohort()
    }
}

/// What a cohort model predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// One output per counter in the cohort
    Counters,
    /// A single derived fantasy score
    Fantasy,
}

impl TargetMode {
    pub fn name(&self) -> &'static str {
        match self {
            TargetMode::Counters => "counters",
            TargetMode::Fantasy => "fantasy",
        }
    }
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "counters" => Ok(TargetMode::Counters),
            "fantasy" => Ok(TargetMode::Fantasy),
            _ => Err(format!("Unknown mode: {}. Use counters or fantasy.", s)),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("Unknown opponent: {0} has no defensive tier")]
    UnknownOpponent(String),

    #[error("Player not found: {name} (looked up as {short_name})")]
    PlayerNotFound { name: String, short_name: String },

    #[error("Ambiguous player {short_name}: matches positions {positions:?}, pass a position")]
    AmbiguousPlayer {
        short_name: String,
        positions: Vec<Position>,
    },

    #[error("Schema mismatch for {cohort}: {message}")]
    SchemaMismatch { cohort: Cohort, message: String },

    #[error("Invalid venue '{0}': expected home or away")]
    InvalidVenue(String),

    #[error("Unknown position: {0}")]
    UnknownPosition(String),

    #[error("Unknown tier label: {0}")]
    UnknownTier(String),

    #[error("No complete training rows for cohort {cohort} ({excluded} excluded)")]
    EmptyTrainingSet { cohort: Cohort, excluded: usize },

    #[error("No model artifact at {0} - run `gridiron train` first")]
    NoModel(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from config.toml
///
/// Every section and field falls back to its default, so a file may set
/// only what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub tiers: TierConfig,
    pub scoring: ScoringRules,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub database_path: String,
    pub model_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/gridiron.db".to_string(),
            model_dir: "model".to_string(),
        }
    }
}

/// Opponent team code -> defensive tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub teams: BTreeMap<String, Tier>,
}

impl Default for TierConfig {
    fn default() -> Self {
        TierConfig {
            teams: features::context::default_tier_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for error reporting (0 disables)
    pub holdout_ratio: f64,
    /// Seed for the hold-out shuffle
    pub seed: u64,
    pub qb: CohortParams,
    #[serde(default = "CohortParams::skill_default")]
    pub skill: CohortParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            holdout_ratio: 0.2,
            seed: 42,
            qb: CohortParams::default(),
            skill: CohortParams::skill_default(),
        }
    }
}

impl TrainingConfig {
    pub fn cohort(&self, cohort: Cohort) -> &CohortParams {
        match cohort {
            Cohort::Qb => &self.qb,
            Cohort::Skill => &self.skill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Forest,
    Mlp,
}

/// Hyperparameters for one cohort's model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortParams {
    #[serde(default = "CohortParams::default_estimator")]
    pub estimator: EstimatorKind,
    #[serde(default)]
    pub forest: ForestParams,
    #[serde(default)]
    pub mlp: MlpParams,
}

impl Default for CohortParams {
    fn default() -> Self {
        CohortParams {
            estimator: EstimatorKind::Forest,
            forest: ForestParams::default(),
            mlp: MlpParams::default(),
        }
    }
}

impl CohortParams {
    /// Smaller, shallower ensemble for the larger and noisier skill sample
    pub fn skill_default() -> Self {
        CohortParams {
            forest: ForestParams {
                n_estimators: 30,
                max_depth: Some(8),
                ..ForestParams::default()
            },
            ..CohortParams::default()
        }
    }

    fn default_estimator() -> EstimatorKind {
        EstimatorKind::Forest
    }

    pub fn estimator(&self) -> &dyn Estimator {
        match self.estimator {
            EstimatorKind::Forest => &self.forest,
            EstimatorKind::Mlp => &self.mlp,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GridironError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridironError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parse() {
        assert_eq!(Position::parse("qb").unwrap(), Position::Qb);
        assert_eq!(Position::parse(" WR ").unwrap(), Position::Wr);
        assert!(matches!(
            Position::parse("K"),
            Err(GridironError::UnknownPosition(_))
        ));
    }

    #[test]
    fn test_position_cohorts() {
        assert_eq!(Position::Qb.cohort(), Cohort::Qb);
        for p in [Position::Rb, Position::Wr, Position::Te] {
            assert_eq!(p.cohort(), Cohort::Skill);
            assert!(Cohort::Skill.contains(p));
            assert!(!Cohort::Qb.contains(p));
        }
    }

    #[test]
    fn test_venue_parse_is_case_insensitive() {
        assert_eq!(Venue::parse("HOME").unwrap(), Venue::Home);
        assert_eq!(Venue::parse(" Away").unwrap(), Venue::Away);
        assert_eq!(Venue::Home.flag(), 1.0);
        assert_eq!(Venue::Away.flag(), 0.0);
    }

    #[test]
    fn test_venue_rejects_unknown_text() {
        assert!(matches!(
            Venue::parse("neutral"),
            Err(GridironError::InvalidVenue(_))
        ));
        assert!(matches!(Venue::parse(""), Err(GridironError::InvalidVenue(_))));
    }

    #[test]
    fn test_skill_counters_exclude_passing() {
        let counters = Counter::for_cohort(Cohort::Skill);
        assert_eq!(counters.len(), 6);
        assert!(counters.iter().all(|c| !c.is_passing()));
        assert_eq!(Counter::for_cohort(Cohort::Qb), Counter::ALL.to_vec());
    }

    #[test]
    fn test_stat_line_get_set() {
        let mut line = StatLine::default().with(Counter::Receptions, 7.0);
        assert_eq!(line.get(Counter::Receptions), Some(7.0));
        assert_eq!(line.get(Counter::RushingYards), None);
        line.set(Counter::Receptions, None);
        assert_eq!(line.get(Counter::Receptions), None);
    }

    #[test]
    fn test_counter_names_round_trip() {
        for c in Counter::ALL {
            assert_eq!(Counter::from_name(c.name()), Some(c));
        }
        assert_eq!(Counter::from_name("sacks"), None);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.training.qb.forest.n_estimators, 100);
        assert_eq!(parsed.training.qb.forest.max_depth, None);
        assert_eq!(parsed.training.skill.forest.max_depth, Some(8));
        assert_eq!(parsed.tiers.teams.get("KC"), Some(&Tier::Top));
        assert_eq!(parsed.tiers.teams.len(), 32);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let text = r#"
            [tiers.teams]
            KC = "top"
            NYJ = "low"

            [training.skill]
            estimator = "mlp"
        "#;
        let config: Config = toml::from_str(text).unwrap();

        assert_eq!(config.tiers.teams.len(), 2);
        assert_eq!(config.tiers.teams.get("NYJ"), Some(&Tier::Bottom));
        assert_eq!(config.data.model_dir, "model");
        assert_eq!(config.scoring, ScoringRules::default());
        assert_eq!(config.training.holdout_ratio, 0.2);
        assert_eq!(config.training.qb.estimator, EstimatorKind::Forest);
        assert_eq!(config.training.skill.estimator, EstimatorKind::Mlp);
        assert_eq!(config.training.skill.mlp, MlpParams::default());
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.training.skill.forest.max_depth, Some(8));
        assert_eq!(config.tiers.teams.len(), 32);
    }
}
