//! Model inference for predictions
//!
//! Rebuilds a single feature vector for a player and an upcoming matchup,
//! strictly in the order of the schema stored with the loaded artifact.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::features::{short_name, MatchContext, PlayerProfile};
use crate::model::ModelArtifact;
use crate::schema::FeatureSource;
use crate::{Cohort, Counter, GridironError, Position, Result, TargetMode, Venue};

/// A player and the game to predict
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionQuery {
    pub player: String,
    pub opponent: String,
    /// "home" or "away", case-insensitive
    pub venue: String,
    /// Breaks ties between players sharing a short name
    pub position: Option<Position>,
}

impl PredictionQuery {
    pub fn new(player: &str, opponent: &str, venue: &str) -> Self {
        PredictionQuery {
            player: player.to_string(),
            opponent: opponent.to_string(),
            venue: venue.to_string(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionValue {
    /// Single-target model output
    Score(f64),
    /// Target name -> value, in schema order
    Counters(Vec<(String, f64)>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub player: String,
    pub short_name: String,
    pub position: Position,
    pub opponent: String,
    pub venue: Venue,
    pub value: PredictionValue,
}

/// Profile season averages plus resolved match context
struct QueryFeatures<'a> {
    profile: &'a PlayerProfile,
    context: MatchContext,
}

impl FeatureSource for QueryFeatures<'_> {
    fn season_avg(&self, counter: Counter) -> Option<f64> {
        self.profile.average(counter)
    }

    fn tier_ordinal(&self) -> Option<f64> {
        Some(self.context.tier_ordinal())
    }

    fn is_home(&self) -> Option<f64> {
        Some(self.context.is_home())
    }
}

/// Predictor over one artifact per cohort.
///
/// Holds only immutable data; safe to share across threads.
#[derive(Debug, Clone)]
pub struct Predictor {
    mode: TargetMode,
    artifacts: BTreeMap<Cohort, ModelArtifact>,
    /// Short name -> (cohort, profile index)
    players: HashMap<String, Vec<(Cohort, usize)>>,
}

impl Predictor {
    /// Load every cohort artifact for a target mode
    pub fn load<P: AsRef<Path>>(model_dir: P, mode: TargetMode) -> Result<Self> {
        let artifacts = Cohort::ALL
            .into_iter()
            .map(|cohort| {
                ModelArtifact::load(ModelArtifact::path(model_dir.as_ref(), cohort, mode), cohort)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_artifacts(artifacts)
    }

    /// Build from artifacts already in memory. All must share a target mode.
    pub fn from_artifacts(artifacts: Vec<ModelArtifact>) -> Result<Self> {
        let mode = match artifacts.first() {
            Some(a) => a.target_mode,
            None => return Err(GridironError::NoModel("no artifacts supplied".to_string())),
        };

        let mut by_cohort = BTreeMap::new();
        let mut players: HashMap<String, Vec<(Cohort, usize)>> = HashMap::new();

        for artifact in artifacts {
            artifact.verify(artifact.cohort)?;
            if artifact.target_mode != mode {
                return Err(GridironError::SchemaMismatch {
                    cohort: artifact.cohort,
                    message: format!(
                        "artifact mode {} differs from predictor mode {}",
                        artifact.target_mode, mode
                    ),
                });
            }

            for (i, profile) in artifact.profiles.iter().enumerate() {
                players
                    .entry(profile.key.short_name.clone())
                    .or_default()
                    .push((artifact.cohort, i));
            }

            let cohort = artifact.cohort;
            if by_cohort.insert(cohort, artifact).is_some() {
                return Err(GridironError::SchemaMismatch {
                    cohort,
                    message: "more than one artifact for cohort".to_string(),
                });
            }
        }

        log::debug!(
            "Predictor ready: {} mode, {} cohorts, {} player names",
            mode,
            by_cohort.len(),
            players.len()
        );

        Ok(Predictor {
            mode,
            artifacts: by_cohort,
            players,
        })
    }

    pub fn mode(&self) -> TargetMode {
        self.mode
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ModelArtifact> {
        self.artifacts.values()
    }

    fn find_player(&self, query: &PredictionQuery) -> Result<(&ModelArtifact, &PlayerProfile)> {
        let short = short_name(&query.player);
        let not_found = || GridironError::PlayerNotFound {
            name: query.player.clone(),
            short_name: short.clone(),
        };

        let matches: Vec<(&ModelArtifact, &PlayerProfile)> = self
            .players
            .get(&short)
            .into_iter()
            .flatten()
            .filter_map(|(cohort, i)| {
                let artifact = self.artifacts.get(cohort)?;
                Some((artifact, artifact.profiles.get(*i)?))
            })
            .filter(|(_, p)| query.position.map_or(true, |pos| p.key.position == pos))
            .collect();

        match matches.as_slice() {
            [] => Err(not_found()),
            [single] => Ok(*single),
            many => Err(GridironError::AmbiguousPlayer {
                short_name: short.clone(),
                positions: many.iter().map(|(_, p)| p.key.position).collect(),
            }),
        }
    }

    /// Predict one query
    pub fn predict(&self, query: &PredictionQuery) -> Result<Prediction> {
        let (artifact, profile) = self.find_player(query)?;
        let context = MatchContext::resolve(&artifact.tiers, &query.opponent, &query.venue)?;

        let schema = &artifact.schema;
        let features = schema
            .assemble(&QueryFeatures { profile, context })
            .map_err(|missing| GridironError::SchemaMismatch {
                cohort: artifact.cohort,
                message: format!("profile {} has no value for {}", profile.key, missing),
            })?;
        let output = artifact.predict_row(&features)?;

        let value = if schema.is_multi_output() {
            PredictionValue::Counters(schema.target_names().into_iter().zip(output).collect())
        } else {
            PredictionValue::Score(output[0])
        };

        Ok(Prediction {
            player: profile.display_name.clone(),
            short_name: profile.key.short_name.clone(),
            position: profile.key.position,
            opponent: query.opponent.trim().to_uppercase(),
            venue: context.venue,
            value,
        })
    }

    /// One result per query, in order
    pub fn predict_batch(&self, queries: &[PredictionQuery]) -> Vec<Result<Prediction>> {
        queries.iter().map(|q| self.predict(q)).collect()
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction) -> String {
    let mut lines = vec![
        format!("  {} ({}, {})", pred.player, pred.short_name, pred.position),
        format!("  vs {} ({})", pred.opponent, pred.venue),
    ];

    match &pred.value {
        PredictionValue::Score(score) => {
            lines.push(format!("  {:<18} {:>8.2}", "fantasy_points", score));
        }
        PredictionValue::Counters(values) => {
            for (name, value) in values {
                lines.push(format!("  {:<18} {:>8.2}", name, value));
            }
        }
    }

    let rule = "─".repeat(32);
    format!("┌{}\n{}\n└{}", rule, lines.join("\n"), rule)
}
