//! Cohort model training
//!
//! One batch fit per cohort over the full observation history. Every cohort
//! is fit before anything is written, so a failed run never leaves a partial
//! set of artifacts behind.

use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::features::{FeatureEngineer, FeatureRow, PlayerKey, PlayerProfile, TierTable};
use crate::model::artifact::{ModelArtifact, FORMAT_VERSION};
use crate::schema::registry::SchemaRegistry;
use crate::training::dataset::TrainingSet;
use crate::training::metrics::HoldoutMetrics;
use crate::{Cohort, Config, GridironError, Observation, Result, TargetMode, TrainingConfig};

/// Fits one model per cohort and packages it as an artifact
pub struct ModelTrainer {
    engineer: FeatureEngineer,
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(engineer: FeatureEngineer, config: TrainingConfig) -> Self {
        ModelTrainer { engineer, config }
    }

    pub fn from_config(config: &Config) -> Self {
        let engineer = FeatureEngineer::new(TierTable::new(&config.tiers.teams), config.scoring);
        ModelTrainer::new(engineer, config.training.clone())
    }

    /// Fit the cohort model on prepared rows
    pub fn train_cohort(
        &self,
        rows: &[FeatureRow],
        profiles: &[PlayerProfile],
        cohort: Cohort,
        mode: TargetMode,
    ) -> Result<ModelArtifact> {
        let schema = SchemaRegistry::schema(cohort, mode);
        let set = TrainingSet::build(rows, &schema)?;

        if set.is_empty() {
            return Err(GridironError::EmptyTrainingSet {
                cohort,
                excluded: set.excluded,
            });
        }

        let params = self.config.cohort(cohort);
        let estimator = params.estimator();
        log::info!(
            "Training {} {} model on {} rows with {}",
            cohort,
            mode,
            set.len(),
            estimator.describe()
        );

        let metrics = self.evaluate_holdout(&set)?;

        let model = estimator.fit(set.features.view(), set.targets.view())?;
        schema.check_width("fitted model", model.n_features(), model.n_targets())?;

        let players: BTreeSet<&PlayerKey> = set.keys.iter().collect();
        let profiles = profiles
            .iter()
            .filter(|p| players.contains(&p.key))
            .cloned()
            .collect::<Vec<_>>();
        log::info!("{} cohort: {} players with profiles", cohort, profiles.len());

        Ok(ModelArtifact {
            format_version: FORMAT_VERSION,
            cohort,
            target_mode: mode,
            schema,
            tiers: self.engineer.tiers().clone(),
            estimator: estimator.describe(),
            model,
            profiles,
            metrics,
            trained_at: Utc::now(),
            rows_used: set.len(),
            rows_excluded: set.excluded,
        })
    }

    /// Fit a throwaway model on part of the set and score the rest
    fn evaluate_holdout(&self, set: &TrainingSet) -> Result<Option<HoldoutMetrics>> {
        if self.config.holdout_ratio <= 0.0 || set.len() < 5 {
            return Ok(None);
        }

        let (fit, holdout) = set.split(self.config.holdout_ratio, self.config.seed);
        let estimator = self.config.cohort(set.schema.cohort).estimator();
        let model = estimator.fit(fit.features.view(), fit.targets.view())?;

        let predicted = model.predict(holdout.features.view());
        let metrics = HoldoutMetrics::evaluate(
            &set.schema.target_names(),
            predicted.view(),
            holdout.targets.view(),
        );
        log::info!("{} cohort: {}", set.schema.cohort, metrics);
        Ok(Some(metrics))
    }

    /// Fit every cohort. Fails as a whole if any cohort fails.
    pub fn train_all(
        &self,
        observations: &[Observation],
        mode: TargetMode,
    ) -> Result<Vec<ModelArtifact>> {
        let rows = self.engineer.build_rows(observations);
        let profiles = self.engineer.player_profiles(observations);

        Cohort::ALL
            .into_iter()
            .map(|cohort| self.train_cohort(&rows, &profiles, cohort, mode))
            .collect()
    }

    /// Write artifacts once all of them exist
    pub fn persist_all<P: AsRef<Path>>(
        artifacts: &[ModelArtifact],
        model_dir: P,
    ) -> Result<Vec<PathBuf>> {
        artifacts
            .iter()
            .map(|artifact| artifact.save(model_dir.as_ref()))
            .collect()
    }
}
