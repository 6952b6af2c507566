//! Persisted model artifacts
//!
//! One JSON file per cohort and target mode holding the fitted model together
//! with the schema, tier table and player profiles it was trained with. A
//! predictor loaded in a later process needs nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::features::{PlayerProfile, TierTable};
use crate::model::TrainedModel;
use crate::schema::Schema;
use crate::training::metrics::HoldoutMetrics;
use crate::{Cohort, GridironError, Result, TargetMode};

/// Bumped whenever the on-disk layout changes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub cohort: Cohort,
    pub target_mode: TargetMode,
    pub schema: Schema,
    pub tiers: TierTable,
    /// Estimator description, e.g. "forest(100 trees, unlimited depth)"
    pub estimator: String,
    pub model: TrainedModel,
    /// Season averages of every player with a training row in this cohort
    pub profiles: Vec<PlayerProfile>,
    pub metrics: Option<HoldoutMetrics>,
    pub trained_at: DateTime<Utc>,
    pub rows_used: usize,
    pub rows_excluded: usize,
}

impl ModelArtifact {
    pub fn file_name(cohort: Cohort, mode: TargetMode) -> String {
        format!("{}_{}.json", cohort.name(), mode.name())
    }

    pub fn path<P: AsRef<Path>>(dir: P, cohort: Cohort, mode: TargetMode) -> PathBuf {
        dir.as_ref().join(Self::file_name(cohort, mode))
    }

    /// Write atomically: a temp file in the target directory is renamed over
    /// the final path once fully flushed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = Self::path(dir, self.cohort, self.target_mode);

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| GridironError::Io(e.error))?;

        log::info!("Saved {} {} model to {}", self.cohort, self.target_mode, path.display());
        Ok(path)
    }

    /// Load and verify an artifact for the given cohort
    pub fn load<P: AsRef<Path>>(path: P, cohort: Cohort) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GridironError::NoModel(path.display().to_string()));
        }

        let file = File::open(path)?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))?;
        artifact.verify(cohort)?;

        log::debug!(
            "Loaded {} artifact from {} ({} profiles)",
            cohort,
            path.display(),
            artifact.profiles.len()
        );
        Ok(artifact)
    }

    /// Run the model on one assembled feature vector
    pub fn predict_row(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.model.n_features() {
            return Err(GridironError::SchemaMismatch {
                cohort: self.cohort,
                message: format!(
                    "feature vector has {} values, model expects {}",
                    features.len(),
                    self.model.n_features()
                ),
            });
        }

        let output = self.model.predict_row(features);
        self.schema
            .check_width("model output", features.len(), output.len())?;
        Ok(output)
    }

    /// Consistency checks between the stored cohort, schema and model
    pub fn verify(&self, cohort: Cohort) -> Result<()> {
        let mismatch = |message: String| Err(GridironError::SchemaMismatch { cohort, message });

        if self.format_version != FORMAT_VERSION {
            return mismatch(format!(
                "artifact format {} is not supported (expected {})",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.cohort != cohort {
            return mismatch(format!("artifact was trained for cohort {}", self.cohort));
        }
        if self.schema.cohort != cohort {
            return mismatch(format!("artifact schema belongs to cohort {}", self.schema.cohort));
        }
        if self.schema.mode != self.target_mode {
            return mismatch(format!(
                "artifact schema mode {} differs from artifact mode {}",
                self.schema.mode, self.target_mode
            ));
        }

        self.schema.validate()?;
        self.schema
            .check_width("model", self.model.n_features(), self.model.n_targets())?;
        match self.model.check_structure() {
            Ok(()) => Ok(()),
            Err(message) => mismatch(format!(
                "{} model is malformed: {}",
                self.model.kind(),
                message
            )),
        }
    }
}
