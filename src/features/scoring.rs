//! Fantasy point scoring

use serde::{Deserialize, Serialize};

use crate::{Cohort, Counter, StatLine};

/// Points awarded per unit of each counter (PPR by default)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    pub passing_yards: f64,
    pub passing_tds: f64,
    pub interceptions: f64,
    pub rushing_yards: f64,
    pub rushing_tds: f64,
    pub receptions: f64,
    pub receiving_yards: f64,
    pub receiving_tds: f64,
    pub fumbles_lost: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        ScoringRules {
            passing_yards: 1.0 / 25.0,
            passing_tds: 4.0,
            interceptions: -2.0,
            rushing_yards: 1.0 / 10.0,
            rushing_tds: 6.0,
            receptions: 1.0,
            receiving_yards: 1.0 / 10.0,
            receiving_tds: 6.0,
            fumbles_lost: -2.0,
        }
    }
}

impl ScoringRules {
    pub fn weight(&self, counter: Counter) -> f64 {
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

    /// Fantasy points for one game, summed over the counters modelled for the
    /// cohort. Counters outside the cohort score nothing even when absent;
    /// `None` if a cohort counter is missing.
    pub fn score(&self, stats: &StatLine, cohort: Cohort) -> Option<f64> {
        Counter::for_cohort(cohort)
            .into_iter()
            .map(|c| stats.get(c).map(|v| v * self.weight(c)))
            .sum()
    }
}
