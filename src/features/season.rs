//! Season-to-date aggregates
//!
//! Per-player means of every counter over all observed games in the run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::features::names::short_name;
use crate::{Counter, Observation, Position, StatLine};

/// Grouping key for season aggregates. Position breaks short-name collisions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub short_name: String,
    pub position: Position,
}

impl PlayerKey {
    pub fn new(player_name: &str, position: Position) -> Self {
        PlayerKey {
            short_name: short_name(player_name),
            position,
        }
    }

    pub fn of(obs: &Observation) -> Self {
        PlayerKey::new(&obs.player_name, obs.position)
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.short_name, self.position)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Season-average feature values for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub key: PlayerKey,
    /// Full name as last seen in the feed
    pub display_name: String,
    pub games: usize,
    pub last_week: u32,
    /// Mean per counter; missing where the counter was never reported
    pub averages: StatLine,
}

impl PlayerProfile {
    pub fn average(&self, counter: Counter) -> Option<f64> {
        self.averages.get(counter)
    }
}

/// Season averages for every player in a set of observations
#[derive(Debug, Clone, Default)]
pub struct SeasonAverages {
    profiles: BTreeMap<PlayerKey, PlayerProfile>,
}

impl SeasonAverages {
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut sums: BTreeMap<PlayerKey, ([Accumulator; 9], usize, u32, String)> =
            BTreeMap::new();

        for obs in observations {
            let entry = sums
                .entry(PlayerKey::of(obs))
                .or_insert_with(|| ([Accumulator::default(); 9], 0, 0, String::new()));

            for (i, counter) in Counter::ALL.into_iter().enumerate() {
                entry.0[i].push(obs.stats.get(counter));
            }
            entry.1 += 1;
            if obs.week >= entry.2 {
                entry.2 = obs.week;
                entry.3 = obs.player_name.clone();
            }
        }

        let profiles = sums
            .into_iter()
            .map(|(key, (acc, games, last_week, display_name))| {
                let mut averages = StatLine::default();
                for (i, counter) in Counter::ALL.into_iter().enumerate() {
                    averages.set(counter, acc[i].mean());
                }
                let profile = PlayerProfile {
                    key: key.clone(),
                    display_name,
                    games,
                    last_week,
                    averages,
                };
                (key, profile)
            })
            .collect();

        SeasonAverages { profiles }
    }

    pub fn get(&self, key: &PlayerKey) -> Option<&PlayerProfile> {
        self.profiles.get(key)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &PlayerProfile> {
        self.profiles.values()
    }

    pub fn into_profiles(self) -> Vec<PlayerProfile> {
        self.profiles.into_values().collect()
    }
}
