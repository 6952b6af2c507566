//! Box score feed import
//!
//! The feed is either a JSON array of records or newline-delimited JSON
//! objects, one per player per game. Counter fields may be numbers, numeric
//! strings, null or absent.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::{Counter, Observation, Position, Result, StatLine};

#[derive(Debug, Deserialize)]
struct FeedRecord {
    player_name: String,
    position: String,
    week: u32,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    opponent_team: Option<String>,
    #[serde(default)]
    home_away: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Result of importing a feed
#[derive(Debug, Default)]
pub struct FeedImport {
    pub observations: Vec<Observation>,
    /// Records with a position outside every cohort (K, DEF, ...)
    pub skipped_positions: usize,
    /// Records that did not match the expected shape
    pub malformed: usize,
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Venue text from `home_away`, falling back to a numeric/boolean `is_home`.
/// Anything else is left empty and later treated as missing.
fn venue_text(record: &FeedRecord) -> String {
    if let Some(text) = &record.home_away {
        return text.clone();
    }
    match record.extra.get("is_home") {
        Some(Value::Bool(true)) => "home".to_string(),
        Some(Value::Bool(false)) => "away".to_string(),
        Some(v) => match numeric(v) {
            Some(x) if x == 1.0 => "home".to_string(),
            Some(x) if x == 0.0 => "away".to_string(),
            _ => String::new(),
        },
        None => String::new(),
    }
}

fn text_field(record: &FeedRecord, name: &str) -> Option<String> {
    record
        .extra
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn to_observation(record: FeedRecord) -> Option<Observation> {
    let position = Position::parse(&record.position).ok()?;

    // Older feeds use `recent_team` / `opponent`
    let team = record
        .team
        .clone()
        .or_else(|| text_field(&record, "recent_team"))
        .unwrap_or_default();
    let opponent = record
        .opponent_team
        .clone()
        .or_else(|| text_field(&record, "opponent"))
        .unwrap_or_default();

    let mut stats = StatLine::default();
    for counter in Counter::ALL {
        stats.set(counter, record.extra.get(counter.name()).and_then(numeric));
    }

    Some(Observation {
        venue: venue_text(&record),
        player_name: record.player_name,
        position,
        week: record.week,
        team,
        opponent,
        stats,
    })
}

/// Parse feed text into observations
pub fn parse_feed(text: &str) -> Result<FeedImport> {
    let trimmed = text.trim_start();
    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<Value>(line))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut import = FeedImport::default();
    for (i, value) in values.into_iter().enumerate() {
        let record: FeedRecord = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping malformed feed record {}: {}", i, e);
                import.malformed += 1;
                continue;
            }
        };

        match to_observation(record) {
            Some(obs) => import.observations.push(obs),
            None => import.skipped_positions += 1,
        }
    }

    if import.skipped_positions > 0 {
        log::warn!(
            "Skipped {} records with positions outside QB/RB/WR/TE",
            import.skipped_positions
        );
    }

    Ok(import)
}

/// Read and parse a feed file
pub fn load_feed<P: AsRef<Path>>(path: P) -> Result<FeedImport> {
    let text = std::fs::read_to_string(path)?;
    parse_feed(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let text = r#"[
            {"player_name": "Aaron Rodgers", "position": "QB", "week": 1, "team": "NYJ",
             "opponent_team": "BUF", "home_away": "home",
             "passing_yards": 5, "passing_tds": 0, "interceptions": 0,
             "rushing_yards": 0, "rushing_tds": 0, "receptions": 0,
             "receiving_yards": 0, "receiving_tds": 0, "fumbles_lost": 0}
        ]"#;
        let import = parse_feed(text).unwrap();
        assert_eq!(import.observations.len(), 1);

        let obs = &import.observations[0];
        assert_eq!(obs.position, Position::Qb);
        assert_eq!(obs.opponent, "BUF");
        assert_eq!(obs.venue, "home");
        assert_eq!(obs.stats.get(Counter::PassingYards), Some(5.0));
        assert_eq!(obs.short_name(), "A.Rodgers");
    }

    #[test]
    fn test_parse_lines_with_loose_values() {
        let text = concat!(
            r#"{"player_name": "Breece Hall", "position": "rb", "week": 2, "recent_team": "NYJ", "opponent_team": "DAL", "is_home": 0, "rushing_yards": "12", "receptions": null, "receiving_yards": "n/a"}"#,
            "\n\n",
            r#"{"player_name": "Greg Zuerlein", "position": "K", "week": 2, "opponent_team": "DAL"}"#,
            "\n"
        );
        let import = parse_feed(text).unwrap();
        assert_eq!(import.observations.len(), 1);
        assert_eq!(import.skipped_positions, 1);

        let obs = &import.observations[0];
        assert_eq!(obs.team, "NYJ");
        assert_eq!(obs.venue, "away");
        assert_eq!(obs.stats.get(Counter::RushingYards), Some(12.0));
        assert_eq!(obs.stats.get(Counter::Receptions), None);
        assert_eq!(obs.stats.get(Counter::ReceivingYards), None);
        assert_eq!(obs.stats.get(Counter::FumblesLost), None);
    }

    #[test]
    fn test_missing_venue_left_empty() {
        let text = r#"[{"player_name": "Breece Hall", "position": "RB", "week": 3, "opponent_team": "NE"}]"#;
        let import = parse_feed(text).unwrap();
        assert_eq!(import.observations[0].venue, "");
    }

    #[test]
    fn test_malformed_record_counted() {
        let text = r#"[{"player_name": "No Week", "position": "WR", "opponent_team": "NE"}]"#;
        let import = parse_feed(text).unwrap();
        assert!(import.observations.is_empty());
        assert_eq!(import.malformed, 1);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_feed("[{").is_err());
    }
}
