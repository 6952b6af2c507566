//! SQLite storage for per-player-per-week observations

use crate::features::names::short_name;
use crate::{Counter, GridironError, Observation, Position, Result, StatLine};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SELECT_COLUMNS: &str = "player_name, position, week, team, opponent, venue,
    passing_yards, passing_tds, interceptions, rushing_yards, rushing_tds,
    receptions, receiving_yards, receiving_tds, fumbles_lost";

/// Observation store for one training run
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = RecordStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = RecordStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_name TEXT NOT NULL,
                short_name TEXT NOT NULL,
                position TEXT NOT NULL,
                week INTEGER NOT NULL,
                team TEXT NOT NULL,
                opponent TEXT NOT NULL,
                venue TEXT NOT NULL,
                passing_yards REAL,
                passing_tds REAL,
                interceptions REAL,
                rushing_yards REAL,
                rushing_tds REAL,
                receptions REAL,
                receiving_yards REAL,
                receiving_tds REAL,
                fumbles_lost REAL,
                UNIQUE(player_name, position, week, team)
            );

            CREATE INDEX IF NOT EXISTS idx_observations_short_name ON observations(short_name);
            CREATE INDEX IF NOT EXISTS idx_observations_week ON observations(week);
            "#,
        )?;
        Ok(())
    }

    /// Insert an observation, replacing any earlier copy of the same game line
    pub fn upsert_observation(&self, obs: &Observation) -> Result<()> {
        Self::upsert_with(&self.conn, obs)
    }

    /// Insert many observations in one transaction
    pub fn upsert_observations(&self, observations: &[Observation]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        for obs in observations {
            Self::upsert_with(&tx, obs)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    fn upsert_with(conn: &Connection, obs: &Observation) -> Result<()> {
        let s = &obs.stats;
        conn.execute(
            r#"
            INSERT INTO observations (player_name, short_name, position, week, team,
                                      opponent, venue,
                                      passing_yards, passing_tds, interceptions,
                                      rushing_yards, rushing_tds, receptions,
                                      receiving_yards, receiving_tds, fumbles_lost)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(player_name, position, week, team) DO UPDATE SET
                short_name = excluded.short_name,
                opponent = excluded.opponent,
                venue = excluded.venue,
                passing_yards = excluded.passing_yards,
                passing_tds = excluded.passing_tds,
                interceptions = excluded.interceptions,
                rushing_yards = excluded.rushing_yards,
                rushing_tds = excluded.rushing_tds,
                receptions = excluded.receptions,
                receiving_yards = excluded.receiving_yards,
                receiving_tds = excluded.receiving_tds,
                fumbles_lost = excluded.fumbles_lost
            "#,
            params![
                obs.player_name,
                short_name(&obs.player_name),
                obs.position.code(),
                obs.week,
                obs.team,
                obs.opponent,
                obs.venue,
                s.passing_yards,
                s.passing_tds,
                s.interceptions,
                s.rushing_yards,
                s.rushing_tds,
                s.receptions,
                s.receiving_yards,
                s.receiving_tds,
                s.fumbles_lost,
            ],
        )?;
        Ok(())
    }

    /// Every observation, ordered by week then player
    pub fn all_observations(&self) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM observations ORDER BY week, player_name, position",
            SELECT_COLUMNS
        ))?;

        let observations = stmt
            .query_map([], Self::row_to_observation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(observations)
    }

    /// Observations whose player name normalizes to the given short name
    pub fn player_observations(&self, name: &str) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM observations WHERE short_name = ?1 ORDER BY week",
            SELECT_COLUMNS
        ))?;

        let observations = stmt
            .query_map(params![short_name(name)], Self::row_to_observation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(observations)
    }

    fn row_to_observation(row: &rusqlite::Row) -> rusqlite::Result<Observation> {
        let position_code: String = row.get(1)?;
        let position = Position::parse(&position_code)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let mut stats = StatLine::default();
        for (i, counter) in Counter::ALL.into_iter().enumerate() {
            stats.set(counter, row.get(6 + i)?);
        }

        Ok(Observation {
            player_name: row.get(0)?,
            position,
            week: row.get(2)?,
            team: row.get(3)?,
            opponent: row.get(4)?,
            venue: row.get(5)?,
            stats,
        })
    }

    // ==================== Statistics ====================

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let observation_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;

        let player_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT short_name, position FROM observations)",
            [],
            |row| row.get(0),
        )?;

        let week_range: Option<(Option<u32>, Option<u32>)> = self
            .conn
            .query_row("SELECT MIN(week), MAX(week) FROM observations", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        let (first_week, last_week) = week_range.unwrap_or((None, None));

        Ok(StoreStats {
            observation_count: observation_count as usize,
            player_count: player_count as usize,
            first_week,
            last_week,
        })
    }

    /// Remove every observation
    pub fn clear(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM observations", [])
            .map_err(GridironError::from)
    }
}

/// Store statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub observation_count: usize,
    pub player_count: usize,
    pub first_week: Option<u32>,
    pub last_week: Option<u32>,
}
