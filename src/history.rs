use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, SecondsFormat};
use log::debug;
use rusqlite::{params, Connection};
use serde::Serialize;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        finished_at TEXT NOT NULL,
        pack_id TEXT NOT NULL,
        mode_id TEXT NOT NULL,
        score INTEGER NOT NULL,
        completed_commands INTEGER NOT NULL,
        errors INTEGER NOT NULL,
        hints INTEGER NOT NULL,
        accuracy INTEGER NOT NULL,
        wpm INTEGER NOT NULL,
        elapsed_seconds REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS command_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
        command_id TEXT NOT NULL,
        command TEXT NOT NULL,
        errors INTEGER NOT NULL,
        duration_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_runs_finished_at ON runs(finished_at);
    CREATE INDEX IF NOT EXISTS idx_command_results_command ON command_results(command);
"#;

/// Summary of one finished scored run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub finished_at: DateTime<Local>,
    pub pack_id: String,
    pub mode_id: String,
    pub score: u64,
    pub completed_commands: u32,
    pub errors: u32,
    pub hints: u32,
    pub accuracy: u32,
    pub wpm: u32,
    pub elapsed_seconds: f64,
}

/// One command typed to completion during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command_id: String,
    pub command: String,
    pub errors: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub id: i64,
    pub run: RunRecord,
}

/// Aggregates for a single command text across all runs.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSummary {
    pub command: String,
    pub attempts: u64,
    pub avg_duration_ms: f64,
    pub total_errors: u64,
    pub last_seen: DateTime<Local>,
}

impl CommandSummary {
    /// Average errors per attempt.
    pub fn error_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.total_errors as f64 / self.attempts as f64
        }
    }

    /// "5 minutes ago" style text relative to `now`.
    pub fn last_seen_text(&self, now: DateTime<Local>) -> String {
        humanize_since(self.last_seen, now)
    }
}

pub fn humanize_since(then: DateTime<Local>, now: DateTime<Local>) -> String {
    let secs = (now - then).num_seconds().max(0) as u64;
    HumanTime::from(Duration::from_secs(secs)).to_text_en(Accuracy::Rough, Tense::Past)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|_| Error::Timestamp(text.to_string()))
}

struct RunRow {
    id: i64,
    finished_at: String,
    pack_id: String,
    mode_id: String,
    score: i64,
    completed_commands: u32,
    errors: u32,
    hints: u32,
    accuracy: u32,
    wpm: u32,
    elapsed_seconds: f64,
}

impl RunRow {
    fn into_stored(self) -> Result<StoredRun> {
        Ok(StoredRun {
            id: self.id,
            run: RunRecord {
                finished_at: parse_timestamp(&self.finished_at)?,
                pack_id: self.pack_id,
                mode_id: self.mode_id,
                score: self.score.max(0) as u64,
                completed_commands: self.completed_commands,
                errors: self.errors,
                hints: self.hints,
                accuracy: self.accuracy,
                wpm: self.wpm,
                elapsed_seconds: self.elapsed_seconds,
            },
        })
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    run_id: i64,
    finished_at: String,
    pack_id: &'a str,
    mode_id: &'a str,
    score: u64,
    completed_commands: u32,
    errors: u32,
    hints: u32,
    accuracy: u32,
    wpm: u32,
    elapsed_seconds: f64,
}

/// SQLite log of finished runs.
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("opening history database {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Database at the default state location.
    pub fn open_default() -> Result<Option<Self>> {
        AppDirs::history_path().map(Self::open).transpose()
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Store a run and its per-command results atomically.
    pub fn record_run(&mut self, run: &RunRecord, commands: &[CommandOutcome]) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO runs
            (finished_at, pack_id, mode_id, score, completed_commands, errors, hints, accuracy, wpm, elapsed_seconds)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                run.finished_at.to_rfc3339_opts(SecondsFormat::Millis, false),
                run.pack_id,
                run.mode_id,
                run.score as i64,
                run.completed_commands,
                run.errors,
                run.hints,
                run.accuracy,
                run.wpm,
                run.elapsed_seconds,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO command_results (run_id, command_id, command, errors, duration_ms)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for outcome in commands {
                stmt.execute(params![
                    run_id,
                    outcome.command_id,
                    outcome.command,
                    outcome.errors,
                    outcome.duration_ms as i64,
                ])?;
            }
        }

        tx.commit()?;
        debug!("recorded run {run_id} with {} commands", commands.len());
        Ok(run_id)
    }

    fn query_runs(&self, limit: i64) -> Result<Vec<StoredRun>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, finished_at, pack_id, mode_id, score, completed_commands,
                   errors, hints, accuracy, wpm, elapsed_seconds
            FROM runs
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                finished_at: row.get(1)?,
                pack_id: row.get(2)?,
                mode_id: row.get(3)?,
                score: row.get(4)?,
                completed_commands: row.get(5)?,
                errors: row.get(6)?,
                hints: row.get(7)?,
                accuracy: row.get(8)?,
                wpm: row.get(9)?,
                elapsed_seconds: row.get(10)?,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?.into_stored()?);
        }
        Ok(runs)
    }

    /// Most recent runs first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<StoredRun>> {
        self.query_runs(i64::try_from(limit).unwrap_or(i64::MAX))
    }

    pub fn best_score(&self, pack_id: &str) -> Result<Option<u64>> {
        let best: Option<i64> = self.conn.query_row(
            "SELECT MAX(score) FROM runs WHERE pack_id = ?1",
            [pack_id],
            |row| row.get(0),
        )?;
        Ok(best.map(|score| score.max(0) as u64))
    }

    pub fn run_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Per-command aggregates, most practised first.
    pub fn command_summary(&self) -> Result<Vec<CommandSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                c.command,
                COUNT(*) AS attempts,
                AVG(c.duration_ms) AS avg_duration,
                SUM(c.errors) AS total_errors,
                MAX(r.id) AS last_run,
                -- bare column: taken from the MAX(r.id) row
                r.finished_at AS last_seen
            FROM command_results c
            JOIN runs r ON r.id = c.run_id
            GROUP BY c.command
            ORDER BY attempts DESC, c.command ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut summary = Vec::new();
        for row in rows {
            let (command, attempts, avg, errors, last_seen) = row?;
            summary.push(CommandSummary {
                command,
                attempts: attempts.max(0) as u64,
                avg_duration_ms: avg.unwrap_or(0.0),
                total_errors: errors.unwrap_or(0).max(0) as u64,
                last_seen: parse_timestamp(&last_seen)?,
            });
        }
        Ok(summary)
    }

    /// Write every run as CSV, oldest first. Returns the number of rows.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        // LIMIT -1 is unbounded in SQLite.
        let mut runs = self.query_runs(-1)?;
        runs.reverse();

        let mut csv = csv::Writer::from_writer(writer);
        for stored in &runs {
            let run = &stored.run;
            csv.serialize(CsvRow {
                run_id: stored.id,
                finished_at: run.finished_at.to_rfc3339(),
                pack_id: &run.pack_id,
                mode_id: &run.mode_id,
                score: run.score,
                completed_commands: run.completed_commands,
                errors: run.errors,
                hints: run.hints,
                accuracy: run.accuracy,
                wpm: run.wpm,
                elapsed_seconds: run.elapsed_seconds,
            })?;
        }
        csv.flush()?;
        Ok(runs.len())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute_batch("DELETE FROM command_results; DELETE FROM runs;")?;
        Ok(())
    }
}
