use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub title: Option<String>,
    pub article_id: Option<u64>,
    pub error: Option<String>,
    pub failed_stage: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckpointRecord {
    pub stage: String,
    pub payload: Value,
    pub created_at: String,
}

/// How a run ended.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub title: Option<String>,
    pub article_id: Option<u64>,
    pub error: Option<String>,
    pub failed_stage: Option<String>,
}

/// SQLite-backed history of job runs and the output of each stage.
#[derive(Clone)]
pub struct RunJournal {
    db: Arc<Mutex<Connection>>,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl RunJournal {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let db = Connection::open(path)?;
        info!("Run journal at {}", path.display());
        Self::init(db)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS job_runs (
                run_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                title TEXT,
                article_id INTEGER,
                error TEXT,
                failed_stage TEXT
            )",
            [],
        )?;
        db.execute(
            "CREATE TABLE IF NOT EXISTS job_checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_checkpoints_run ON job_checkpoints(run_id)",
            [],
        )?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub async fn begin_run(&self, run_id: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO job_runs (run_id, status, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, RunStatus::Running.as_str(), now()],
        )?;
        Ok(())
    }

    pub async fn checkpoint(&self, run_id: &str, stage: &str, payload: &Value) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO job_checkpoints (run_id, stage, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, stage, payload.to_string(), now()],
        )?;
        Ok(())
    }

    pub async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        summary: &RunSummary,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE job_runs
             SET status = ?2, finished_at = ?3, title = ?4, article_id = ?5, error = ?6, failed_stage = ?7
             WHERE run_id = ?1",
            params![
                run_id,
                status.as_str(),
                now(),
                summary.title,
                summary.article_id.map(|id| id as i64),
                summary.error,
                summary.failed_stage
            ],
        )?;
        Ok(())
    }

    pub async fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT run_id, status, started_at, finished_at, title, article_id, error, failed_stage
             FROM job_runs ORDER BY started_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_run)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let db = self.db.lock().await;
        let record = db
            .query_row(
                "SELECT run_id, status, started_at, finished_at, title, article_id, error, failed_stage
                 FROM job_runs WHERE run_id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?;
        Ok(record)
    }

    pub async fn checkpoints(&self, run_id: &str) -> Result<Vec<CheckpointRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT stage, payload, created_at FROM job_checkpoints WHERE run_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            let payload: String = row.get(1)?;
            Ok(CheckpointRecord {
                stage: row.get(0)?,
                payload: serde_json::from_str(&payload).unwrap_or(Value::String(payload)),
                created_at: row.get(2)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(1)?;
    let article_id: Option<i64> = row.get(5)?;
    Ok(RunRecord {
        run_id: row.get(0)?,
        status: RunStatus::parse(&status),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        title: row.get(4)?,
        article_id: article_id.map(|id| id as u64),
        error: row.get(6)?,
        failed_stage: row.get(7)?,
    })
}
