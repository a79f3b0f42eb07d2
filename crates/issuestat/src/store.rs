//! Persistence of final author rankings.
//!
//! Only the head of each ranking is kept (see [`HISTORY_TOP_N`]); grouping
//! runs are never persisted.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::AuthorCount;
use crate::entity::author_snapshot::{ActiveModel, Column, Entity as AuthorSnapshot, Model};
use crate::snapshot::Snapshot;
use crate::window::DATE_FORMAT;

/// Number of top openers/closers saved per run.
pub const HISTORY_TOP_N: usize = 3;

/// Errors that can occur while saving or loading history.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A ranking column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot cannot be stored as author history.
    #[error("Invalid history record: {0}")]
    InvalidRecord(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A saved author ranking for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSnapshotRecord {
    pub owner: String,
    pub repo: String,
    pub recorded_at: DateTime<Utc>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub age: String,
    pub top_opened: Vec<AuthorCount>,
    pub top_closed: Vec<AuthorCount>,
}

impl AuthorSnapshotRecord {
    /// Build a history record from a final author snapshot, keeping `keep` entries per ranking.
    pub fn from_snapshot(
        owner: &str,
        repo: &str,
        snapshot: &Snapshot,
        recorded_at: DateTime<Utc>,
        keep: usize,
    ) -> Result<Self> {
        let authors = snapshot.authors().ok_or_else(|| {
            StoreError::InvalidRecord("only author snapshots are kept as history".to_string())
        })?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            recorded_at,
            start: parse_date(&snapshot.start)?,
            end: parse_date(&snapshot.end)?,
            age: snapshot.age.clone(),
            top_opened: authors.top_opened.iter().take(keep).cloned().collect(),
            top_closed: authors.top_closed.iter().take(keep).cloned().collect(),
        })
    }

    fn into_active_model(self) -> Result<ActiveModel> {
        Ok(ActiveModel {
            id: Set(Uuid::new_v4()),
            owner: Set(self.owner),
            repo: Set(self.repo),
            recorded_at: Set(self.recorded_at.fixed_offset()),
            window_start: Set(self.start),
            window_end: Set(self.end),
            age: Set(self.age),
            top_opened: Set(serde_json::to_value(self.top_opened)?),
            top_closed: Set(serde_json::to_value(self.top_closed)?),
        })
    }

    fn from_model(model: Model) -> Result<Self> {
        Ok(Self {
            owner: model.owner,
            repo: model.repo,
            recorded_at: model.recorded_at.with_timezone(&Utc),
            start: model.window_start,
            end: model.window_end,
            age: model.age,
            top_opened: serde_json::from_value(model.top_opened)?,
            top_closed: serde_json::from_value(model.top_closed)?,
        })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| StoreError::InvalidRecord(format!("bad date {value:?}: {e}")))
}

/// Storage for author ranking history, keyed by `(owner, repo)`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one record.
    async fn save(&self, record: &AuthorSnapshotRecord) -> Result<()>;

    /// All records for a repository, newest first.
    async fn query(&self, owner: &str, repo: &str) -> Result<Vec<AuthorSnapshotRecord>>;
}

/// sea-orm backed history store.
#[derive(Debug)]
pub struct DbSnapshotStore {
    db: DatabaseConnection,
}

impl DbSnapshotStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for DbSnapshotStore {
    async fn save(&self, record: &AuthorSnapshotRecord) -> Result<()> {
        let model = record.clone().into_active_model()?;
        AuthorSnapshot::insert(model).exec(&self.db).await?;

        tracing::debug!(
            repo = %format!("{}/{}", record.owner, record.repo),
            age = %record.age,
            "Saved author snapshot"
        );
        Ok(())
    }

    async fn query(&self, owner: &str, repo: &str) -> Result<Vec<AuthorSnapshotRecord>> {
        AuthorSnapshot::find()
            .filter(Column::Owner.eq(owner))
            .filter(Column::Repo.eq(repo))
            .order_by_desc(Column::RecordedAt)
            .order_by_desc(Column::WindowStart)
            .all(&self.db)
            .await?
            .into_iter()
            .map(AuthorSnapshotRecord::from_model)
            .collect()
    }
}

/// In-process history store, for embedding without a database.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: Mutex<Vec<AuthorSnapshotRecord>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, record: &AuthorSnapshotRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| StoreError::InvalidRecord("history lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }

    async fn query(&self, owner: &str, repo: &str) -> Result<Vec<AuthorSnapshotRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| StoreError::InvalidRecord("history lock poisoned".to_string()))?;

        let mut matching: Vec<AuthorSnapshotRecord> = records
            .iter()
            .filter(|r| r.owner == owner && r.repo == repo)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.start.cmp(&a.start))
        });
        Ok(matching)
    }
}
