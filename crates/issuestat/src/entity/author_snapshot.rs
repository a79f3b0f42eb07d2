//! AuthorSnapshot entity - top author rankings saved at the end of author runs.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// AuthorSnapshot model - one row per completed author run.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "author_snapshots")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,

    /// When the run completed.
    pub recorded_at: DateTimeWithTimeZone,
    /// Reference date of the run's window.
    pub window_start: Date,
    /// Horizon date of the run's window.
    pub window_end: Date,
    /// Requested age, as echoed in snapshots ("3 months").
    pub age: String,

    /// Top openers (JSON array of author counts).
    #[sea_orm(column_type = "Json")]
    pub top_opened: serde_json::Value,
    /// Top closers (JSON array of author counts).
    #[sea_orm(column_type = "Json")]
    pub top_closed: serde_json::Value,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
