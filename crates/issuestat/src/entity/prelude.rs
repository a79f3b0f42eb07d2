//! Common re-exports for convenient entity usage.

pub use super::author_snapshot::{
    ActiveModel as AuthorSnapshotActiveModel, Column as AuthorSnapshotColumn,
    Entity as AuthorSnapshot, Model as AuthorSnapshotModel,
};
