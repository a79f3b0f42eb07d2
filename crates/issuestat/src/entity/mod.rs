//! SeaORM entity definitions for the issuestat database schema.

pub mod author_snapshot;
pub mod prelude;
