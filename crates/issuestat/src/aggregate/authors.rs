use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Accumulator, AggregateError};
use crate::platform::{ANONYMOUS_AUTHOR, IssueRecord};
use crate::snapshot::{AuthorsPayload, SnapshotPayload};

/// Share of authors (in percent) kept in each ranking.
pub const TOP_AUTHOR_PERCENT: usize = 15;

/// How records without an attributable author are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullAuthorPolicy {
    /// Count them under the [`ANONYMOUS_AUTHOR`] key.
    #[default]
    Include,
    /// Leave them out of the table entirely.
    Exclude,
}

/// Counter used to rank authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorMetric {
    Opened,
    Closed,
}

/// Opened/closed counts of one author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub opened: u64,
    pub closed: u64,
}

impl AuthorCount {
    #[inline]
    fn metric(&self, metric: AuthorMetric) -> u64 {
        match metric {
            AuthorMetric::Opened => self.opened,
            AuthorMetric::Closed => self.closed,
        }
    }
}

/// Number of authors kept in a ranking over `author_count` authors.
#[inline]
#[must_use]
pub fn top_k_for(author_count: usize) -> usize {
    (author_count * TOP_AUTHOR_PERCENT).div_ceil(100)
}

/// Per-author counts, kept in first-discovery order.
#[derive(Debug, Clone, Default)]
pub struct AuthorTable {
    entries: Vec<AuthorCount>,
    index: HashMap<String, usize>,
    null_authors: NullAuthorPolicy,
    total_opened: u64,
    total_closed: u64,
}

impl AuthorTable {
    #[must_use]
    pub fn new(null_authors: NullAuthorPolicy) -> Self {
        Self {
            null_authors,
            ..Self::default()
        }
    }

    fn entry(&mut self, author: &str) -> &mut AuthorCount {
        let idx = match self.index.get(author) {
            Some(idx) => *idx,
            None => {
                self.entries.push(AuthorCount {
                    author: author.to_string(),
                    opened: 0,
                    closed: 0,
                });
                let idx = self.entries.len() - 1;
                self.index.insert(author.to_string(), idx);
                idx
            }
        };
        &mut self.entries[idx]
    }

    pub fn record_opened(&mut self, author: &str) {
        self.entry(author).opened += 1;
        self.total_opened += 1;
    }

    pub fn record_closed(&mut self, author: &str) {
        self.entry(author).closed += 1;
        self.total_closed += 1;
    }

    /// Key a record is counted under, or `None` when the policy drops it.
    fn author_key<'r>(&self, record: &'r IssueRecord) -> Option<&'r str> {
        match (record.author.as_deref(), self.null_authors) {
            (Some(author), _) => Some(author),
            (None, NullAuthorPolicy::Include) => Some(ANONYMOUS_AUTHOR),
            (None, NullAuthorPolicy::Exclude) => None,
        }
    }

    #[must_use]
    pub fn get(&self, author: &str) -> Option<&AuthorCount> {
        self.index.get(author).map(|idx| &self.entries[*idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn total_opened(&self) -> u64 {
        self.total_opened
    }

    #[must_use]
    pub fn total_closed(&self) -> u64 {
        self.total_closed
    }

    /// The `k` highest entries by `metric`, ties kept in discovery order.
    #[must_use]
    pub fn top_k(&self, metric: AuthorMetric, k: usize) -> Vec<AuthorCount> {
        let mut ranked: Vec<&AuthorCount> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.metric(metric).cmp(&a.metric(metric)));
        ranked.into_iter().take(k).cloned().collect()
    }
}

impl Accumulator for AuthorTable {
    fn record_opened(&mut self, record: &IssueRecord) -> Result<(), AggregateError> {
        if let Some(author) = self.author_key(record) {
            AuthorTable::record_opened(self, author);
        }
        Ok(())
    }

    fn record_closed(
        &mut self,
        record: &IssueRecord,
        _closed_at: DateTime<Utc>,
    ) -> Result<(), AggregateError> {
        if let Some(author) = self.author_key(record) {
            AuthorTable::record_closed(self, author);
        }
        Ok(())
    }

    fn payload(&self) -> SnapshotPayload {
        let k = top_k_for(self.len());
        SnapshotPayload::Authors(AuthorsPayload {
            author_count: self.len(),
            top_opened: self.top_k(AuthorMetric::Opened, k),
            top_closed: self.top_k(AuthorMetric::Closed, k),
            total_opened: self.total_opened,
            total_closed: self.total_closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(author: Option<&str>) -> IssueRecord {
        IssueRecord {
            author: author.map(String::from),
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    #[test]
    fn test_top_k_for_rounds_up() {
        assert_eq!(top_k_for(0), 0);
        assert_eq!(top_k_for(1), 1);
        assert_eq!(top_k_for(6), 1);
        assert_eq!(top_k_for(7), 2);
        assert_eq!(top_k_for(20), 3);
        assert_eq!(top_k_for(100), 15);
    }

    #[test]
    fn test_authors_are_created_lazily_and_once() {
        let mut table = AuthorTable::new(NullAuthorPolicy::Include);
        assert!(table.is_empty());

        table.record_opened("alice");
        table.record_opened("alice");
        table.record_closed("bob");

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("alice").map(|a| a.opened), Some(2));
        assert_eq!(table.get("bob").map(|a| (a.opened, a.closed)), Some((0, 1)));
        assert_eq!(table.total_opened(), 2);
        assert_eq!(table.total_closed(), 1);
    }

    #[test]
    fn test_top_k_is_strictly_descending_without_ties() {
        let mut table = AuthorTable::default();
        for (author, n) in [("a", 1), ("b", 4), ("c", 2), ("d", 3)] {
            for _ in 0..n {
                table.record_opened(author);
            }
        }

        let top = table.top_k(AuthorMetric::Opened, 3);
        let counts: Vec<u64> = top.iter().map(|a| a.opened).collect();
        assert_eq!(counts, vec![4, 3, 2]);
        assert!(counts.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_top_k_breaks_ties_by_discovery_order() {
        let mut table = AuthorTable::default();
        table.record_closed("zed");
        table.record_closed("amy");
        table.record_closed("kim");
        table.record_closed("kim");

        let names: Vec<String> = table
            .top_k(AuthorMetric::Closed, 3)
            .into_iter()
            .map(|a| a.author)
            .collect();
        assert_eq!(names, vec!["kim", "zed", "amy"]);
    }

    #[test]
    fn test_top_k_does_not_reorder_the_table() {
        let mut table = AuthorTable::default();
        table.record_opened("first");
        table.record_opened("second");
        table.record_opened("second");

        let _ = table.top_k(AuthorMetric::Opened, 1);
        table.record_opened("third");

        let payload = table.payload();
        let SnapshotPayload::Authors(payload) = payload else {
            panic!("expected authors payload");
        };
        assert_eq!(payload.author_count, 3);
        assert_eq!(payload.top_opened[0].author, "second");
    }

    #[test]
    fn test_null_authors_follow_policy() {
        let mut included = AuthorTable::new(NullAuthorPolicy::Include);
        Accumulator::record_opened(&mut included, &record(None)).unwrap();
        assert_eq!(included.get(ANONYMOUS_AUTHOR).map(|a| a.opened), Some(1));

        let mut excluded = AuthorTable::new(NullAuthorPolicy::Exclude);
        Accumulator::record_opened(&mut excluded, &record(None)).unwrap();
        Accumulator::record_opened(&mut excluded, &record(Some("octocat"))).unwrap();
        assert!(excluded.get(ANONYMOUS_AUTHOR).is_none());
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded.total_opened(), 1);
    }

    #[test]
    fn test_payload_keeps_fifteen_percent_of_authors() {
        let mut table = AuthorTable::default();
        for i in 0..10 {
            for _ in 0..=i {
                table.record_opened(&format!("user{i}"));
            }
        }

        let SnapshotPayload::Authors(payload) = table.payload() else {
            panic!("expected authors payload");
        };
        assert_eq!(payload.author_count, 10);
        assert_eq!(payload.top_opened.len(), 2);
        assert_eq!(payload.top_opened[0].author, "user9");
        assert_eq!(payload.total_opened, 55);
        assert_eq!(payload.total_closed, 0);
    }
}
