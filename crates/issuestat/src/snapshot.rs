//! Wire snapshots and the sinks that relay them.
//!
//! A snapshot is a copied-out view of the aggregate after a page: it never
//! borrows from the running state, so sinks may hold on to it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::aggregate::{Accumulator, AuthorCount, BucketCount};
use crate::store::AuthorSnapshotRecord;
use crate::window::TimeWindow;

/// Channel carrying author-mode snapshots.
pub const AUTHORS_CHANNEL: &str = "number-of-issues-by-authors-results";

/// Channel carrying stored author history after an author run.
pub const AUTHORS_HISTORY_CHANNEL: &str = "number-of-issues-by-authors-old-results";

/// Channel carrying grouping-mode snapshots.
pub const GROUPING_CHANNEL: &str = "number-of-issues-by-grouping-results";

/// Author-mode payload: ranking slices plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorsPayload {
    pub author_count: usize,
    pub top_opened: Vec<AuthorCount>,
    pub top_closed: Vec<AuthorCount>,
    pub total_opened: u64,
    pub total_closed: u64,
}

/// Grouping-mode payload: the full bucket sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingPayload {
    pub granularity: String,
    pub format: String,
    pub buckets: Vec<BucketCount>,
}

/// Mode-specific part of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotPayload {
    Authors(AuthorsPayload),
    Grouping(GroupingPayload),
}

/// Immutable view of a run's aggregate after a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Requested age, echoed ("3 months").
    pub age: String,
    /// Reference date of the run (`YYYY-MM-DD`).
    pub start: String,
    /// Horizon date of the run (`YYYY-MM-DD`).
    pub end: String,
    /// Set on the last snapshot of a completed run only.
    #[serde(rename = "final")]
    pub is_final: bool,
    #[serde(flatten)]
    pub payload: SnapshotPayload,
}

impl Snapshot {
    #[must_use]
    pub fn authors(&self) -> Option<&AuthorsPayload> {
        match &self.payload {
            SnapshotPayload::Authors(payload) => Some(payload),
            SnapshotPayload::Grouping(_) => None,
        }
    }

    #[must_use]
    pub fn grouping(&self) -> Option<&GroupingPayload> {
        match &self.payload {
            SnapshotPayload::Grouping(payload) => Some(payload),
            SnapshotPayload::Authors(_) => None,
        }
    }
}

/// Message relayed to a listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SinkMessage {
    /// A partial or final snapshot.
    Data(Snapshot),
    /// Previously stored author rankings, newest first.
    History(Vec<AuthorSnapshotRecord>),
    /// The run (or the history lookup) failed; no further snapshots follow.
    Error(String),
}

impl SinkMessage {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// One-way delivery of messages to a listener.
///
/// Delivery is fire-and-forget: implementations log and drop failures,
/// they never report them back to the walker.
pub trait ResultSink: Send + Sync {
    fn push(&self, channel: &str, message: SinkMessage);
}

impl<F> ResultSink for F
where
    F: Fn(&str, SinkMessage) + Send + Sync,
{
    fn push(&self, channel: &str, message: SinkMessage) {
        self(channel, message);
    }
}

/// A message tagged with the channel it was pushed on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkEnvelope {
    pub channel: String,
    #[serde(flatten)]
    pub message: SinkMessage,
}

/// Sink forwarding every message into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEnvelope>,
}

impl ChannelSink {
    /// Create a sink and the receiver its messages arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn push(&self, channel: &str, message: SinkMessage) {
        let envelope = SinkEnvelope {
            channel: channel.to_string(),
            message,
        };
        if self.tx.send(envelope).is_err() {
            tracing::debug!(channel, "Listener disconnected, dropping message");
        }
    }
}

/// Builds snapshots for one run and pushes them on the run's channel.
pub struct SnapshotEmitter<'a> {
    channel: &'a str,
    sink: &'a dyn ResultSink,
    age: String,
    start: String,
    end: String,
}

impl<'a> SnapshotEmitter<'a> {
    pub fn new(window: &TimeWindow, channel: &'a str, sink: &'a dyn ResultSink) -> Self {
        Self {
            channel,
            sink,
            age: window.age().label().to_string(),
            start: window.start_label(),
            end: window.end_label(),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        self.channel
    }

    /// Copy the current aggregate state into a snapshot.
    #[must_use]
    pub fn build<A: Accumulator + ?Sized>(&self, accumulator: &A, is_final: bool) -> Snapshot {
        Snapshot {
            age: self.age.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            is_final,
            payload: accumulator.payload(),
        }
    }

    /// Build a snapshot, push it, and return it.
    pub fn emit<A: Accumulator + ?Sized>(&self, accumulator: &A, is_final: bool) -> Snapshot {
        let snapshot = self.build(accumulator, is_final);
        self.sink
            .push(self.channel, SinkMessage::Data(snapshot.clone()));
        snapshot
    }

    /// Push the single error message that ends a failed run.
    pub fn emit_error(&self, message: impl Into<String>) {
        self.sink.push(self.channel, SinkMessage::Error(message.into()));
    }
}
