//! JSON-lines output of sink messages.

use std::io::Write;
use std::sync::Arc;

use issuestat::{ResultSink, SinkEnvelope, SinkMessage};

use crate::progress::ProgressReporter;

/// Sink printing every message to stdout as one JSON object per line.
///
/// Lines are written with the spinner suspended so they never interleave
/// with progress output.
pub(crate) struct JsonLinesSink {
    reporter: Arc<ProgressReporter>,
}

impl JsonLinesSink {
    pub(crate) fn new(reporter: Arc<ProgressReporter>) -> Self {
        Self { reporter }
    }
}

/// Render one envelope as a single JSON line.
pub(crate) fn render_line(channel: &str, message: SinkMessage) -> serde_json::Result<String> {
    serde_json::to_string(&SinkEnvelope {
        channel: channel.to_string(),
        message,
    })
}

impl ResultSink for JsonLinesSink {
    fn push(&self, channel: &str, message: SinkMessage) {
        let line = match render_line(channel, message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(channel, error = %e, "Failed to serialize message");
                return;
            }
        };

        self.reporter.suspend(|| {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
                tracing::debug!(channel, error = %e, "Failed to write message");
            }
        });
    }
}
