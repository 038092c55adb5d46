//! Append-only audit trail.
//!
//! Every line carries a bracketed header naming the phase tag and the
//! node's PID, so interleaved logs from several nodes stay attributable:
//!
//! ```text
//! [INIT           http://127.0.0.1:9000]     Server started at:  http://127.0.0.1:9000
//! ```
//!
//! Lines are mirrored to tracing under the `audit` target and appended to
//! a per-node file. A file that cannot be written degrades the trail to
//! console-only with a single warning; the demo keeps running.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use palisade_identity::ParticipantId;

const TAG_WIDTH: usize = 14;
const HEADER_WIDTH: usize = 40;

/// Render one audit line: padded header, then the fields.
///
/// The tag pads to a fixed width inside the brackets and the whole header
/// pads to a fixed width before the fields, which are joined by two
/// spaces. Nothing is ever truncated; oversized parts just push the rest
/// to the right.
pub fn format_line(tag: &str, pid: &ParticipantId, fields: &[&str]) -> String {
    let header = format!("[{:<tag_width$} {}]", tag, pid, tag_width = TAG_WIDTH);
    format!(
        "{:<header_width$}   {}",
        header,
        fields.join("  "),
        header_width = HEADER_WIDTH
    )
}

/// Per-node audit log.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    pid: ParticipantId,
    degraded: AtomicBool,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>, pid: ParticipantId) -> Self {
        Self {
            path: path.into(),
            pid,
            degraded: AtomicBool::new(false),
        }
    }

    /// Record one line under the given phase tag.
    pub fn record(&self, tag: &str, fields: &[&str]) {
        let line = format_line(tag, &self.pid, fields);
        info!(target: "audit", "{}", line);
        if let Err(e) = self.append(&line) {
            if !self.degraded.swap(true, Ordering::Relaxed) {
                warn!("Audit file {} is not writable: {}", self.path.display(), e);
            }
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")
    }
}
