//! Append-only structured life event log.
//!
//! One JSONL file per agent session (`life_log_<session_id>.jsonl`), one JSON
//! object per line with `timestamp`, `session_id`, `event_type`, `details`.
//! The file is never rewritten.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

/// The life-cycle transitions worth recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeEventType {
    TickStart,
    TickComplete,
    PlanStart,
    PlanComplete,
    ResearchStart,
    ResearchComplete,
    WriteStart,
    WriteComplete,
    WriteFailed,
}

impl LifeEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TickStart => "TICK_START",
            Self::TickComplete => "TICK_COMPLETE",
            Self::PlanStart => "PLAN_START",
            Self::PlanComplete => "PLAN_COMPLETE",
            Self::ResearchStart => "RESEARCH_START",
            Self::ResearchComplete => "RESEARCH_COMPLETE",
            Self::WriteStart => "WRITE_START",
            Self::WriteComplete => "WRITE_COMPLETE",
            Self::WriteFailed => "WRITE_FAILED",
        }
    }
}

/// One structured life event, serialized as a single JSON line.
#[derive(Debug, Serialize)]
pub struct LifeEvent {
    pub timestamp: String,
    pub session_id: String,
    pub event_type: String,
    pub details: serde_json::Value,
}

pub struct LifeEventLogger {
    file: File,
    path: PathBuf,
    session_id: String,
}

impl LifeEventLogger {
    /// Create (or append to) the session's log file under `life_log_dir`.
    pub fn new(life_log_dir: &Path, session_id: &str) -> Result<Self> {
        std::fs::create_dir_all(life_log_dir).with_context(|| {
            format!("failed to create life log dir {}", life_log_dir.display())
        })?;

        let path = life_log_dir.join(format!("life_log_{session_id}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open life log {}", path.display()))?;

        Ok(Self {
            file,
            path,
            session_id: session_id.to_string(),
        })
    }

    /// Append one event. A write failure is logged, never fatal to the tick.
    pub fn log(&mut self, event_type: LifeEventType, details: serde_json::Value) {
        let event = LifeEvent {
            timestamp: chrono::Local::now().to_rfc3339(),
            session_id: self.session_id.clone(),
            event_type: event_type.as_str().to_string(),
            details,
        };

        match serde_json::to_string(&event) {
            Ok(line) => {
                if let Err(err) = writeln!(self.file, "{line}") {
                    warn!(path = %self.path.display(), %err, "failed to append life event");
                }
            }
            Err(err) => warn!(%err, "failed to serialize life event"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
