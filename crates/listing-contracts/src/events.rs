//! Session event log.
//!
//! Every event is one JSON object per line: the event's own fields, its
//! `type` tag, the owning `session_id` and an RFC 3339 `ts`. The event set
//! is closed, so callers cannot shadow the envelope keys.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        mode: String,
        service: String,
        model: String,
    },
    SessionState {
        from: String,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        files: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    DropFiltered {
        dropped: usize,
        kept: usize,
    },
    GenerationRequest {
        service: String,
        model: String,
        images: usize,
    },
    VocabularyWarning {
        field: String,
        vocabulary: String,
        value: String,
    },
    Copied {
        field: String,
        chars: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    SessionFinished {
        phase: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SessionState { .. } => "session_state",
            Self::DropFiltered { .. } => "drop_filtered",
            Self::GenerationRequest { .. } => "generation_request",
            Self::VocabularyWarning { .. } => "vocabulary_warning",
            Self::Copied { .. } => "copied",
            Self::SessionFinished { .. } => "session_finished",
        }
    }
}

/// One line of the log as read back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggedEvent {
    pub session_id: String,
    pub ts: String,
    #[serde(flatten)]
    pub event: SessionEvent,
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(flatten)]
    event: &'a SessionEvent,
    session_id: &'a str,
    ts: String,
}

/// Shared handle to a session's JSONL log. The file is opened on first write
/// and kept open; clones append to the same file.
#[derive(Debug, Clone)]
pub struct EventLog {
    shared: Arc<LogShared>,
}

#[derive(Debug)]
struct LogShared {
    path: PathBuf,
    session_id: String,
    file: Mutex<Option<File>>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(LogShared {
                path: path.into(),
                session_id: session_id.into(),
                file: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn record(&self, event: &SessionEvent) -> anyhow::Result<()> {
        let line = serde_json::to_string(&Envelope {
            event,
            session_id: &self.shared.session_id,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        })
        .with_context(|| format!("failed to encode {} event", event.kind()))?;

        let mut slot = self
            .shared
            .file
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        let Some(file) = slot.as_mut() else {
            return Err(anyhow!("event log {} is not open", self.path().display()));
        };
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path().display()))
    }

    fn open(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.shared.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.shared.path)
            .with_context(|| format!("failed to open {}", self.shared.path.display()))
    }
}

pub fn read_events(path: &Path) -> anyhow::Result<Vec<LoggedEvent>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<LoggedEvent>(line)
                .with_context(|| format!("{}:{}: not a session event", path.display(), idx + 1))
        })
        .collect()
}
