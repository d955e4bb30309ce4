//! Structured event logging for the resonance VM.
//!
//! The VM narrates notable transitions (fork entry, resonance collapse, SAVE
//! decisions) as [`VmEvent`]s handed to an optional [`EventSink`]. Sinks are
//! collaborators: a failing sink is reported through `tracing` and never
//! changes VM behaviour.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event rejected before it reached a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum EventError {
    /// Payloads must be JSON objects.
    PayloadNotObject { event_type: String },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::PayloadNotObject { event_type } => {
                write!(f, "payload for event '{event_type}' must be a JSON object")
            }
        }
    }
}

impl std::error::Error for EventError {}

/// Single structured event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmEvent {
    pub event_type: String,
    pub payload: Value,
    pub timestamp_ms: u128,
}

impl VmEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Result<Self, EventError> {
        let event_type = event_type.into();
        if !payload.is_object() {
            return Err(EventError::PayloadNotObject { event_type });
        }
        Ok(Self {
            event_type,
            payload,
            timestamp_ms: timestamp_now(),
        })
    }
}

/// Receiver for VM events.
pub trait EventSink: Send {
    fn record(&mut self, event: &VmEvent) -> io::Result<()>;
}

/// Appends one JSON line per event to a file.
#[derive(Debug, Clone)]
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventLog {
    fn record(&mut self, event: &VmEvent) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        append_json_line(&self.path, event)
    }
}

/// In-memory sink; clones share one buffer so a caller can keep a handle
/// while the VM owns the sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    entries: Arc<Mutex<Vec<VmEvent>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<VmEvent> {
        self.lock().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.event_type.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<VmEvent>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemoryEventLog {
    fn record(&mut self, event: &VmEvent) -> io::Result<()> {
        self.lock().push(event.clone());
        Ok(())
    }
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

pub fn timestamp_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
