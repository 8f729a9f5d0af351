//! Structured pipeline events and the sinks that receive them.
//!
//! A sink belongs to one [`Pipeline`](super::Pipeline) value. Nothing here is
//! process-global.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DatabaseKind;
use crate::error::ErrorKind;

use super::state::PipelineState;

/// Which side of the transfer a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Source,
    Target,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Source => f.write_str("source"),
            Role::Target => f.write_str("target"),
        }
    }
}

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    Connected {
        role: Role,
        engine: DatabaseKind,
        location: String,
    },
    Extracted {
        rows: u64,
        columns: Vec<String>,
    },
    /// The extraction returned no rows. The run continues as a no-op load.
    EmptyResult,
    Mapped {
        columns: Vec<String>,
    },
    TableCreated {
        table: String,
    },
    TableAlreadyExists {
        table: String,
    },
    TableTruncated {
        table: String,
        rows_deleted: u64,
    },
    BatchCommitted {
        batch: usize,
        batches_expected: usize,
        rows: u64,
        rows_loaded: u64,
    },
    Failed {
        state: PipelineState,
        kind: ErrorKind,
        message: String,
    },
    Finished {
        succeeded: bool,
        rows_loaded: u64,
        batches: usize,
        duration_seconds: f64,
    },
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StateChanged { from, to } => debug!("State: {} -> {}", from, to),
            PipelineEvent::Connected {
                role,
                engine,
                location,
            } => info!("Opened {} connection ({}): {}", role, engine, location),
            PipelineEvent::Extracted { rows, columns } => {
                info!("Extracted {} rows, columns: {}", rows, columns.join(", "))
            }
            PipelineEvent::EmptyResult => warn!("Extraction query returned no rows"),
            PipelineEvent::Mapped { columns } => {
                debug!("Target columns: {}", columns.join(", "))
            }
            PipelineEvent::TableCreated { table } => info!("Created table {}", table),
            PipelineEvent::TableAlreadyExists { table } => {
                info!("Table {} already exists, skipping creation", table)
            }
            PipelineEvent::TableTruncated { table, rows_deleted } => {
                info!("Emptied table {} ({} rows deleted)", table, rows_deleted)
            }
            PipelineEvent::BatchCommitted {
                batch,
                batches_expected,
                rows,
                rows_loaded,
            } => info!(
                "Committed batch {}/{} ({} rows, {} total)",
                batch, batches_expected, rows, rows_loaded
            ),
            PipelineEvent::Failed {
                state,
                kind,
                message,
            } => warn!("Run failed after {} with {}: {}", state, kind, message),
            PipelineEvent::Finished {
                succeeded,
                rows_loaded,
                batches,
                duration_seconds,
            } => info!(
                "Run {}: {} rows in {} batches ({:.1}s)",
                if *succeeded { "succeeded" } else { "failed" },
                rows_loaded,
                batches,
                duration_seconds
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
