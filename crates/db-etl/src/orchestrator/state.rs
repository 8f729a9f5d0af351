//! Pipeline state machine.

use serde::{Deserialize, Serialize};

/// Where a run is. States only move forward, one step at a time;
/// `Failed` can be entered from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Connected,
    Extracted,
    Mapped,
    Provisioned,
    Loaded,
    Done,
    Failed,
}

impl PipelineState {
    /// The state that follows on success, `None` for terminal states.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Init => Some(PipelineState::Connected),
            PipelineState::Connected => Some(PipelineState::Extracted),
            PipelineState::Extracted => Some(PipelineState::Mapped),
            PipelineState::Mapped => Some(PipelineState::Provisioned),
            PipelineState::Provisioned => Some(PipelineState::Loaded),
            PipelineState::Loaded => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Init => "INIT",
            PipelineState::Connected => "CONNECTED",
            PipelineState::Extracted => "EXTRACTED",
            PipelineState::Mapped => "MAPPED",
            PipelineState::Provisioned => "PROVISIONED",
            PipelineState::Loaded => "LOADED",
            PipelineState::Done => "DONE",
            PipelineState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
