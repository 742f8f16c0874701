//! Control-loop errors.
//!
//! Only conditions that end a run live here. Permission denials, depth-limit
//! rejections, corrupt todo snapshots and tool failures are folded into the
//! conversation instead.

use clawloop_core::error::ProviderError;
use clawloop_core::model::Phase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(#[source] ProviderError),

    #[error("Model call failed during {phase}: {source}")]
    ModelCall {
        phase: Phase,
        #[source]
        source: ProviderError,
    },

    #[error("Context compaction failed: {0}")]
    CompactionFailed(String),

    #[error("Sub-agent at depth {depth} failed: {source}")]
    SubAgent {
        depth: usize,
        #[source]
        source: Box<LoopError>,
    },

    #[error("Session {0} is already running")]
    AlreadyRunning(String),
}

impl LoopError {
    /// One-line status for the end user.
    pub fn status_line(&self) -> String {
        let text = match self {
            LoopError::QuotaExceeded(_) => format!("Insufficient quota: {self}"),
            _ => format!("Run aborted: {self}"),
        };
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn is_quota(&self) -> bool {
        match self {
            LoopError::QuotaExceeded(_) => true,
            LoopError::SubAgent { source, .. } => source.is_quota(),
            _ => false,
        }
    }
}

/// Why a sub-agent could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("depth limit exceeded: agent at depth {depth} may not spawn (max depth {max_depth})")]
    DepthExceeded { depth: usize, max_depth: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_is_single_line() {
        let err = LoopError::ModelCall {
            phase: Phase::Processing,
            source: ProviderError::ApiError {
                status_code: 500,
                message: "upstream\nexploded".into(),
            },
        };
        let line = err.status_line();
        assert!(!line.contains('\n'));
        assert!(line.starts_with("Run aborted: Model call failed during processing"));
    }

    #[test]
    fn quota_status_line() {
        let err = LoopError::QuotaExceeded(ProviderError::QuotaExhausted("0 credits".into()));
        assert!(err.status_line().starts_with("Insufficient quota"));
        assert!(err.is_quota());
    }

    #[test]
    fn nested_sub_agent_quota_is_detected() {
        let err = LoopError::SubAgent {
            depth: 1,
            source: Box::new(LoopError::QuotaExceeded(ProviderError::QuotaExhausted("x".into()))),
        };
        assert!(err.is_quota());
    }
}
