//! Error types for the ad-agent crate.
//!
//! Only startup and teardown failures surface as [`AgentError`]. Everything
//! that goes wrong while the agent is running (bad commands, watcher
//! refusals, failed redeploys) is reported to the operator and the loop
//! carries on.

use ad_watcher::WatchError;

/// Errors that end an agent run.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The file watcher could not be created.
    #[error("failed to start file watcher: {0}")]
    Watcher(#[from] WatchError),

    /// Writing to the operator console failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// A background task panicked or was cancelled.
    #[error("agent task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_display() {
        let err = AgentError::from(WatchError::path_not_found("./src"));
        assert_eq!(
            err.to_string(),
            "failed to start file watcher: path does not exist: ./src"
        );

        let err = AgentError::from(std::io::Error::other("broken pipe"));
        assert_eq!(err.to_string(), "failed to write output: broken pipe");
    }
}
