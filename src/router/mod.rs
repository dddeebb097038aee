pub mod dispatcher;
pub mod oracle;

pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherConfig};
pub use oracle::{DecisionOracle, LlmDecisionOracle, ScriptedOracle};

use std::time::Duration;

/// Failures that abort a session. Handler-local failures never appear here;
/// they are recovered in place as failure messages.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The oracle named something outside the closed capability set, or a
    /// capability with no registered handler.
    #[error("unknown capability '{0}' in routing decision")]
    UnknownCapability(String),

    #[error("decision oracle failed: {0}")]
    Oracle(anyhow::Error),

    #[error("decision oracle timed out after {0:?}")]
    DecisionTimeout(Duration),
}
