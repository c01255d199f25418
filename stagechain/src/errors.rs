//! Error types for the stagechain engine.
//!
//! Errors fall into three groups: construction errors raised while a chain is
//! assembled, stage execution errors raised by a stage's own logic, and
//! environment errors raised while preparing the run (project tree,
//! benchmarking log).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stagechain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The chain or its configuration failed validation.
    #[error("{0}")]
    Validation(#[from] ChainValidationError),

    /// A stage already has a successor.
    #[error("{0}")]
    AlreadyConnected(#[from] AlreadyConnectedError),

    /// A stage's own logic failed. The source error is kept intact.
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        /// The failing stage.
        stage: String,
        /// The error raised by the stage.
        #[source]
        source: anyhow::Error,
    },

    /// A stage finished without leaving a key the chain relies on.
    #[error("Stage '{stage}' finished without producing '{key}'")]
    MissingOutput {
        /// The stage that just ran.
        stage: String,
        /// The missing context key.
        key: String,
    },

    /// A stage left a key the chain relies on in a form it cannot decode.
    #[error("Stage '{stage}' left '{key}' unreadable: {source}")]
    InvalidOutput {
        /// The stage that just ran.
        stage: String,
        /// The undecodable context key.
        key: String,
        /// The decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The context handed to the chain lacks a key the driver must seed.
    #[error("Context is missing '{key}' before the first stage")]
    ContextNotSeeded {
        /// The missing key.
        key: String,
    },

    /// The run environment could not be prepared.
    #[error("Environment error at {}: {source}", path.display())]
    Environment {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChainError {
    /// Wraps an error raised by a stage.
    pub fn stage_failed(stage: impl Into<String>, source: anyhow::Error) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            source,
        }
    }

    /// Wraps an IO error raised while touching `path`.
    pub fn environment(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Environment {
            path: path.into(),
            source,
        }
    }

    /// Returns the failing stage name for stage execution errors.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            Self::StageFailed { stage, .. }
            | Self::MissingOutput { stage, .. }
            | Self::InvalidOutput { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Returns the machine-readable code of a construction error.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Validation(err) => err.code(),
            Self::AlreadyConnected(_) => Some(codes::ALREADY_CONNECTED),
            _ => None,
        }
    }

    /// Returns true if the error was raised before any stage executed.
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::AlreadyConnected(_))
    }
}

/// Machine-readable error codes for chain validation.
pub mod codes {
    /// A stage was connected twice, or given a second predecessor.
    pub const ALREADY_CONNECTED: &str = "CHAIN-001-ALREADY_CONNECTED";
    /// No implementation was registered for an instantiated stage.
    pub const MISSING_STAGE: &str = "CHAIN-002-MISSING_STAGE";
    /// A stage requires a key no earlier stage produces.
    pub const UNSATISFIED_KEY: &str = "CHAIN-003-UNSATISFIED_KEY";
    /// The successor links do not form a simple path.
    pub const CYCLE: &str = "CHAIN-004-CYCLE";
    /// A run option has an invalid value.
    pub const INVALID_OPTION: &str = "CHAIN-005-INVALID_OPTION";
    /// A stage name does not exist in the chain.
    pub const UNKNOWN_STAGE: &str = "CHAIN-006-UNKNOWN_STAGE";
    /// Two stages share a name.
    pub const DUPLICATE_STAGE: &str = "CHAIN-007-DUPLICATE_STAGE";
    /// The chain has no stages.
    pub const EMPTY: &str = "CHAIN-008-EMPTY";
    /// The entry stage has a predecessor.
    pub const ENTRY_NOT_HEAD: &str = "CHAIN-009-ENTRY_NOT_HEAD";
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CHAIN-003-UNSATISFIED_KEY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a chain or its options fail validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChainValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl ChainValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Creates a validation error for an invalid run option.
    #[must_use]
    pub fn invalid_option(option: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(format!("Invalid option '{option}': {reason}")).with_error_info(
            ContractErrorInfo::new(codes::INVALID_OPTION, reason).with_context_entry("option", option),
        )
    }

    /// Creates a validation error for a stage name that is not part of the chain.
    #[must_use]
    pub fn unknown_stage(option: &str, stage: &str) -> Self {
        Self::new(format!("Option '{option}' names unknown stage '{stage}'"))
            .with_stages(vec![stage.to_string()])
            .with_error_info(
                ContractErrorInfo::new(
                    codes::UNKNOWN_STAGE,
                    format!("Stage '{stage}' is not reachable in this chain"),
                )
                .with_context_entry("option", option)
                .with_fix_hint("Use one of the names printed by `stagechain --plan`."),
            )
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a stage's successor or predecessor is assigned twice.
#[derive(Debug, Clone, Error)]
#[error("Cannot connect '{from}' -> '{to}': '{existing}' is already linked")]
pub struct AlreadyConnectedError {
    /// The stage being connected from.
    pub from: String,
    /// The stage being connected to.
    pub to: String,
    /// The link that is already in place.
    pub existing: String,
}

impl AlreadyConnectedError {
    /// Creates a new already-connected error.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, existing: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            existing: existing.into(),
        }
    }

}
