//! IVR engine error types
//!
//! A single taxonomy covering both load-time (config) and per-call failures,
//! grouped the way the five error tiers are described: config, runtime-config,
//! user, external, internal.

use thiserror::Error;

/// Result type for flow-engine operations.
pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Error, Debug)]
pub enum FlowError {
    // ─────────────────────────────────────────────────────────────────────
    // Config errors (fatal at load)
    // ─────────────────────────────────────────────────────────────────────
    /// Flow or API catalog JSON failed to parse
    #[error("failed to parse {file}: {error}")]
    ParseError { file: String, error: String },

    /// Edge target does not resolve to a defined node (Invariant 1)
    #[error("edge from node {from} targets unknown node {target}")]
    UnresolvedEdgeTarget { from: i64, target: i64 },

    /// Zero or more than one node has is_start = true (Invariant 2)
    #[error("flow must have exactly one start node, found {0}")]
    StartNodeCount(usize),

    /// Config file could not be read from disk
    #[error("failed to read {path}: {error}")]
    ConfigReadError { path: String, error: String },

    // ─────────────────────────────────────────────────────────────────────
    // Runtime-config errors (per call, fatal)
    // ─────────────────────────────────────────────────────────────────────
    /// Node references an op code outside the closed set (§4.3)
    #[error("unknown op code {0} on node {1}")]
    UnknownOpCode(i64, i64),

    /// Referenced API id is missing from the API catalog. Only ever raised
    /// per call (`validate` never checks that a node's `api_id` resolves),
    /// so this belongs with the other runtime-config errors, not the
    /// load-time ones above.
    #[error("API catalog has no entry for api_id {0}")]
    UnknownApiId(String),

    /// No EdgeSpec matched the result token and there is no catch-all
    #[error("dead end: node {node_id} produced token '{token}' with no matching edge")]
    DeadEnd { node_id: i64, token: String },

    /// Node id was not found in the loaded registry
    #[error("node {0} not found in loaded flow")]
    UnknownNode(i64),

    // ─────────────────────────────────────────────────────────────────────
    // External errors (per call, mapped to "F" by the caller)
    // ─────────────────────────────────────────────────────────────────────
    #[error("HTTP call to {url} failed: {error}")]
    HttpError { url: String, error: String },

    #[error("provider operation '{op}' failed: {error}")]
    ProviderError { op: String, error: String },

    // ─────────────────────────────────────────────────────────────────────
    // Internal errors (per call, fatal, never crosses the call boundary)
    // ─────────────────────────────────────────────────────────────────────
    #[error("internal engine error: {0}")]
    Internal(String),

    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    /// Flow driver observed more node transitions than the loop-protection
    /// threshold without reaching a terminal (§4.7 Loop protection).
    #[error("flow exceeded {0} node transitions without terminating")]
    LoopProtectionTripped(usize),
}

impl FlowError {
    pub fn http(url: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::HttpError {
            url: url.into(),
            error: error.to_string(),
        }
    }

    pub fn provider(op: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::ProviderError {
            op: op.into(),
            error: error.to_string(),
        }
    }

    /// True if this error terminates process startup (must be caught in `main`
    /// before the provider loop begins).
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ParseError { .. }
                | Self::UnresolvedEdgeTarget { .. }
                | Self::StartNodeCount(_)
                | Self::ConfigReadError { .. }
        )
    }

    /// True if this error is fatal for the current call but must not crash the
    /// host process — the driver hangs up and moves on to the next call.
    pub fn is_fatal_for_call(&self) -> bool {
        matches!(
            self,
            Self::UnknownOpCode(..)
                | Self::UnknownApiId(_)
                | Self::DeadEnd { .. }
                | Self::UnknownNode(_)
                | Self::Internal(_)
                | Self::HandlerPanic(_)
                | Self::LoopProtectionTripped(_)
        )
    }

    /// External failures are recoverable at the *flow authoring* level: the
    /// author routes the "F" token back to a retry node. The engine itself
    /// never retries.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::HttpError { .. } | Self::ProviderError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_classified() {
        let err = FlowError::StartNodeCount(0);
        assert!(err.is_config_error());
        assert!(!err.is_fatal_for_call());
    }

    #[test]
    fn runtime_errors_classified() {
        let err = FlowError::DeadEnd {
            node_id: 1001,
            token: "X".into(),
        };
        assert!(!err.is_config_error());
        assert!(err.is_fatal_for_call());
    }

    #[test]
    fn unknown_api_id_is_fatal_for_call_not_a_config_error() {
        let err = FlowError::UnknownApiId("missing".into());
        assert!(!err.is_config_error());
        assert!(err.is_fatal_for_call());
    }

    #[test]
    fn external_errors_classified() {
        let err = FlowError::http("https://example.com", "timeout");
        assert!(err.is_external());
        assert!(!err.is_fatal_for_call());
    }
}
