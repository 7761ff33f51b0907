use miette::Diagnostic;
use thiserror::Error;

use crate::gates::types::{Dispatch, GateRef};

#[derive(Debug, Error, Diagnostic)]
pub enum GateError {
    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(gatehouse::gates::policy_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    PolicyLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid policy: {0}")]
    #[diagnostic(
        code(gatehouse::gates::invalid_policy),
        help("Policy files contain `controller` nodes with `base` and `action` children")
    )]
    InvalidPolicy(String),

    #[error("Rule for `{target}` has unsupported value `{value}`")]
    #[diagnostic(
        code(gatehouse::gates::invalid_rule),
        help("A rule is #true, #false, a gate name, or a list of those")
    )]
    InvalidRule { target: String, value: String },

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(gatehouse::gates::kdl_parse),
        help("Check your KDL file syntax against https://kdl.dev")
    )]
    KdlParse(String),

    #[error("Gate `{gate}` referenced by `{referenced_by}` is not registered")]
    #[diagnostic(
        code(gatehouse::gates::unknown_gate),
        help("Register the gate with GateManager::register before serving, or fix the policy")
    )]
    UnknownGate { gate: GateRef, referenced_by: String },

    #[error(
        "Gate definition for \"{dispatch}\" references `{gate}`, which is not a registered gate. \
         Expected one of: boolean, gate or list of gates."
    )]
    #[diagnostic(code(gatehouse::gates::invalid_gate_type))]
    InvalidGateType { dispatch: Dispatch, gate: GateRef },

    #[error(
        "A gate for \"{dispatch}\" failed to produce a satisfiable result. \
         Expected one of: boolean, nothing or a response, instead got {found}."
    )]
    #[diagnostic(code(gatehouse::gates::invalid_gate_result))]
    InvalidGateResult { dispatch: Dispatch, found: String },

    #[error("Gate `{gate}` failed for \"{dispatch}\": {source}")]
    #[diagnostic(code(gatehouse::gates::check_failed))]
    CheckFailed {
        dispatch: Dispatch,
        gate: GateRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("Gate `{gate}` panicked for \"{dispatch}\": {message}")]
    #[diagnostic(code(gatehouse::gates::check_panicked))]
    CheckPanicked {
        dispatch: Dispatch,
        gate: GateRef,
        message: String,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(gatehouse::gates::io))]
    Io(#[from] std::io::Error),
}

impl GateError {
    /// True for errors caused by the rules or the gates themselves being
    /// wrong, as opposed to a gate failing at runtime.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            GateError::CheckFailed { .. } | GateError::CheckPanicked { .. }
        )
    }
}

/// Where configuration errors and failing gates are reported.
pub trait ErrorSink: Send + Sync {
    fn error(&self, message: &str, error: &GateError);
}

/// Reports through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn error(&self, message: &str, error: &GateError) {
        tracing::error!(
            error = ?error,
            configuration = error.is_configuration(),
            "{message}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_dispatch() {
        let err = GateError::InvalidGateResult {
            dispatch: Dispatch::new("users", "show"),
            found: "number (42)".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"users.show\""));
        assert!(msg.contains("number (42)"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_check_failed_keeps_source() {
        let err = GateError::CheckFailed {
            dispatch: Dispatch::new("users", "show"),
            gate: GateRef::new("owner"),
            source: anyhow::anyhow!("boom"),
        };
        assert!(err.to_string().ends_with("boom"));
        assert_eq!(std::error::Error::source(&err).unwrap().to_string(), "boom");
        assert!(!err.is_configuration());
    }
}
