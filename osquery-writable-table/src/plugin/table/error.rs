//! Errors raised while serving a table call.
//!
//! Every error ends up as the message of a status-`1` response. The message
//! is always `"<stage>: <detail>"`, so the host can tell where a call failed
//! from the text alone.

use thiserror::Error;

/// A request payload could not be decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The `context` payload is not valid query-context JSON.
    #[error("unmarshaling context JSON: {0}")]
    Context(#[source] serde_json::Error),

    /// The context JSON is well formed but describes an invalid constraint.
    #[error("invalid constraint on column {column}: {reason}")]
    Constraint {
        /// Column the constraint list belongs to.
        column: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The `json_value_array` payload is not a JSON array.
    #[error("unmarshaling values JSON: {0}")]
    Values(#[source] serde_json::Error),
}

/// A generate, insert or delete callback failed.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("call cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Failed(String),

    /// The callback panicked; the payload is the panic message when it was a
    /// string.
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    pub fn failed(message: impl Into<String>) -> Self {
        CallbackError::Failed(message.into())
    }
}

/// Failure of a whole `call`, rendered into the response message.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("error parsing context JSON: {0}")]
    Context(#[source] ParseError),

    #[error("error parsing value array json: {0}")]
    ValueArray(#[source] ParseError),

    // Shared by generate, insert and delete; osquery hosts match on it.
    #[error("error generating table: {0}")]
    Callback(#[source] CallbackError),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn json_error(raw: &str) -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>(raw).expect_err("input must be malformed")
    }

    #[test]
    fn test_parse_error_messages() {
        let err = ParseError::Constraint {
            column: "name".to_string(),
            reason: "unknown operator code: 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid constraint on column name: unknown operator code: 3"
        );

        let err = ParseError::Values(json_error("[1,"));
        assert!(err.to_string().starts_with("unmarshaling values JSON: "));
    }

    #[test]
    fn test_callback_error_messages() {
        assert_eq!(CallbackError::Cancelled.to_string(), "call cancelled");
        assert_eq!(CallbackError::DeadlineExceeded.to_string(), "deadline exceeded");
        assert_eq!(CallbackError::failed("disk full").to_string(), "disk full");
        assert_eq!(
            CallbackError::Panicked("boom".to_string()).to_string(),
            "callback panicked: boom"
        );
    }

    #[test]
    fn test_dispatch_error_prefixes() {
        let err = DispatchError::Context(ParseError::Context(json_error("{")));
        assert!(err
            .to_string()
            .starts_with("error parsing context JSON: unmarshaling context JSON: "));

        let err = DispatchError::ValueArray(ParseError::Values(json_error("nope")));
        assert!(err.to_string().starts_with("error parsing value array json: "));

        let err = DispatchError::Callback(CallbackError::failed("no such row"));
        assert_eq!(err.to_string(), "error generating table: no such row");

        let err = DispatchError::UnknownAction("frobnicate".to_string());
        assert_eq!(err.to_string(), "unknown action: frobnicate");
    }
}
