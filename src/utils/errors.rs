// src/utils/errors.rs
//! Error taxonomy for the interception pipeline
//!
//! Every failure class a caller can observe has its own variant so that
//! "took too long" is distinguishable from "target failed" and from
//! "handler refused the call". The pipeline never wraps a failure
//! implicitly; an uncaught failure surfaces exactly as it was raised.

use std::time::Duration;
use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, InterceptError>;

/// Failures raised by interceptors, handlers, or real targets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterceptError {
    /// The target's shape is incompatible with the chosen interceptor
    /// strategy. Surfaced immediately by `intercept`, never retried.
    #[error("target not interceptable: {0}")]
    UnsupportedTarget(String),

    /// A member was requested that the proxy's capability set does not
    /// expose (typed strategies only; the dynamic strategy accepts any).
    #[error("unknown member: {member}")]
    UnknownMember { member: String },

    /// A failure raised inside a handler or by the real target during
    /// `proceed`. Propagates through every enclosing handler unless one
    /// explicitly recovers it.
    #[error("chain failure: {0}")]
    Chain(String),

    /// A timeout-style handler gave up waiting for `proceed`.
    #[error("member '{member}' timed out after {limit:?}")]
    Timeout { member: String, limit: Duration },

    /// A validation handler rejected the call before `proceed`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An access-control handler denied the call before `proceed`.
    #[error("access denied: {0}")]
    Authorization(String),

    /// Proxy shape synthesis failed (malformed capability set or an
    /// unsupported member shape). Fatal for that generation request only;
    /// other cache keys are unaffected.
    #[error("shape generation failed: {0}")]
    Generation(String),

    /// Configuration loading or lookup error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl InterceptError {
    /// True for the failure classes raised before `proceed`, i.e. the real
    /// target is guaranteed to never have been reached.
    pub fn is_pre_invocation(&self) -> bool {
        matches!(
            self,
            InterceptError::Validation(_) | InterceptError::Authorization(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_member() {
        let err = InterceptError::Timeout {
            member: "fetch".to_string(),
            limit: Duration::from_millis(50),
        };
        assert!(err.to_string().contains("fetch"));
    }

    #[test]
    fn test_pre_invocation_classes() {
        assert!(InterceptError::Validation("rule".into()).is_pre_invocation());
        assert!(InterceptError::Authorization("denied".into()).is_pre_invocation());
        assert!(!InterceptError::Chain("boom".into()).is_pre_invocation());
    }

    #[test]
    fn test_errors_compare_by_value() {
        assert_eq!(
            InterceptError::Chain("boom".into()),
            InterceptError::Chain("boom".into())
        );
        assert_ne!(
            InterceptError::Chain("boom".into()),
            InterceptError::Validation("boom".into())
        );
    }
}
