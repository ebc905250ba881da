//! Shared error taxonomy (§7 of the design spec).
//!
//! Every component-level error enum implements [`Categorized`] so the pipeline can decide,
//! without matching on variants, whether a failure is recoverable and how it should be
//! surfaced: retried under a circuit breaker, rejected at the boundary, or bubbled up and
//! recorded against the current `kill_id`.

use std::fmt;

/// The category an error belongs to, matching the table in §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Timeout,
    Validation,
    Authorization,
    RateLimit,
    Internal,
    External,
    Configuration,
}

impl ErrorCategory {
    /// Whether the pipeline may retry an operation that failed with this category.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorCategory::Connection
                | ErrorCategory::Timeout
                | ErrorCategory::RateLimit
                | ErrorCategory::External
        )
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Connection => "connection",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Internal => "internal",
            ErrorCategory::External => "external",
            ErrorCategory::Configuration => "configuration",
        };
        f.write_str(s)
    }
}

/// Implemented by every component error enum so callers can branch on recoverability
/// without depending on that component's concrete error type.
pub trait Categorized {
    fn category(&self) -> ErrorCategory;

    fn is_recoverable(&self) -> bool {
        self.category().is_recoverable()
    }
}
