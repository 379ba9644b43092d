//! Advisor error types
//!
//! Error codes:
//! - RULEGATE_INVALID_AST (REJECT)
//!
//! Selection, coverage and minimization are total functions. The only way
//! the pipeline fails is an aggregation the advisor cannot read, which means
//! the rule itself is invalid. Retrying never helps.

use std::fmt;

/// Severity levels for advisor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The triggering operation (usually publication) is rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Advisor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisorErrorCode {
    /// Aggregation node cannot be turned into a query shape
    InvalidAst,
}

impl AdvisorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            AdvisorErrorCode::InvalidAst => "RULEGATE_INVALID_AST",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for AdvisorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Advisor error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisorError {
    /// Error code
    code: AdvisorErrorCode,
    /// Human-readable message
    message: String,
    /// Table of the offending aggregation, if known
    table: Option<String>,
}

impl AdvisorError {
    /// Create an invalid AST error
    pub fn invalid_ast(reason: impl Into<String>) -> Self {
        Self {
            code: AdvisorErrorCode::InvalidAst,
            message: reason.into(),
            table: None,
        }
    }

    /// Create an invalid AST error attached to a table
    pub fn invalid_ast_on(table: impl Into<String>, reason: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            code: AdvisorErrorCode::InvalidAst,
            message: format!("aggregation on '{}': {}", table, reason.into()),
            table: Some(table),
        }
    }

    /// Create an error for a filter whose table differs from its aggregator's
    pub fn table_mismatch(aggregator_table: &str, filter_table: &str) -> Self {
        Self::invalid_ast_on(
            aggregator_table,
            format!("filter reads table '{}'", filter_table),
        )
    }

    /// Create an error for an unrecognized filter operator
    pub fn unknown_operator(table: &str, operator: &str) -> Self {
        Self::invalid_ast_on(table, format!("unknown filter operator '{}'", operator))
    }

    /// Returns the error code
    pub fn code(&self) -> AdvisorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the table of the offending aggregation
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Advisor errors describe invalid rules, never transient conditions
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for AdvisorError {}

/// Result type for advisor operations
pub type AdvisorResult<T> = Result<T, AdvisorError>;
