//! Error types for role mapping rules.
//!
//! This module defines all error types used throughout the crate. Every error is
//! recoverable from the caller's point of view: a failed parse, mutation or save
//! leaves the previous in-memory state untouched.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for role mapping rules.
#[derive(Error, Debug)]
pub enum Error {
    /// A raw rule document does not follow the rule grammar
    #[error("Malformed rule document at `{path}`: {message}")]
    MalformedRule {
        /// Detailed error message
        message: String,
        /// Path of the offending node, e.g. `$.all[1].except.field`
        path: String,
    },

    /// A child index was outside the bounds of a rule group
    #[error("Rule index {index} is out of range for a group with {len} rules")]
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// Number of children in the group
        len: usize,
    },

    /// A rule kind name that has no dispatch path
    #[error("Unsupported rule type: {rule_type}")]
    UnsupportedRuleType {
        /// The unrecognized kind name
        rule_type: String,
    },

    /// Error during rule or role mapping validation
    #[error("Validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field or rule path that caused the error, if applicable
        field: Option<String>,
    },

    /// Error in a field value pattern (wildcard or regex)
    #[error("Expression error: {message}")]
    Expression {
        /// Detailed error message
        message: String,
        /// The expression that failed
        expression: Option<String>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
        /// Configuration key that caused the error
        key: Option<String>,
    },

    /// The requested role mapping does not exist
    #[error("Role mapping not found: {name}")]
    NotFound {
        /// Name of the role mapping
        name: String,
    },

    /// Integration error with the role mapping API
    #[error("Integration error with {service}: {message}")]
    Integration {
        /// Name of the external service
        service: String,
        /// Detailed error message
        message: String,
        /// HTTP status of the response, if one was received
        status: Option<u16>,
    },

    /// Telemetry/logging setup error
    #[error("Telemetry error: {message}")]
    Telemetry {
        /// Detailed error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Internal error (unexpected condition)
    #[error("Internal error: {message}")]
    Internal {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Create a malformed rule document error at the given path.
    pub fn malformed(message: impl Into<String>, path: impl Into<String>) -> Self {
        Error::MalformedRule {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { index, len }
    }

    /// Create an unsupported rule type error.
    pub fn unsupported_rule_type(rule_type: impl Into<String>) -> Self {
        Error::UnsupportedRuleType {
            rule_type: rule_type.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an expression error with expression context.
    pub fn expression_with_expr(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Error::Expression {
            message: message.into(),
            expression: Some(expression.into()),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context.
    pub fn config_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Error::NotFound { name: name.into() }
    }

    /// Create an integration error.
    pub fn integration(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Integration {
            service: service.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create an integration error for an HTTP response with `status`.
    pub fn integration_status(
        service: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Error::Integration {
            service: service.into(),
            message: message.into(),
            status: Some(status),
        }
    }

    /// Create a telemetry error.
    pub fn telemetry(message: impl Into<String>) -> Self {
        Error::Telemetry {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Check if retrying the same operation may succeed. Transport failures
    /// and 5xx responses qualify; rejected requests do not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Integration { status: None, .. } => true,
            Error::Integration {
                status: Some(status),
                ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Error::MalformedRule { .. } => "malformed_rule",
            Error::IndexOutOfRange { .. } => "index_out_of_range",
            Error::UnsupportedRuleType { .. } => "unsupported_rule_type",
            Error::Validation { .. } => "validation",
            Error::Expression { .. } => "expression",
            Error::Config { .. } => "config",
            Error::NotFound { .. } => "not_found",
            Error::Integration { .. } => "integration",
            Error::Telemetry { .. } => "telemetry",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Yaml(_) => "yaml",
            Error::Internal { .. } => "internal",
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Add field context to validation errors.
    fn with_field(self, field: impl Into<String>) -> Result<T>;

    /// Prefix the path of malformed rule errors, used when a rule document is
    /// nested inside a larger object such as a role mapping.
    fn within(self, prefix: &str) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn with_field(self, field: impl Into<String>) -> Result<T> {
        self.map_err(|e| match e {
            Error::Validation { message, .. } => Error::Validation {
                message,
                field: Some(field.into()),
            },
            other => other,
        })
    }

    fn within(self, prefix: &str) -> Result<T> {
        self.map_err(|e| match e {
            Error::MalformedRule { message, path } => Error::MalformedRule {
                message,
                path: format!("{}{}", prefix, path.trim_start_matches('$')),
            },
            other => other,
        })
    }
}
