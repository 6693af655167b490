//! Error types for host automation.

use thiserror::Error;

/// A single late-bound call was rejected by the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("{type_name} has no member '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("{type_name}.{member} rejected its arguments: {detail}")]
    BadArguments {
        type_name: String,
        member: String,
        detail: String,
    },

    #[error("{type_name}.{member} is read-only")]
    ReadOnly { type_name: String, member: String },

    #[error("{type_name}.{member} raised: {message}")]
    Raised {
        type_name: String,
        member: String,
        message: String,
    },

    #[error("{member}: expected {expected}, got {found}")]
    TypeMismatch {
        member: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl DispatchError {
    pub fn unknown(type_name: &str, member: &str) -> Self {
        Self::UnknownMember {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }

    pub fn bad_args(type_name: &str, member: &str, detail: impl Into<String>) -> Self {
        Self::BadArguments {
            type_name: type_name.to_string(),
            member: member.to_string(),
            detail: detail.into(),
        }
    }

    pub fn read_only(type_name: &str, member: &str) -> Self {
        Self::ReadOnly {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }

    pub fn raised(type_name: &str, member: &str, message: impl Into<String>) -> Self {
        Self::Raised {
            type_name: type_name.to_string(),
            member: member.to_string(),
            message: message.into(),
        }
    }

    /// True when the host executed the call and reported a failure, as opposed
    /// to rejecting the call shape itself.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Raised { .. })
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failure of a host-level operation, classified by the step that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Model load failed: {message}")]
    ModelLoad { message: String },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Move failed for {target}: {detail}")]
    Move { target: String, detail: String },

    #[error("Mesh failed: {detail}")]
    Mesh { detail: String },

    #[error("Solve failed: {detail}")]
    Solve { detail: String },

    #[error("Extraction failed: {detail}")]
    Extraction { detail: String },

    #[error("Field assignment failed for label '{label}': {detail}")]
    Field { label: String, detail: String },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

pub type HostResult<T> = Result<T, HostError>;
