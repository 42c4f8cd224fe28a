//! Error types for the SCPI property layer.
//!
//! `ScpiError` is the single error type returned by every property access. It
//! separates failures that happen before any I/O (permission and validation
//! errors) from failures reported by the wire (parse and transport errors), so
//! callers can decide whether a retry makes sense.
//!
//! ## Error Hierarchy
//!
//! - **`Permission`**: a property was read or written against its declared
//!   capability. No command reaches the transport.
//! - **`Parse`**: a reply did not match the expected shape. Carries the raw reply
//!   and the pattern it was matched against.
//! - **`Validation`**: a value lies outside the codec's representable domain.
//!   Raised before any I/O.
//! - **`Transport`**: the transport collaborator failed. Wrapped unchanged.
//! - **`Connection`**: a transport could not be opened for an instrument.
//! - **`Declaration`**: a property declaration itself is malformed (bad pattern
//!   syntax, template naming an unknown variable).

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results of property accesses.
pub type ScpiResult<T> = std::result::Result<T, ScpiError>;

/// Direction of a property access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Query the current value.
    Read,
    /// Send a new value.
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Access::Read => "read",
            Access::Write => "write",
        };
        write!(f, "{}", label)
    }
}

/// Failure reported by a transport collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Underlying I/O failure not covered by a more specific variant.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete reply within the transport's timeout.
    #[error("Timed out after {after:?} waiting for reply to '{command}'")]
    Timeout {
        /// Command whose reply was awaited.
        command: String,
        /// Timeout that elapsed.
        after: Duration,
    },

    /// The peer closed the connection.
    #[error("Device disconnected")]
    Disconnected,

    /// The transport is already in use by another access on the same instrument.
    #[error("Transport is busy")]
    Busy,

    /// Reply bytes violate the line protocol (e.g. not UTF-8).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Anything else, described by the transport.
    #[error("Transport error: {0}")]
    Other(String),
}

/// Primary error type of the property layer.
#[derive(Error, Debug)]
pub enum ScpiError {
    /// Property accessed against its declared read/write capability.
    ///
    /// **Error Type**: Permanent - the declaration forbids the access.
    #[error("{access} access is not allowed for property '{property}'")]
    Permission {
        /// Property name.
        property: String,
        /// The forbidden direction.
        access: Access,
    },

    /// Reply did not match the expected shape.
    ///
    /// **Error Type**: Usually permanent for a given firmware; never defaulted.
    #[error("Unable to parse reply '{raw}' with pattern '{pattern}': {reason}")]
    Parse {
        /// Reply text as received.
        raw: String,
        /// Pattern or codec label the reply was matched against.
        pattern: String,
        /// What did not match.
        reason: String,
    },

    /// Value outside the codec's representable domain.
    ///
    /// **Error Type**: Permanent for that value. Raised before any I/O.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Transport collaborator failed.
    ///
    /// **Error Type**: May be transient. Never retried inside the core.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Transport could not be opened.
    #[error("Failed to connect to '{resource}': {reason}")]
    Connection {
        /// Resource string of the instrument.
        resource: String,
        /// Why opening failed.
        reason: String,
    },

    /// Malformed property declaration.
    #[error("Invalid declaration '{declaration}': {reason}")]
    Declaration {
        /// The offending pattern or template.
        declaration: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ScpiError {
    pub(crate) fn permission(property: &str, access: Access) -> Self {
        ScpiError::Permission {
            property: property.to_string(),
            access,
        }
    }

    /// Builds a [`ScpiError::Parse`] for `raw` against `pattern`.
    pub fn parse(raw: &str, pattern: &str, reason: impl Into<String>) -> Self {
        ScpiError::Parse {
            raw: raw.to_string(),
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds a [`ScpiError::Connection`] for `resource`.
    pub fn connection(resource: &str, reason: impl Into<String>) -> Self {
        ScpiError::Connection {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn declaration(declaration: &str, reason: impl Into<String>) -> Self {
        ScpiError::Declaration {
            declaration: declaration.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the error was raised before any command reached the transport.
    pub fn is_pre_io(&self) -> bool {
        matches!(
            self,
            ScpiError::Permission { .. } | ScpiError::Validation(_) | ScpiError::Declaration { .. }
        )
    }
}
