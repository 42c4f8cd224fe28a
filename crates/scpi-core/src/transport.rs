//! Transport capability seen by the property layer.
//!
//! The core never opens connections itself. A concrete transport (raw socket,
//! serial port, VISA session, or [`MockTransport`](crate::mock::MockTransport))
//! is handed to a [`Session`](crate::session::Session), which becomes its
//! exclusive owner.

use crate::error::TransportError;
use std::time::Duration;

/// Message-based command/response channel to one instrument.
///
/// Implementations are blocking. Timeouts are a property of the transport and
/// must surface as [`TransportError::Timeout`].
pub trait Transport: Send {
    /// Send `command`, wait `delay` if given, then read and return one reply line.
    fn query(&mut self, command: &str, delay: Option<Duration>) -> Result<String, TransportError>;

    /// Send `command` without expecting a reply.
    fn write(&mut self, command: &str) -> Result<(), TransportError>;

    /// Release the underlying resource.
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn query(&mut self, command: &str, delay: Option<Duration>) -> Result<String, TransportError> {
        (**self).query(command, delay)
    }

    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        (**self).write(command)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
