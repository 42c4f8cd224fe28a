//! Mock transport for testing
//!
//! `MockTransport` implements [`Transport`] without any hardware. It provides:
//! - Scripted replies per query command
//! - A call log for verifying the exact wire traffic
//! - Controllable one-shot failure injection
//!
//! Clones share state, so a test keeps one clone for inspection and hands the
//! other to a [`Session`](crate::session::Session).

use crate::error::TransportError;
use crate::transport::Transport;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Query {
        command: String,
        delay: Option<Duration>,
    },
    Write {
        command: String,
    },
}

impl MockCall {
    /// The command text of the call.
    pub fn command(&self) -> &str {
        match self {
            MockCall::Query { command, .. } | MockCall::Write { command } => command,
        }
    }
}

#[derive(Default)]
struct MockState {
    replies: HashMap<String, String>,
    calls: Vec<MockCall>,
    fail_next: bool,
    closed: bool,
}

/// Mock transport with scripted replies
///
/// # Example
///
/// ```
/// use scpi_core::mock::MockTransport;
/// use scpi_core::transport::Transport;
///
/// let mut transport = MockTransport::new().with_reply("*IDN?", "RIGOL,MSO5074,DS5A1,00.01");
/// let handle = transport.clone();
///
/// assert_eq!(transport.query("*IDN?", None).unwrap(), "RIGOL,MSO5074,DS5A1,00.01");
/// assert_eq!(handle.query_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock transport with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply returned for `command` (builder form).
    pub fn with_reply(self, command: impl Into<String>, reply: impl Into<String>) -> Self {
        self.set_reply(command, reply);
        self
    }

    /// Script or replace the reply returned for `command`.
    pub fn set_reply(&self, command: impl Into<String>, reply: impl Into<String>) {
        self.state.lock().replies.insert(command.into(), reply.into());
    }

    /// Trigger a failure on the next query or write.
    pub fn trigger_failure(&self) {
        self.state.lock().fail_next = true;
    }

    /// Get a copy of the call log for verification.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Commands of all recorded writes, in order.
    pub fn writes(&self) -> Vec<String> {
        self.filtered(|call| matches!(call, MockCall::Write { .. }))
    }

    /// Commands of all recorded queries, in order.
    pub fn queries(&self) -> Vec<String> {
        self.filtered(|call| matches!(call, MockCall::Query { .. }))
    }

    pub fn query_count(&self) -> usize {
        self.queries().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn filtered(&self, keep: impl Fn(&MockCall) -> bool) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| keep(call))
            .map(|call| call.command().to_string())
            .collect()
    }
}

impl Transport for MockTransport {
    fn query(&mut self, command: &str, delay: Option<Duration>) -> Result<String, TransportError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Query {
            command: command.to_string(),
            delay,
        });

        if std::mem::take(&mut state.fail_next) {
            return Err(TransportError::Other("Mock query failure".to_string()));
        }

        // An unscripted query behaves like a device that never answers.
        state
            .replies
            .get(command)
            .cloned()
            .ok_or_else(|| TransportError::Timeout {
                command: command.to_string(),
                after: delay.unwrap_or_default(),
            })
    }

    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Write {
            command: command.to_string(),
        });

        if std::mem::take(&mut state.fail_next) {
            return Err(TransportError::Other("Mock write failure".to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_reply_is_returned_and_logged() {
        let mut transport = MockTransport::new().with_reply("CHANNEL1:SCALE?", "5.000000E-01");
        let handle = transport.clone();

        let reply = transport
            .query("CHANNEL1:SCALE?", Some(Duration::from_millis(5)))
            .unwrap();
        assert_eq!(reply, "5.000000E-01");
        assert_eq!(
            handle.calls(),
            vec![MockCall::Query {
                command: "CHANNEL1:SCALE?".to_string(),
                delay: Some(Duration::from_millis(5)),
            }]
        );
    }

    #[test]
    fn unscripted_query_times_out() {
        let mut transport = MockTransport::new();
        let result = transport.query("TIMEBASE:SCALE?", None);
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[test]
    fn failure_is_one_shot() {
        let mut transport = MockTransport::new();

        transport.trigger_failure();
        assert!(transport.write("AUTOSCALE").is_err());

        // The failure flag is consumed; the next write succeeds.
        assert!(transport.write("AUTOSCALE").is_ok());
        assert_eq!(transport.write_count(), 2);
    }

    #[test]
    fn clear_calls_empties_log() {
        let mut transport = MockTransport::new();
        transport.write("CLEAR").unwrap();
        assert_eq!(transport.writes(), vec!["CLEAR".to_string()]);

        transport.clear_calls();
        assert!(transport.calls().is_empty());
    }
}
