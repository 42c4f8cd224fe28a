//! Root node owning the transport.

use crate::codec::ValueCodec;
use crate::error::{ScpiResult, TransportError};
use crate::node::Node;
use crate::property::InstrumentProperty;
use crate::transport::Transport;
use std::cell::RefCell;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Exclusive owner of one instrument's transport and root of its node tree.
///
/// Every property access on any node of the tree ends here. A `Session` is
/// `Send` but not `Sync`: it may move between threads, but concurrent access
/// needs external mutual exclusion.
pub struct Session {
    resource: String,
    transport: RefCell<Box<dyn Transport>>,
    identity: InstrumentProperty<String>,
}

impl Session {
    pub fn new(resource: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self::from_boxed(resource, Box::new(transport))
    }

    pub fn from_boxed(resource: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        let resource = resource.into();
        info!(resource = %resource, "Session opened");
        Self {
            resource,
            transport: RefCell::new(transport),
            identity: InstrumentProperty::new("identity", "*IDN", ValueCodec::text())
                .read_only()
                .memoized(),
        }
    }

    /// Resource string the transport was opened with.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Send `command` and return the raw reply.
    pub fn query(&self, command: &str, delay: Option<Duration>) -> ScpiResult<String> {
        let mut transport = self
            .transport
            .try_borrow_mut()
            .map_err(|_| TransportError::Busy)?;
        debug!(resource = %self.resource, command, "query");
        let reply = transport.query(command, delay)?;
        trace!(resource = %self.resource, reply = %reply.trim_end(), "reply");
        Ok(reply)
    }

    pub fn write(&self, command: &str) -> ScpiResult<()> {
        let mut transport = self
            .transport
            .try_borrow_mut()
            .map_err(|_| TransportError::Busy)?;
        debug!(resource = %self.resource, command, "write");
        transport.write(command)?;
        Ok(())
    }

    /// `*IDN?`, queried once and remembered for the lifetime of the session.
    pub fn identity(&self) -> ScpiResult<String> {
        self.identity.get(self)
    }

    /// `*RST`
    pub fn reset(&self) -> ScpiResult<()> {
        self.write("*RST")
    }

    /// `*CLS`
    pub fn clear_status(&self) -> ScpiResult<()> {
        self.write("*CLS")
    }

    /// `*OPC?`; true once all pending operations have finished.
    pub fn operation_complete(&self) -> ScpiResult<bool> {
        let raw = self.query("*OPC?", None)?;
        ValueCodec::onoff().parse(&raw)
    }

    /// Release the transport.
    pub fn close(self) -> ScpiResult<()> {
        let mut transport = self.transport.into_inner();
        transport.close()?;
        info!(resource = %self.resource, "Session closed");
        Ok(())
    }
}

impl Node for Session {
    fn session(&self) -> &Session {
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn commands_are_logged() {
        let transport = MockTransport::new().with_reply("*OPC?", "1");
        let session = Session::new("TCPIP0::10.0.0.5::5555::SOCKET", transport);

        session.write("AUTOSCALE").unwrap();
        assert!(session.operation_complete().unwrap());
        assert!(logs_contain("AUTOSCALE"));
        assert!(logs_contain("*OPC?"));
        assert!(logs_contain("Session opened"));
    }

    #[test]
    fn identity_is_queried_once() {
        let transport = MockTransport::new().with_reply("*IDN?", "RIGOL TECHNOLOGIES,MSO5074,DS5A1,00.01.02");
        let session = Session::new("mock", transport.clone());

        assert_eq!(
            session.identity().unwrap(),
            "RIGOL TECHNOLOGIES,MSO5074,DS5A1,00.01.02"
        );
        transport.set_reply("*IDN?", "OTHER");
        assert_eq!(
            session.identity().unwrap(),
            "RIGOL TECHNOLOGIES,MSO5074,DS5A1,00.01.02"
        );
        assert_eq!(transport.query_count(), 1);
    }

    #[test]
    fn identity_is_per_session() {
        let first = MockTransport::new().with_reply("*IDN?", "SIGLENT,SDG2042X,1,2");
        let second = MockTransport::new().with_reply("*IDN?", "SIGLENT,SDG1032X,3,4");

        assert_eq!(
            Session::new("a", first).identity().unwrap(),
            "SIGLENT,SDG2042X,1,2"
        );
        assert_eq!(
            Session::new("b", second).identity().unwrap(),
            "SIGLENT,SDG1032X,3,4"
        );
    }

    #[test]
    fn common_commands() {
        let transport = MockTransport::new().with_reply("*OPC?", "1");
        let session = Session::new("mock", transport.clone());

        session.reset().unwrap();
        session.clear_status().unwrap();
        assert!(session.operation_complete().unwrap());
        assert_eq!(transport.writes(), vec!["*RST", "*CLS"]);

        session.close().unwrap();
        assert!(transport.is_closed());
    }
}
