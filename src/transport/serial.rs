//! Serial-line transport (`ASRL<path>::INSTR`).

use super::{PendingInput, StreamTransport};
use crate::config::TransportSettings;
use scpi_core::{ScpiError, ScpiResult};
use serialport::{ClearBuffer, SerialPort};
use std::io;
use tracing::debug;

/// Serial transport.
pub type SerialTransport = StreamTransport<Box<dyn SerialPort>>;

impl PendingInput for Box<dyn SerialPort> {
    fn discard_pending(&mut self) -> io::Result<usize> {
        let pending = self.bytes_to_read()? as usize;
        self.clear(ClearBuffer::Input)?;
        Ok(pending)
    }
}

/// Open `path` at the configured baud rate and timeout.
pub fn open(resource: &str, path: &str, settings: &TransportSettings) -> ScpiResult<SerialTransport> {
    debug!(resource, path, baud_rate = settings.baud_rate, "Opening serial port");
    let port = serialport::new(path, settings.baud_rate)
        .timeout(settings.timeout())
        .open()
        .map_err(|e| ScpiError::connection(resource, e.to_string()))?;
    Ok(StreamTransport::new(port, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_port_is_connection_error() {
        let result = open(
            "ASRL/dev/does-not-exist::INSTR",
            "/dev/does-not-exist",
            &TransportSettings::default(),
        );
        assert!(matches!(result, Err(ScpiError::Connection { .. })));
    }
}
