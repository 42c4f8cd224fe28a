//! Raw SCPI socket transport (`TCPIP::host::port::SOCKET`).

use super::{PendingInput, StreamTransport};
use crate::config::TransportSettings;
use scpi_core::{ScpiError, ScpiResult};
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Socket transport.
pub type TcpTransport = StreamTransport<TcpStream>;

impl PendingInput for TcpStream {
    fn discard_pending(&mut self) -> io::Result<usize> {
        self.set_nonblocking(true)?;
        let mut scratch = [0u8; 256];
        let mut discarded = 0;
        let result = loop {
            match self.read(&mut scratch) {
                // EOF is reported by the next read.
                Ok(0) => break Ok(discarded),
                Ok(n) => discarded += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(discarded),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e),
            }
        };
        self.set_nonblocking(false)?;
        result
    }
}

/// Connect to `host:port` with the configured timeout applied to connect,
/// reads and writes.
pub fn connect(
    resource: &str,
    host: &str,
    port: u16,
    settings: &TransportSettings,
) -> ScpiResult<TcpTransport> {
    let timeout = settings.timeout();
    let addresses = (host, port)
        .to_socket_addrs()
        .map_err(|e| ScpiError::connection(resource, format!("cannot resolve host: {}", e)))?;

    let mut last_error = None;
    for address in addresses {
        debug!(resource, %address, "Connecting");
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(timeout))
                    .and_then(|_| stream.set_write_timeout(Some(timeout)))
                    .and_then(|_| stream.set_nodelay(true))
                    .map_err(|e| ScpiError::connection(resource, e.to_string()))?;
                return Ok(StreamTransport::new(stream, settings));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(ScpiError::connection(
        resource,
        last_error.map_or_else(|| "host resolved to no address".to_string(), |e| e.to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scpi_core::{Transport, TransportError};
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_socket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "*IDN?\n");
            writer.write_all(b"RIGOL TECHNOLOGIES,MSO5074,DS5A1,00.01\n").unwrap();
        });

        let resource = format!("TCPIP0::127.0.0.1::{}::SOCKET", port);
        let mut transport = connect(&resource, "127.0.0.1", port, &TransportSettings::default()).unwrap();
        assert_eq!(
            transport.query("*IDN?", None).unwrap(),
            "RIGOL TECHNOLOGIES,MSO5074,DS5A1,00.01"
        );
        server.join().unwrap();
    }

    #[test]
    fn test_refused_connection_is_connection_error() {
        // Bind then drop to obtain a port with nothing listening.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let result = connect("TCPIP0::127.0.0.1::0::SOCKET", "127.0.0.1", port, &TransportSettings::default());
        assert!(matches!(result, Err(ScpiError::Connection { .. })));
    }

    #[test]
    fn test_reply_after_timeout_is_discarded() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "CHANNEL1:SCALE?\n");
            thread::sleep(Duration::from_millis(200));
            writer.write_all(b"1.000000E+00\n").unwrap();

            line.clear();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "CHANNEL2:SCALE?\n");
            writer.write_all(b"2.000000E-01\n").unwrap();
        });

        let settings = TransportSettings {
            timeout_ms: 100,
            ..Default::default()
        };
        let resource = format!("TCPIP0::127.0.0.1::{}::SOCKET", port);
        let mut transport = connect(&resource, "127.0.0.1", port, &settings).unwrap();

        assert!(matches!(
            transport.query("CHANNEL1:SCALE?", None),
            Err(TransportError::Timeout { .. })
        ));
        // Let the late reply land before asking again.
        thread::sleep(Duration::from_millis(400));
        assert_eq!(transport.query("CHANNEL2:SCALE?", None).unwrap(), "2.000000E-01");
        server.join().unwrap();
    }
}
