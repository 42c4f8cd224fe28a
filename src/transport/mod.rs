//! Concrete transports.
//!
//! Resources are addressed with VISA-style strings:
//!
//! | Resource                              | Transport          |
//! |---------------------------------------|--------------------|
//! | `TCPIP0::192.168.1.10::5555::SOCKET`  | raw SCPI socket    |
//! | `ASRL/dev/ttyUSB0::INSTR`             | serial line        |
//! | `ASRL3::INSTR`                        | serial line `COM3` |
//!
//! Every transport is a line protocol: commands get the write termination
//! appended, replies are read up to the read termination. Input left over from
//! an earlier query (a reply that arrived after its timeout) is discarded
//! before the next command is sent. No discovery and no reconnects; a failed
//! open is a [`ScpiError::Connection`].

pub mod tcp;

#[cfg(feature = "instrument_serial")]
pub mod serial;

use crate::config::TransportSettings;
use scpi_core::{ScpiError, ScpiResult, Transport, TransportError};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Parsed resource string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAddress {
    /// `TCPIP[n]::<host>::<port>::SOCKET`
    Socket { host: String, port: u16 },
    /// `ASRL<path>::INSTR`
    Serial { path: String },
}

impl FromStr for ResourceAddress {
    type Err = ScpiError;

    fn from_str(resource: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = resource.trim().split("::").collect();
        let kind = parts.first().map(|p| p.to_ascii_uppercase()).unwrap_or_default();
        let suffix = parts.last().map(|p| p.to_ascii_uppercase()).unwrap_or_default();

        if kind.starts_with("TCPIP") {
            let board = &kind["TCPIP".len()..];
            if !board.chars().all(|c| c.is_ascii_digit()) {
                return Err(ScpiError::connection(resource, "invalid TCPIP board number"));
            }
            return match parts.as_slice() {
                [_, host, port, _] if suffix == "SOCKET" => {
                    let port = port
                        .parse::<u16>()
                        .map_err(|e| ScpiError::connection(resource, format!("invalid port: {}", e)))?;
                    if host.is_empty() {
                        return Err(ScpiError::connection(resource, "empty host"));
                    }
                    Ok(ResourceAddress::Socket {
                        host: host.to_string(),
                        port,
                    })
                }
                _ => Err(ScpiError::connection(
                    resource,
                    "only raw SOCKET resources are supported over TCPIP",
                )),
            };
        }

        if kind.starts_with("ASRL") && parts.len() == 2 && suffix == "INSTR" {
            let target = &parts[0]["ASRL".len()..];
            if target.is_empty() {
                return Err(ScpiError::connection(resource, "missing serial port"));
            }
            let path = if target.chars().all(|c| c.is_ascii_digit()) {
                format!("COM{}", target)
            } else {
                target.to_string()
            };
            return Ok(ResourceAddress::Serial { path });
        }

        Err(ScpiError::connection(resource, "unsupported resource string"))
    }
}

/// Open the transport for `resource`.
pub fn open(resource: &str, settings: &TransportSettings) -> ScpiResult<Box<dyn Transport>> {
    let transport: Box<dyn Transport> = match resource.parse::<ResourceAddress>()? {
        ResourceAddress::Socket { host, port } => {
            Box::new(tcp::connect(resource, &host, port, settings)?)
        }
        ResourceAddress::Serial { path } => open_serial(resource, &path, settings)?,
    };
    info!(resource, "Transport opened");
    Ok(transport)
}

#[cfg(feature = "instrument_serial")]
fn open_serial(
    resource: &str,
    path: &str,
    settings: &TransportSettings,
) -> ScpiResult<Box<dyn Transport>> {
    Ok(Box::new(serial::open(resource, path, settings)?))
}

#[cfg(not(feature = "instrument_serial"))]
fn open_serial(
    resource: &str,
    _path: &str,
    _settings: &TransportSettings,
) -> ScpiResult<Box<dyn Transport>> {
    Err(ScpiError::connection(
        resource,
        "serial support not enabled. Rebuild with --features instrument_serial",
    ))
}

/// Byte streams that can drop input already waiting to be read.
pub trait PendingInput {
    /// Discard whatever is readable without blocking. Returns the number of
    /// bytes dropped.
    fn discard_pending(&mut self) -> io::Result<usize>;
}

/// Line protocol over any byte stream.
pub struct StreamTransport<S: Read + Write> {
    stream: BufReader<S>,
    read_termination: Vec<u8>,
    write_termination: String,
    timeout: Duration,
}

impl<S: Read + Write + PendingInput> StreamTransport<S> {
    pub fn new(stream: S, settings: &TransportSettings) -> Self {
        let read_termination = if settings.read_termination.is_empty() {
            b"\n".to_vec()
        } else {
            settings.read_termination.as_bytes().to_vec()
        };
        Self {
            stream: BufReader::new(stream),
            read_termination,
            write_termination: settings.write_termination.clone(),
            timeout: settings.timeout(),
        }
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Drop buffered and pending input so the next read sees only the reply
    /// to the next command.
    fn discard_stale(&mut self, command: &str) -> Result<(), TransportError> {
        let buffered = self.stream.buffer().len();
        self.stream.consume(buffered);
        let pending = self
            .stream
            .get_mut()
            .discard_pending()
            .map_err(|e| io_error(command, self.timeout, e))?;
        if buffered + pending > 0 {
            debug!(command, bytes = buffered + pending, "Discarded stale input");
        }
        Ok(())
    }

    fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let line = format!("{}{}", command, self.write_termination);
        let timeout = self.timeout;
        let stream = self.stream.get_mut();
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| io_error(command, timeout, e))
    }

    fn receive(&mut self, command: &str) -> Result<String, TransportError> {
        let mut buffer = Vec::new();
        let last = self.read_termination[self.read_termination.len() - 1];
        loop {
            let read = self
                .stream
                .read_until(last, &mut buffer)
                .map_err(|e| io_error(command, self.timeout, e))?;
            if read == 0 {
                return Err(TransportError::Disconnected);
            }
            if buffer.ends_with(&self.read_termination) {
                break;
            }
        }
        buffer.truncate(buffer.len() - self.read_termination.len());
        String::from_utf8(buffer)
            .map_err(|e| TransportError::Protocol(format!("reply to '{}' is not UTF-8: {}", command, e)))
    }
}

impl<S: Read + Write + PendingInput + Send> Transport for StreamTransport<S> {
    fn query(&mut self, command: &str, delay: Option<Duration>) -> Result<String, TransportError> {
        self.discard_stale(command)?;
        self.send(command)?;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.receive(command)
    }

    fn write(&mut self, command: &str) -> Result<(), TransportError> {
        self.send(command)
    }
}

fn io_error(command: &str, timeout: Duration, err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout {
            command: command.to_string(),
            after: timeout,
        },
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => TransportError::Disconnected,
        _ => TransportError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Byte stream with canned input and captured output.
    struct FakeStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl FakeStream {
        fn new(input: &str) -> Self {
            Self {
                input: Cursor::new(input.as_bytes().to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for FakeStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for FakeStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // The canned input stands for replies, which only exist once a command is sent.
    impl PendingInput for FakeStream {
        fn discard_pending(&mut self) -> io::Result<usize> {
            Ok(0)
        }
    }

    /// Device that answers each command with the next scripted line. The first
    /// `late` replies arrive only after the read waiting for them gave up.
    struct LateStream {
        replies: VecDeque<&'static str>,
        late: usize,
        in_flight: Option<&'static str>,
        input: VecDeque<u8>,
    }

    impl LateStream {
        fn new(late: usize, replies: &[&'static str]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                late,
                in_flight: None,
                input: VecDeque::new(),
            }
        }
    }

    impl Read for LateStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.input.is_empty() {
                if let Some(reply) = self.in_flight.take() {
                    self.input.extend(reply.as_bytes());
                }
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.input.read(buf)
        }
    }

    impl Write for LateStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.ends_with(b"\n") {
                if let Some(reply) = self.replies.pop_front() {
                    if self.late > 0 {
                        self.late -= 1;
                        self.in_flight = Some(reply);
                    } else {
                        self.input.extend(reply.as_bytes());
                    }
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl PendingInput for LateStream {
        fn discard_pending(&mut self) -> io::Result<usize> {
            let pending = self.input.len();
            self.input.clear();
            Ok(pending)
        }
    }

    #[test]
    fn test_parse_socket_resource() {
        assert_eq!(
            "TCPIP0::192.168.1.10::5555::SOCKET".parse::<ResourceAddress>().unwrap(),
            ResourceAddress::Socket {
                host: "192.168.1.10".to_string(),
                port: 5555
            }
        );
        assert_eq!(
            "tcpip::scope.lab::5025::socket".parse::<ResourceAddress>().unwrap(),
            ResourceAddress::Socket {
                host: "scope.lab".to_string(),
                port: 5025
            }
        );
    }

    #[test]
    fn test_parse_serial_resource() {
        assert_eq!(
            "ASRL/dev/ttyUSB0::INSTR".parse::<ResourceAddress>().unwrap(),
            ResourceAddress::Serial {
                path: "/dev/ttyUSB0".to_string()
            }
        );
        assert_eq!(
            "ASRL3::INSTR".parse::<ResourceAddress>().unwrap(),
            ResourceAddress::Serial {
                path: "COM3".to_string()
            }
        );
    }

    #[test]
    fn test_unsupported_resources_are_connection_errors() {
        for resource in [
            "TCPIP0::192.168.1.10::INSTR",
            "TCPIP0::192.168.1.10::99999::SOCKET",
            "USB0::0x1AB1::0x0515::MS5A000000::INSTR",
            "ASRL::INSTR",
            "",
        ] {
            assert!(
                matches!(
                    resource.parse::<ResourceAddress>(),
                    Err(ScpiError::Connection { .. })
                ),
                "{} should be rejected",
                resource
            );
        }
    }

    #[test]
    fn test_stream_appends_and_strips_terminations() {
        let settings = TransportSettings::default();
        let mut transport = StreamTransport::new(FakeStream::new("1.000000E+00\n"), &settings);

        let reply = transport.query("CHANNEL1:SCALE?", None).unwrap();
        assert_eq!(reply, "1.000000E+00");
        transport.write("CHANNEL1:DISPLAY ON").unwrap();
        assert_eq!(
            transport.get_ref().output,
            b"CHANNEL1:SCALE?\nCHANNEL1:DISPLAY ON\n".to_vec()
        );
    }

    #[test]
    fn test_multibyte_read_termination() {
        let settings = TransportSettings {
            read_termination: "\r\n".to_string(),
            ..Default::default()
        };
        let mut transport = StreamTransport::new(FakeStream::new("A\nB\r\n"), &settings);
        assert_eq!(transport.query("*IDN?", None).unwrap(), "A\nB");
    }

    #[test]
    fn test_eof_is_disconnect() {
        let settings = TransportSettings::default();
        let mut transport = StreamTransport::new(FakeStream::new(""), &settings);
        assert!(matches!(
            transport.query("*IDN?", None),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn test_late_reply_is_not_returned_to_next_query() {
        let settings = TransportSettings::default();
        let stream = LateStream::new(1, &["1.000000E+00\n", "2.000000E-01\n"]);
        let mut transport = StreamTransport::new(stream, &settings);

        assert!(matches!(
            transport.query("CHANNEL1:SCALE?", None),
            Err(TransportError::Timeout { .. })
        ));
        assert_eq!(transport.query("CHANNEL2:SCALE?", None).unwrap(), "2.000000E-01");
    }

    #[test]
    fn test_partial_line_is_discarded_before_next_query() {
        let settings = TransportSettings::default();
        let stream = LateStream::new(0, &["2.000000E-01\n"]);
        let mut transport = StreamTransport::new(stream, &settings);
        transport.stream.get_mut().input.extend(b"1.0000".iter());

        assert_eq!(transport.query("CHANNEL2:SCALE?", None).unwrap(), "2.000000E-01");
    }
}
