//! We use this mocking module in unit tests to emulate the load's serial link.
//!
//! A [`MockConnector`] hands out [`MockSerial`] ports that all share one
//! [`MockLine`]. Tests keep a [`MockHandle`] to the line so they can inject
//! bytes from the "load" and inspect what the session transmitted while the
//! session's threads own the port.

use std::{sync::Arc, thread, time::Duration};

use parking_lot::Mutex;

use crate::transport::Connect;

const WRITE_CAPACITY: usize = 4096;
const READ_CAPACITY: usize = 1024;

/// State of the emulated wire.
struct MockLine {
    /// Bytes written by the session. Cleared when full, frames stay aligned
    /// as long as writes are whole frames.
    write_buffer: heapless::Vec<u8, WRITE_CAPACITY>,
    /// Every byte ever written.
    total_written: usize,
    /// Bytes waiting to be read by the session.
    read_buffer: heapless::Deque<u8, READ_CAPACITY>,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Flag to simulate an open failure
    should_error_on_open: bool,
    /// Flag to simulate a flush failure when the port is released
    should_error_on_flush: bool,
    /// Return `Ok(0)` rather than a timeout error when nothing is pending.
    zero_on_timeout: bool,
    read_timeout: Duration,
    /// Reads that found nothing pending and waited out the timeout.
    idle_reads: usize,
    /// Set once the open port has been dropped.
    closed: bool,
    /// Port operations attempted after `closed` was set.
    calls_after_close: usize,
    opens: usize,
    last_open: Option<(String, u32, Duration)>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MockSerialError {
    /// Simulated timeout error
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
    /// The port was used after being released
    Closed,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
            MockSerialError::Closed => embedded_io::ErrorKind::NotConnected,
        }
    }
}

/// Test-side view of the line.
#[derive(Clone)]
pub struct MockHandle(Arc<Mutex<MockLine>>);

impl MockHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(MockLine {
            write_buffer: heapless::Vec::new(),
            total_written: 0,
            read_buffer: heapless::Deque::new(),
            should_error_on_write: false,
            should_error_on_read: false,
            should_error_on_open: false,
            should_error_on_flush: false,
            zero_on_timeout: false,
            read_timeout: Duration::from_millis(1),
            idle_reads: 0,
            closed: false,
            calls_after_close: 0,
            opens: 0,
            last_open: None,
        })))
    }

    /// Queue bytes as if sent by the load.
    pub fn push_read_data(&self, data: &[u8]) -> Result<(), MockSerialError> {
        let mut line = self.0.lock();
        for &byte in data {
            line.read_buffer
                .push_back(byte)
                .map_err(|_| MockSerialError::BufferOverflow)?;
        }
        Ok(())
    }

    pub fn pending_read(&self) -> usize {
        self.0.lock().read_buffer.len()
    }

    /// Get a copy of the data written since the buffer was last cleared.
    pub fn written_data(&self) -> Vec<u8> {
        self.0.lock().write_buffer.to_vec()
    }

    pub fn total_written(&self) -> usize {
        self.0.lock().total_written
    }

    pub fn clear_written_data(&self) {
        self.0.lock().write_buffer.clear();
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&self, should_error: bool) {
        self.0.lock().should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&self, should_error: bool) {
        self.0.lock().should_error_on_read = should_error;
    }

    pub fn set_open_error(&self, should_error: bool) {
        self.0.lock().should_error_on_open = should_error;
    }

    pub fn set_flush_error(&self, should_error: bool) {
        self.0.lock().should_error_on_flush = should_error;
    }

    pub fn set_zero_on_timeout(&self, zero: bool) {
        self.0.lock().zero_on_timeout = zero;
    }

    /// Number of reads that started waiting for the timeout so far.
    pub fn idle_reads(&self) -> usize {
        self.0.lock().idle_reads
    }

    pub fn is_closed(&self) -> bool {
        self.0.lock().closed
    }

    pub fn calls_after_close(&self) -> usize {
        self.0.lock().calls_after_close
    }

    pub fn opens(&self) -> usize {
        self.0.lock().opens
    }

    pub fn last_open(&self) -> Option<(String, u32, Duration)> {
        self.0.lock().last_open.clone()
    }

    /// Checks the closed marker, counting any access after release.
    fn guard(line: &mut MockLine) -> Result<(), MockSerialError> {
        if line.closed {
            line.calls_after_close += 1;
            return Err(MockSerialError::Closed);
        }
        Ok(())
    }
}

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    line: MockHandle,
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut line = self.line.0.lock();
        MockHandle::guard(&mut line)?;
        if line.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        if buf.len() > WRITE_CAPACITY {
            return Err(MockSerialError::BufferOverflow);
        }
        if line.write_buffer.len() + buf.len() > WRITE_CAPACITY {
            line.write_buffer.clear();
        }
        line.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        line.total_written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let mut line = self.line.0.lock();
        MockHandle::guard(&mut line)?;
        if line.should_error_on_write || line.should_error_on_flush {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let timeout = {
            let mut line = self.line.0.lock();
            MockHandle::guard(&mut line)?;
            if line.should_error_on_read {
                return Err(MockSerialError::SimulatedError);
            }
            if !line.read_buffer.is_empty() {
                let mut count = 0;
                while count < buf.len() {
                    match line.read_buffer.pop_front() {
                        Some(byte) => {
                            buf[count] = byte;
                            count += 1;
                        }
                        None => break,
                    }
                }
                return Ok(count);
            }
            line.idle_reads += 1;
            line.read_timeout
        };

        // Nothing pending, block like a real port would until the timeout.
        thread::sleep(timeout);
        if self.line.0.lock().zero_on_timeout {
            Ok(0)
        } else {
            Err(MockSerialError::Timeout)
        }
    }
}

impl Drop for MockSerial {
    fn drop(&mut self) {
        self.line.0.lock().closed = true;
    }
}

/// Hands out [`MockSerial`] ports bound to one shared line.
pub struct MockConnector {
    line: MockHandle,
}

impl MockConnector {
    pub fn new() -> (Self, MockHandle) {
        let line = MockHandle::new();
        (Self { line: line.clone() }, line)
    }
}

impl Connect for MockConnector {
    type Port = MockSerial;

    fn open(
        &mut self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<MockSerial, MockSerialError> {
        let mut line = self.line.0.lock();
        if line.should_error_on_open {
            return Err(MockSerialError::SimulatedError);
        }
        line.closed = false;
        line.opens += 1;
        line.read_timeout = read_timeout;
        line.last_open = Some((port.into(), baud_rate, read_timeout));
        Ok(MockSerial {
            line: self.line.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    fn open() -> (MockSerial, MockHandle) {
        let (mut connector, handle) = MockConnector::new();
        let port = connector
            .open("mock", 115_200, Duration::from_millis(1))
            .unwrap();
        (port, handle)
    }

    #[test]
    fn test_new_mock_serial() {
        let (_port, handle) = open();
        assert_eq!(handle.written_data().len(), 0);
        assert_eq!(handle.pending_read(), 0);
        assert_eq!(handle.opens(), 1);
        assert_eq!(
            handle.last_open(),
            Some(("mock".into(), 115_200, Duration::from_millis(1)))
        );
    }

    #[test]
    fn test_write_multiple_times() {
        let (mut port, handle) = open();
        port.write_all(b"Hello, ").unwrap();
        port.write_all(b"World!").unwrap();
        assert_eq!(handle.written_data(), b"Hello, World!");
        assert_eq!(handle.total_written(), 13);
    }

    #[test]
    fn test_write_wraps_when_full() {
        let (mut port, handle) = open();
        let frame = [0xAAu8; 64];
        for _ in 0..(WRITE_CAPACITY / 64 + 1) {
            port.write_all(&frame).unwrap();
        }
        assert_eq!(handle.written_data().len(), 64);
        assert_eq!(handle.total_written(), WRITE_CAPACITY + 64);
    }

    #[test]
    fn test_read_partial_data() {
        let (mut port, handle) = open();
        handle.push_read_data(b"Long response data").unwrap();

        let mut buffer = [0u8; 5];
        assert_eq!(port.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
        assert_eq!(handle.pending_read(), 13);
    }

    #[test]
    fn test_read_timeout_when_no_data() {
        let (mut port, handle) = open();
        let mut buffer = [0u8; 10];
        assert_eq!(port.read(&mut buffer), Err(MockSerialError::Timeout));

        handle.set_zero_on_timeout(true);
        assert_eq!(port.read(&mut buffer), Ok(0));
        assert_eq!(handle.idle_reads(), 2);
    }

    #[test]
    fn test_error_simulation() {
        let (mut port, handle) = open();
        handle.set_write_error(true);
        assert_eq!(port.write(b"test"), Err(MockSerialError::SimulatedError));
        assert!(handle.written_data().is_empty());
        handle.set_write_error(false);

        handle.push_read_data(b"data").unwrap();
        handle.set_read_error(true);
        let mut buffer = [0u8; 10];
        assert_eq!(port.read(&mut buffer), Err(MockSerialError::SimulatedError));
        handle.set_read_error(false);
        assert_eq!(port.read(&mut buffer), Ok(4));

        handle.set_flush_error(true);
        assert!(port.flush().is_err());
    }

    #[test]
    fn test_open_error() {
        let (mut connector, handle) = MockConnector::new();
        handle.set_open_error(true);
        assert!(connector.open("mock", 9_600, Duration::ZERO).is_err());
        assert_eq!(handle.opens(), 0);
    }

    #[test]
    fn test_closed_marker() {
        let (port, handle) = open();
        assert!(!handle.is_closed());
        drop(port);
        assert!(handle.is_closed());
        assert_eq!(handle.calls_after_close(), 0);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            MockSerialError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        ));
        assert!(matches!(
            MockSerialError::BufferOverflow.kind(),
            embedded_io::ErrorKind::OutOfMemory
        ));
        assert!(matches!(
            MockSerialError::Closed.kind(),
            embedded_io::ErrorKind::NotConnected
        ));
    }
}
