//! How a session gets hold of its serial port.
//!
//! The session talks to anything implementing [`embedded_io::Read`] and
//! [`embedded_io::Write`]. A [`Connect`] implementation opens such a port on
//! demand, so the session controls when the port exists and when it is released.

use core::time::Duration;

/// Port type a session can drive from its background threads.
///
/// The port's error must be sendable too, since a thread that dies of a port
/// failure hands its error back to [`Session::disconnect`](crate::Session::disconnect).
pub trait Port:
    embedded_io::Read
    + embedded_io::Write
    + embedded_io::ErrorType<Error: Send + 'static>
    + Send
    + 'static
{
}

impl<T> Port for T where
    T: embedded_io::Read
        + embedded_io::Write
        + embedded_io::ErrorType<Error: Send + 'static>
        + Send
        + 'static
{
}

/// Opens ports for a [`Session`](crate::session::Session).
pub trait Connect {
    type Port: Port;

    /// Open `port` at `baud_rate`. Reads on the returned port must give up
    /// after `read_timeout`, either returning `Ok(0)` or an error of kind
    /// [`TimedOut`](embedded_io::ErrorKind::TimedOut).
    fn open(
        &mut self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self::Port, <Self::Port as embedded_io::ErrorType>::Error>;
}

#[cfg(feature = "serialport")]
pub use serial::{IoError, SerialConnector, SerialPort};

#[cfg(feature = "serialport")]
mod serial {
    use core::time::Duration;

    use super::Connect;

    /// Opens real serial ports with the `serialport` crate, 8N1.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SerialConnector;

    impl Connect for SerialConnector {
        type Port = SerialPort;

        fn open(
            &mut self,
            port: &str,
            baud_rate: u32,
            read_timeout: Duration,
        ) -> Result<SerialPort, IoError> {
            let port = serialport::new(port, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(read_timeout)
                .open()
                .map_err(|err| IoError(err.into()))?;
            Ok(SerialPort(port))
        }
    }

    /// A `serialport` port seen through `embedded_io`.
    pub struct SerialPort(Box<dyn serialport::SerialPort>);

    #[derive(Debug)]
    pub struct IoError(pub std::io::Error);

    impl core::fmt::Display for IoError {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for IoError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    impl embedded_io::Error for IoError {
        fn kind(&self) -> embedded_io::ErrorKind {
            match self.0.kind() {
                std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
                std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
                std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
                std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
                std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
                std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
                // Unix serial ports report an expired read timeout as WouldBlock.
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    embedded_io::ErrorKind::TimedOut
                }
                std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
                std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
                std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
                _ => embedded_io::ErrorKind::Other,
            }
        }
    }

    impl embedded_io::ErrorType for SerialPort {
        type Error = IoError;
    }

    impl embedded_io::Read for SerialPort {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            std::io::Read::read(&mut self.0, buf).map_err(IoError)
        }
    }

    impl embedded_io::Write for SerialPort {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            std::io::Write::write(&mut self.0, buf).map_err(IoError)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            std::io::Write::flush(&mut self.0).map_err(IoError)
        }
    }

}
