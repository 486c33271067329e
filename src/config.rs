//! Session configuration.

use fugit::MillisDurationU32;

/// Port used when none is given.
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";
/// The load's default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// How often the control frame is re-sent.
pub const DEFAULT_WRITE_INTERVAL: MillisDurationU32 = MillisDurationU32::millis(1_000);
/// How often the reader polls the port.
pub const DEFAULT_READ_INTERVAL: MillisDurationU32 = MillisDurationU32::millis(10);
/// Upper bound on a single blocking read, and so on how long the reader holds the lock.
pub const DEFAULT_READ_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(100);
/// Maximum bytes taken from the port per reader cycle.
pub const READ_CHUNK_SIZE: usize = 32;

/// Everything a [`Session`](crate::session::Session) needs to know before connecting.
///
/// ```
/// use eload_sdk::config::SessionConfig;
/// use fugit::ExtU32;
///
/// let config = SessionConfig::default()
///     .with_port("/dev/ttyUSB0")
///     .with_write_interval(250.millis());
/// assert_eq!(config.baud_rate, 115_200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Serial port path or name, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    pub write_interval: MillisDurationU32,
    pub read_interval: MillisDurationU32,
    pub read_timeout: MillisDurationU32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_interval: DEFAULT_WRITE_INTERVAL,
            read_interval: DEFAULT_READ_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Defaults for everything but the port name.
    pub fn new(port: impl Into<String>) -> Self {
        Self::default().with_port(port)
    }

    /// Set the serial port name, e.g. `/dev/ttyACM0` or `COM3`.
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set how often the writer re-sends the control state.
    pub fn with_write_interval(mut self, interval: MillisDurationU32) -> Self {
        self.write_interval = interval;
        self
    }

    /// Set how long the reader sleeps between reads.
    pub fn with_read_interval(mut self, interval: MillisDurationU32) -> Self {
        self.read_interval = interval;
        self
    }

    /// Set how long a single read may block, and so how long the reader can hold the lock.
    pub fn with_read_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// fugit durations are `no_std`; threads sleep on `core::time::Duration`.
pub(crate) fn to_std(duration: MillisDurationU32) -> core::time::Duration {
    core::time::Duration::from_millis(duration.to_millis() as u64)
}
