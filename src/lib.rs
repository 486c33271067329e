//! This crate provides an interface for controlling a programmable electronic load
//! and reading back its live measurements over a serial link.
//!
//! The load supports four regulation modes: constant current, voltage, resistance and
//! power. The controlling side continuously re-sends its full desired state as a fixed
//! 64 byte frame, while the load streams back 28 byte measurement frames. See
//! [`codec`] for the frame layouts.
//!
//! A [`Session`] owns the port and runs two background threads, a writer sending the
//! control frame every second and a reader polling for measurements every 10 ms,
//! behind a simple blocking get/set API.
//!
//! The serial port used for load comms should be configured like so:
//! * Default baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! ```no_run
//! # #[cfg(feature = "serialport")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use eload_sdk::{Session, SessionConfig};
//!
//! let load = Session::serial(SessionConfig::new("/dev/ttyACM0"));
//! load.connect()?;
//! load.set_cc(500);
//! load.enable_load();
//! std::thread::sleep(std::time::Duration::from_secs(2));
//! println!("{:?}", load.get_measurements());
//! load.disconnect()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serialport"))]
//! # fn main() {}
//! ```
//!
//! Frames that fail validation are dropped silently. The protocol has no
//! acknowledgement or retransmission, so a garbled frame simply means no update
//! that cycle.
//!
//! Logging goes through [`tracing`]; no subscriber is installed by this crate.

pub mod codec;
pub mod config;
pub mod error;
pub mod framer;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_serial;

pub use config::SessionConfig;
pub use error::{Error, FrameError, Result};
pub use session::Session;
pub use transport::Connect;
pub use types::{ControlState, Measurements, Mode, Setpoint, State};
