//! The duplex link to the load.
//!
//! A connected [`Session`] runs two threads over one serial port:
//! * the writer re-sends the full [`ControlState`] every `write_interval`,
//! * the reader polls the port every `read_interval` and keeps the latest
//!   valid [`Measurements`].
//!
//! One mutex guards the port, the control state and the measurements. The
//! reader holds it for the whole of its bounded read, so every other user of
//! the lock can wait up to the port's read timeout. That keeps port access
//! strictly serialised between the two threads.
//!
//! For its methods, "set" writes a configuration that the writer will pick up
//! on its next cycle, "get" returns a copy of the latest known value.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use embedded_io::{Error as _, ErrorKind, Read, Write};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{
    codec,
    config::{READ_CHUNK_SIZE, SessionConfig, to_std},
    error::{Error, Result},
    framer::InboundFramer,
    transport::{Connect, Port},
    types::{ControlState, Measurements, Mode, Setpoint, State},
};

/// Error type of the ports opened by `C`.
pub type PortError<C> = <<C as Connect>::Port as embedded_io::ErrorType>::Error;

/// Everything the two threads and the callers share, behind one lock.
struct Shared<P> {
    port: Option<P>,
    control: ControlState,
    measurements: Measurements,
}

/// What a session thread ends with: `Err` when the port failed under it.
type LoopResult<E> = core::result::Result<(), E>;

struct Workers<E> {
    writer: JoinHandle<LoopResult<E>>,
    reader: JoinHandle<LoopResult<E>>,
}

/// Connect/disconnect bookkeeping. Only touched by callers, never by the threads.
struct Lifecycle<C: Connect> {
    connector: C,
    workers: Option<Workers<PortError<C>>>,
}

/// You can create a Session using any [`Connect`] implementation, e.g.
/// [`SerialConnector`](crate::transport::SerialConnector) with the `serialport` feature.
///
/// All methods take `&self`, so a session can be shared between threads in an `Arc`.
/// Setters work whether or not the session is connected; the state is sent once
/// it is.
pub struct Session<C: Connect> {
    config: SessionConfig,
    lifecycle: Mutex<Lifecycle<C>>,
    shared: Arc<Mutex<Shared<C::Port>>>,
    cancel: Arc<AtomicBool>,
}

#[cfg(feature = "serialport")]
impl Session<crate::transport::SerialConnector> {
    /// A session over a real serial port.
    pub fn serial(config: SessionConfig) -> Self {
        Self::new(crate::transport::SerialConnector, config)
    }
}

impl<C: Connect> Session<C> {
    /// Create a disconnected session. Nothing is opened until [`Self::connect`].
    pub fn new(connector: C, config: SessionConfig) -> Self {
        Self {
            config,
            lifecycle: Mutex::new(Lifecycle {
                connector,
                workers: None,
            }),
            shared: Arc::new(Mutex::new(Shared {
                port: None,
                control: ControlState::default(),
                measurements: Measurements::default(),
            })),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configuration this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open the port and start the writer and reader threads.
    ///
    /// Does nothing if already connected.
    pub fn connect(&self) -> Result<(), PortError<C>> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.workers.is_some() {
            return Ok(());
        }

        let port = lifecycle
            .connector
            .open(
                &self.config.port,
                self.config.baud_rate,
                to_std(self.config.read_timeout),
            )
            .map_err(Error::SerialError)?;
        self.shared.lock().port = Some(port);
        self.cancel.store(false, Ordering::SeqCst);

        let writer = {
            let shared = self.shared.clone();
            let cancel = self.cancel.clone();
            let interval = to_std(self.config.write_interval);
            thread::Builder::new()
                .name("eload-writer".into())
                .spawn(move || writer_loop(&shared, &cancel, interval))
        };
        let writer = match writer {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.lock().port = None;
                return Err(Error::Spawn(err));
            }
        };

        let reader = {
            let shared = self.shared.clone();
            let cancel = self.cancel.clone();
            let interval = to_std(self.config.read_interval);
            thread::Builder::new()
                .name("eload-reader".into())
                .spawn(move || reader_loop(&shared, &cancel, interval))
        };
        let reader = match reader {
            Ok(handle) => handle,
            Err(err) => {
                self.cancel.store(true, Ordering::SeqCst);
                let _ = join(writer, "writer");
                self.shared.lock().port = None;
                return Err(Error::Spawn(err));
            }
        };

        lifecycle.workers = Some(Workers { writer, reader });
        info!(
            port = %self.config.port,
            baud_rate = self.config.baud_rate,
            "connected to load"
        );
        Ok(())
    }

    /// Stop both threads, wait for them to exit, then release the port.
    ///
    /// Does nothing if not connected. When this returns, no thread touches the
    /// port any more. If a thread stopped because the port failed, that error
    /// is returned, otherwise any error flushing the port. The session is
    /// disconnected either way.
    pub fn disconnect(&self) -> Result<(), PortError<C>> {
        let mut lifecycle = self.lifecycle.lock();
        let Some(workers) = lifecycle.workers.take() else {
            return Ok(());
        };

        self.cancel.store(true, Ordering::SeqCst);
        let writer_failure = join(workers.writer, "writer");
        let reader_failure = join(workers.reader, "reader");

        let port = self.shared.lock().port.take();
        let flushed = match port {
            Some(mut port) => port.flush(),
            None => Ok(()),
        };
        info!(port = %self.config.port, "disconnected from load");

        if let Some(err) = writer_failure.or(reader_failure) {
            return Err(Error::SerialError(err));
        }
        flushed.map_err(Error::SerialError)
    }

    /// Whether [`Self::connect`] succeeded and [`Self::disconnect`] has not run since.
    pub fn is_connected(&self) -> bool {
        self.lifecycle.lock().workers.is_some()
    }

    /// Whether both threads are still alive.
    ///
    /// A connected session stops running when the port fails; call
    /// [`Self::disconnect`] and connect again to recover.
    pub fn is_running(&self) -> bool {
        self.lifecycle
            .lock()
            .workers
            .as_ref()
            .is_some_and(|w| !w.writer.is_finished() && !w.reader.is_finished())
    }

    /// Enable/disable the load's input.
    pub fn set_enabled(&self, state: impl Into<State>) {
        let enabled = bool::from(state.into());
        self.shared.lock().control.enabled = enabled;
        debug!(enabled, "load enable changed");
    }

    /// Enable the load's input.
    pub fn enable_load(&self) {
        self.set_enabled(State::On);
    }

    /// Disable the load's input.
    pub fn disable_load(&self) {
        self.set_enabled(State::Off);
    }

    /// Select `mode` and set its target value, in that mode's milli-unit.
    ///
    /// The mode's min/max and the other modes' setpoints are left as they are.
    pub fn set_mode(&self, mode: Mode, value_milli: u32) {
        {
            let mut shared = self.shared.lock();
            let current = *shared.control.setpoint(mode);
            *shared.control.setpoint_mut(mode) = Setpoint {
                value: value_milli,
                ..current
            };
            shared.control.mode = mode;
        }
        debug!(%mode, value_milli, "setpoint changed");
    }

    /// Select `mode` and replace its whole `{value, min, max}` triple.
    pub fn set_setpoint(&self, mode: Mode, setpoint: Setpoint) {
        {
            let mut shared = self.shared.lock();
            *shared.control.setpoint_mut(mode) = setpoint;
            shared.control.mode = mode;
        }
        debug!(%mode, ?setpoint, "setpoint replaced");
    }

    /// Constant current mode, target in milliamps.
    pub fn set_cc(&self, milli_amps: u32) {
        self.set_mode(Mode::Cc, milli_amps);
    }

    /// Constant voltage mode, target in millivolts.
    pub fn set_cv(&self, milli_volts: u32) {
        self.set_mode(Mode::Cv, milli_volts);
    }

    /// Constant resistance mode, target in milliohms.
    pub fn set_cr(&self, milli_ohms: u32) {
        self.set_mode(Mode::Cr, milli_ohms);
    }

    /// Constant power mode, target in milliwatts.
    pub fn set_cp(&self, milli_watts: u32) {
        self.set_mode(Mode::Cp, milli_watts);
    }

    /// Copy of the state the writer will send next.
    pub fn get_control_state(&self) -> ControlState {
        self.shared.lock().control
    }

    /// Latest valid measurements, all zero until the first good frame arrives.
    pub fn get_measurements(&self) -> Measurements {
        self.shared.lock().measurements
    }

    /// Return the measured current in milliamps.
    pub fn get_current_ma(&self) -> u32 {
        self.get_measurements().cc_milli
    }

    /// Return the measured voltage in millivolts.
    pub fn get_voltage_mv(&self) -> u32 {
        self.get_measurements().cv_milli
    }

    /// Return the measured resistance in milliohms.
    pub fn get_resistance_mohm(&self) -> u32 {
        self.get_measurements().cr_milli
    }

    /// Return the measured power in milliwatts.
    pub fn get_power_mw(&self) -> u32 {
        self.get_measurements().cp_milli
    }

    /// Return the measured temperature in milli degrees Celsius.
    pub fn get_temperature_milli_c(&self) -> u32 {
        self.get_measurements().temp_milli
    }
}

impl<C: Connect> Drop for Session<C> {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(error = %err, "error releasing port on drop");
        }
    }
}

/// Wait for a session thread, returning the port error it died of, if any.
fn join<E>(handle: JoinHandle<LoopResult<E>>, name: &str) -> Option<E> {
    match handle.join() {
        Ok(result) => result.err(),
        Err(_) => {
            warn!(thread = name, "session thread panicked");
            None
        }
    }
}

/// Sends the control frame every `interval` until cancelled or the port fails.
fn writer_loop<P: Port>(
    shared: &Mutex<Shared<P>>,
    cancel: &AtomicBool,
    interval: Duration,
) -> LoopResult<P::Error> {
    debug!("writer started");
    while !cancel.load(Ordering::SeqCst) {
        {
            let mut guard = shared.lock();
            let Shared { port, control, .. } = &mut *guard;
            let Some(port) = port.as_mut() else {
                break;
            };
            let frame = codec::encode_outbound(control);
            if let Err(err) = port.write_all(&frame) {
                warn!(error = ?err, "write failed, stopping session threads");
                cancel.store(true, Ordering::SeqCst);
                return Err(err);
            }
            trace!(mode = %control.mode, enabled = control.enabled, "control frame sent");
        }
        thread::sleep(interval);
    }
    debug!("writer stopped");
    Ok(())
}

/// Polls the port every `interval`, keeping the latest valid measurements.
fn reader_loop<P: Port>(
    shared: &Mutex<Shared<P>>,
    cancel: &AtomicBool,
    interval: Duration,
) -> LoopResult<P::Error> {
    debug!("reader started");
    let mut framer = InboundFramer::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    while !cancel.load(Ordering::SeqCst) {
        let read = {
            let mut guard = shared.lock();
            let Some(port) = guard.port.as_mut() else {
                break;
            };
            // Lock stays held for the read, bounded by the port's timeout.
            port.read(&mut chunk)
        };
        let count = match read {
            Ok(count) => count,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => 0,
            Err(err) => {
                warn!(error = ?err, "read failed, stopping session threads");
                cancel.store(true, Ordering::SeqCst);
                return Err(err);
            }
        };

        for candidate in framer.feed(&chunk[..count]) {
            match codec::validate_inbound(&candidate) {
                Ok(measurements) => {
                    shared.lock().measurements = measurements;
                    trace!(?measurements, "measurements updated");
                }
                Err(err) => trace!(error = %err, "inbound frame discarded"),
            }
        }
        thread::sleep(interval);
    }
    debug!("reader stopped");
    Ok(())
}
