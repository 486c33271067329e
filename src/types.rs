//! This module contains the data carried by the load's wire protocol.
//!
//! Every quantity is an unsigned 32 bit integer in milli-units of its base unit.

use strum_macros::{Display, EnumCount, EnumIter, EnumString};

use crate::error::FrameError;

/// The four regulation modes of the load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumCount, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
#[repr(u32)]
pub enum Mode {
    /// Constant current. Setpoints in milliamps.
    #[default]
    #[strum(serialize = "CC")]
    Cc = 0x00,
    /// Constant voltage. Setpoints in millivolts.
    #[strum(serialize = "CV")]
    Cv = 0x01,
    /// Constant resistance. Setpoints in milliohms.
    #[strum(serialize = "CR")]
    Cr = 0x02,
    /// Constant power. Setpoints in milliwatts.
    #[strum(serialize = "CP")]
    Cp = 0x03,
}

impl From<Mode> for u32 {
    fn from(value: Mode) -> Self {
        value as u32
    }
}

impl TryFrom<u32> for Mode {
    type Error = FrameError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Mode::Cc),
            0x01 => Ok(Mode::Cv),
            0x02 => Ok(Mode::Cr),
            0x03 => Ok(Mode::Cp),
            other => Err(FrameError::Mode(other)),
        }
    }
}

/// Used to be less ambiguous and whether something is on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Disabled.
    #[default]
    Off,
    /// Enabled.
    On,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

/// A mode's target value and the bounds the load should hold it within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Setpoint {
    pub value: u32,
    pub min: u32,
    pub max: u32,
}

impl Setpoint {
    /// A setpoint with no bounds configured.
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            min: 0,
            max: 0,
        }
    }

    /// A setpoint with explicit limits.
    pub const fn with_limits(value: u32, min: u32, max: u32) -> Self {
        Self { value, min, max }
    }
}

/// Everything the controlling side transmits each cycle.
///
/// All four setpoints are sent every time, only the one selected by `mode` is
/// acted upon by the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    pub mode: Mode,
    /// Milliamps.
    pub cc: Setpoint,
    /// Millivolts.
    pub cv: Setpoint,
    /// Milliohms.
    pub cr: Setpoint,
    /// Milliwatts.
    pub cp: Setpoint,
}

impl Default for ControlState {
    /// Output disabled, CC mode, 1 A / 5 V / 10 Ω / 2 W targets.
    fn default() -> Self {
        Self {
            enabled: false,
            mode: Mode::Cc,
            cc: Setpoint::new(1_000),
            cv: Setpoint::new(5_000),
            cr: Setpoint::new(10_000),
            cp: Setpoint::new(2_000),
        }
    }
}

impl ControlState {
    /// The setpoint used by `mode`.
    pub fn setpoint(&self, mode: Mode) -> &Setpoint {
        match mode {
            Mode::Cc => &self.cc,
            Mode::Cv => &self.cv,
            Mode::Cr => &self.cr,
            Mode::Cp => &self.cp,
        }
    }

    /// Mutable access to the setpoint used by `mode`.
    pub fn setpoint_mut(&mut self, mode: Mode) -> &mut Setpoint {
        match mode {
            Mode::Cc => &mut self.cc,
            Mode::Cv => &mut self.cv,
            Mode::Cr => &mut self.cr,
            Mode::Cp => &mut self.cp,
        }
    }

    /// The setpoint of the currently selected mode.
    pub fn active_setpoint(&self) -> &Setpoint {
        self.setpoint(self.mode)
    }
}

/// Latest values reported by the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurements {
    /// Milliamps.
    pub cc_milli: u32,
    /// Millivolts.
    pub cv_milli: u32,
    /// Milliohms.
    pub cr_milli: u32,
    /// Milliwatts.
    pub cp_milli: u32,
    /// Milli degrees Celsius.
    pub temp_milli: u32,
}

impl Measurements {
    /// Current in amps.
    pub fn current_a(&self) -> f32 {
        self.cc_milli as f32 / 1000.0
    }

    /// Voltage in volts.
    pub fn voltage_v(&self) -> f32 {
        self.cv_milli as f32 / 1000.0
    }

    /// Resistance in ohms.
    pub fn resistance_ohm(&self) -> f32 {
        self.cr_milli as f32 / 1000.0
    }

    /// Power in watts.
    pub fn power_w(&self) -> f32 {
        self.cp_milli as f32 / 1000.0
    }

    /// Temperature in degrees Celsius.
    pub fn temperature_c(&self) -> f32 {
        self.temp_milli as f32 / 1000.0
    }
}
