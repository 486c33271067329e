//! Our error types for the electronic load link.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Errors surfaced to callers of the session API.
///
/// Only failures that stop the session reaching a consistent state end up here.
/// Garbled or dropped frames never do, see [`FrameError`].
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Failed to start session thread: {0}")]
    Spawn(std::io::Error),
}

/// Why a candidate frame was rejected by the codec.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame length {actual} (expected {expected})")]
    Length { expected: usize, actual: usize },
    #[error("Bad magic word 0x{0:08X}")]
    Magic(u32),
    #[error("Checksum mismatch: frame says 0x{expected:08X}, computed 0x{actual:08X}")]
    Checksum { expected: u32, actual: u32 },
    #[error("Unknown mode value {0}")]
    Mode(u32),
}
