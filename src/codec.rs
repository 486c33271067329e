//! Encoding and validation of the two fixed-size frames of the load protocol.
//!
//! Outbound (controller to load), 64 bytes:
//!
//! | Offset | Size | Field                                             |
//! |--------|------|---------------------------------------------------|
//! | 0      | 4    | Magic `0x2D2D2D2D`                                |
//! | 4      | 8    | `enabled`, `mode`                                 |
//! | 12     | 48   | `cc`, `cv`, `cr`, `cp` as `value`, `min`, `max`   |
//! | 60     | 4    | Checksum                                          |
//!
//! Inbound (load to controller), 28 bytes:
//!
//! | Offset | Size | Field                                                        |
//! |--------|------|--------------------------------------------------------------|
//! | 0      | 4    | Magic `0x2B2B2B2B`                                           |
//! | 4      | 20   | `cc_milli`, `cv_milli`, `cr_milli`, `cp_milli`, `temp_milli` |
//! | 24     | 4    | Checksum                                                     |
//!
//! All fields are little-endian `u32`. The checksum is the wrapping 32 bit sum of
//! every byte before it. It is weak, but it is what the firmware expects.

use crate::{
    error::FrameError,
    types::{ControlState, Measurements, Mode, Setpoint},
};

/// Magic word opening every frame sent to the load.
pub const OUTBOUND_MAGIC: u32 = 0x2D2D2D2D;
/// Magic word opening every frame sent by the load.
pub const INBOUND_MAGIC: u32 = 0x2B2B2B2B;

pub const OUTBOUND_FRAME_LEN: usize = 64;
pub const INBOUND_FRAME_LEN: usize = 28;

const MAGIC_LEN: usize = 4;
const CHECKSUM_LEN: usize = 4;
/// Size of the five measurement fields of an inbound frame.
pub const INBOUND_DATA_LEN: usize = INBOUND_FRAME_LEN - MAGIC_LEN - CHECKSUM_LEN;

/// Wrapping sum of all bytes in `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(byte as u32))
}

/// Sequential little-endian `u32` writer over a fixed frame.
struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl FieldWriter<'_> {
    fn put(&mut self, value: u32) {
        self.buf[self.pos..self.pos + 4].copy_from_slice(&value.to_le_bytes());
        self.pos += 4;
    }

    fn put_setpoint(&mut self, setpoint: &Setpoint) {
        self.put(setpoint.value);
        self.put(setpoint.min);
        self.put(setpoint.max);
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_setpoint(bytes: &[u8], offset: usize) -> Setpoint {
    Setpoint {
        value: read_u32(bytes, offset),
        min: read_u32(bytes, offset + 4),
        max: read_u32(bytes, offset + 8),
    }
}

/// Checks length, magic and checksum, the common part of both validators.
fn check_frame(bytes: &[u8], len: usize, magic: u32) -> Result<(), FrameError> {
    if bytes.len() != len {
        return Err(FrameError::Length {
            expected: len,
            actual: bytes.len(),
        });
    }
    let found_magic = read_u32(bytes, 0);
    if found_magic != magic {
        return Err(FrameError::Magic(found_magic));
    }
    let body_end = len - CHECKSUM_LEN;
    let expected = read_u32(bytes, body_end);
    let actual = checksum(&bytes[..body_end]);
    if expected != actual {
        return Err(FrameError::Checksum { expected, actual });
    }
    Ok(())
}

/// Build the frame transmitting `state` to the load.
pub fn encode_outbound(state: &ControlState) -> [u8; OUTBOUND_FRAME_LEN] {
    let mut frame = [0u8; OUTBOUND_FRAME_LEN];
    let mut writer = FieldWriter {
        buf: &mut frame,
        pos: 0,
    };
    writer.put(OUTBOUND_MAGIC);
    writer.put(state.enabled as u32);
    writer.put(state.mode.into());
    writer.put_setpoint(&state.cc);
    writer.put_setpoint(&state.cv);
    writer.put_setpoint(&state.cr);
    writer.put_setpoint(&state.cp);

    let sum = checksum(&frame[..OUTBOUND_FRAME_LEN - CHECKSUM_LEN]);
    frame[OUTBOUND_FRAME_LEN - CHECKSUM_LEN..].copy_from_slice(&sum.to_le_bytes());
    frame
}

/// Validate and unpack a frame produced by [`encode_outbound`].
///
/// This is the load's side of the link, used for tooling and loopback tests.
/// Any non-zero `enabled` word counts as enabled, as the firmware treats it.
pub fn decode_outbound(bytes: &[u8]) -> Result<ControlState, FrameError> {
    check_frame(bytes, OUTBOUND_FRAME_LEN, OUTBOUND_MAGIC)?;
    Ok(ControlState {
        enabled: read_u32(bytes, 4) != 0,
        mode: Mode::try_from(read_u32(bytes, 8))?,
        cc: read_setpoint(bytes, 12),
        cv: read_setpoint(bytes, 24),
        cr: read_setpoint(bytes, 36),
        cp: read_setpoint(bytes, 48),
    })
}

/// Validate a candidate inbound frame and unpack its measurements.
///
/// Never reads outside `bytes`; anything that is not exactly one well-formed
/// frame is rejected.
pub fn validate_inbound(bytes: &[u8]) -> Result<Measurements, FrameError> {
    check_frame(bytes, INBOUND_FRAME_LEN, INBOUND_MAGIC)?;
    Ok(Measurements {
        cc_milli: read_u32(bytes, 4),
        cv_milli: read_u32(bytes, 8),
        cr_milli: read_u32(bytes, 12),
        cp_milli: read_u32(bytes, 16),
        temp_milli: read_u32(bytes, 20),
    })
}

/// Build the frame the load sends for `measurements`.
pub fn encode_inbound(measurements: &Measurements) -> [u8; INBOUND_FRAME_LEN] {
    let mut frame = [0u8; INBOUND_FRAME_LEN];
    let mut writer = FieldWriter {
        buf: &mut frame,
        pos: 0,
    };
    writer.put(INBOUND_MAGIC);
    writer.put(measurements.cc_milli);
    writer.put(measurements.cv_milli);
    writer.put(measurements.cr_milli);
    writer.put(measurements.cp_milli);
    writer.put(measurements.temp_milli);

    let sum = checksum(&frame[..INBOUND_FRAME_LEN - CHECKSUM_LEN]);
    frame[INBOUND_FRAME_LEN - CHECKSUM_LEN..].copy_from_slice(&sum.to_le_bytes());
    frame
}
