//! Recovers inbound frame boundaries from the raw serial byte stream.
//!
//! Serial reads are not frame aligned. A read may return nothing, part of a
//! frame or several frames, so bytes are pushed through one at a time. The
//! framer only finds boundaries; content checks belong to
//! [`validate_inbound`](crate::codec::validate_inbound).

use crate::codec::{INBOUND_DATA_LEN, INBOUND_FRAME_LEN, INBOUND_MAGIC};

/// All four bytes of the inbound magic word are the same value.
const MAGIC_BYTE: u8 = (INBOUND_MAGIC >> 24) as u8;
const MAGIC_LEN: usize = 4;
const BODY_END: usize = MAGIC_LEN + INBOUND_DATA_LEN;

/// Where the framer is within the current candidate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Counting consecutive magic bytes.
    AwaitingStart,
    /// Collecting the 20 measurement bytes.
    AwaitingBody,
    /// Collecting the 4 checksum bytes.
    AwaitingChecksum,
}

/// Byte-at-a-time state machine producing candidate 28 byte frames.
#[derive(Debug)]
pub struct InboundFramer {
    state: FramerState,
    count: usize,
    buffer: [u8; INBOUND_FRAME_LEN],
}

impl Default for InboundFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundFramer {
    /// A framer waiting for the start of a frame.
    pub const fn new() -> Self {
        Self {
            state: FramerState::AwaitingStart,
            count: 0,
            buffer: [0u8; INBOUND_FRAME_LEN],
        }
    }

    /// Current state of the state machine.
    pub fn state(&self) -> FramerState {
        self.state
    }

    /// Number of bytes of the current candidate collected so far.
    pub fn buffered(&self) -> usize {
        self.count
    }

    /// Feed a single byte. Returns a candidate frame when the 28th byte lands.
    pub fn push(&mut self, byte: u8) -> Option<[u8; INBOUND_FRAME_LEN]> {
        match self.state {
            FramerState::AwaitingStart => {
                if byte == MAGIC_BYTE {
                    self.buffer[self.count] = byte;
                    self.count += 1;
                    if self.count == MAGIC_LEN {
                        self.state = FramerState::AwaitingBody;
                    }
                } else {
                    // Stale bytes are overwritten by the next match.
                    self.count = 0;
                }
                None
            }
            FramerState::AwaitingBody => {
                self.buffer[self.count] = byte;
                self.count += 1;
                if self.count == BODY_END {
                    self.state = FramerState::AwaitingChecksum;
                }
                None
            }
            FramerState::AwaitingChecksum => {
                self.buffer[self.count] = byte;
                self.count += 1;
                if self.count == INBOUND_FRAME_LEN {
                    self.reset();
                    Some(self.buffer)
                } else {
                    None
                }
            }
        }
    }

    /// Feed a chunk, yielding every candidate frame it completes, in order.
    pub fn feed<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = [u8; INBOUND_FRAME_LEN]> + 'a {
        bytes.iter().filter_map(move |&byte| self.push(byte))
    }

    /// Drop any partially collected frame.
    pub fn reset(&mut self) {
        self.state = FramerState::AwaitingStart;
        self.count = 0;
    }
}
