use crate::error::InvalidOpcode;
use crate::opcode::{Opcode, MAX_WIRE_OPCODE};
use crate::priority::Priority;

/// Header size on the wire: opcode/priority byte + length byte.
pub const HEADER_SIZE: usize = 2;

/// Opcode occupies bits 0-4 of byte 0.
pub const OPCODE_SHIFT: u8 = 0;
pub const OPCODE_MASK: u8 = MAX_WIRE_OPCODE;

/// Priority occupies bits 5-7 of byte 0.
pub const PRIORITY_SHIFT: u8 = 5;

/// Common prefix of every record.
///
/// ```text
/// byte 0: bits[4:0] = opcode, bits[7:5] = priority
/// byte 1: payload length in bytes (header excluded)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub opcode: Opcode,
    pub priority: Priority,
    /// Payload length as declared on the wire.
    pub length: u8,
}

impl Header {
    /// Header for `opcode` with the length taken from the fixed payload table.
    pub fn new(opcode: Opcode, priority: Priority) -> Self {
        Self {
            opcode,
            priority,
            length: opcode.payload_len() as u8,
        }
    }

    /// Pack into the two wire bytes.
    pub fn pack(&self) -> [u8; HEADER_SIZE] {
        [
            pack_type_byte(self.opcode.as_u8(), self.priority),
            self.length,
        ]
    }

    /// Unpack the two wire bytes.
    ///
    /// Only the opcode is validated here; the length is returned as declared
    /// so callers can check it against [`Opcode::payload_len`].
    pub fn unpack(bytes: [u8; HEADER_SIZE]) -> Result<Self, InvalidOpcode> {
        let (raw_opcode, priority) = unpack_type_byte(bytes[0]);
        let opcode = Opcode::try_from(raw_opcode)?;
        Ok(Self {
            opcode,
            priority,
            length: bytes[1],
        })
    }

    /// True when the declared length agrees with the opcode's payload size.
    pub fn length_matches(&self) -> bool {
        usize::from(self.length) == self.opcode.payload_len()
    }

    /// Total wire size implied by the opcode (header + payload).
    pub fn record_len(&self) -> usize {
        HEADER_SIZE + self.opcode.payload_len()
    }
}

/// Combine a raw opcode and priority into header byte 0.
pub const fn pack_type_byte(raw_opcode: u8, priority: Priority) -> u8 {
    ((raw_opcode & OPCODE_MASK) << OPCODE_SHIFT)
        | ((priority.bits() & Priority::MASK) << PRIORITY_SHIFT)
}

/// Split header byte 0 into the raw opcode and priority.
pub const fn unpack_type_byte(byte: u8) -> (u8, Priority) {
    (
        (byte >> OPCODE_SHIFT) & OPCODE_MASK,
        Priority::from_wire(byte >> PRIORITY_SHIFT),
    )
}
