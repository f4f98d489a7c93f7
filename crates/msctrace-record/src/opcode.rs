//! Record opcodes.
//!
//! Opcodes occupy 5 bits of the header, so 0-31 are representable on the
//! wire. Only 0-5 are defined; the rest are rejected on decode.

use std::fmt;
use std::str::FromStr;

use crate::error::{InvalidOpcode, ParseError};
use crate::object::parse_int;

/// Discriminator selecting one of the six record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[repr(u8)]
pub enum Opcode {
    /// Inter-module message.
    Msg = 0,
    /// Asynchronous event delivered to an object.
    Evt = 1,
    /// State transition.
    Sta = 2,
    /// Test-point sample.
    Tp = 3,
    /// Object destruction.
    Des = 4,
    /// Message acknowledgement.
    Ack = 5,
}

/// Highest opcode value the 5-bit header field can carry.
pub const MAX_WIRE_OPCODE: u8 = 0x1F;

impl Opcode {
    /// All defined opcodes in wire order.
    pub const ALL: [Opcode; 6] = [
        Opcode::Msg,
        Opcode::Evt,
        Opcode::Sta,
        Opcode::Tp,
        Opcode::Des,
        Opcode::Ack,
    ];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short protocol name ("MSG", "EVT", ...).
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Msg => "MSG",
            Opcode::Evt => "EVT",
            Opcode::Sta => "STA",
            Opcode::Tp => "TP",
            Opcode::Des => "DES",
            Opcode::Ack => "ACK",
        }
    }

    /// Fixed payload size in bytes, header excluded.
    pub const fn payload_len(self) -> usize {
        match self {
            Opcode::Msg => 6,
            Opcode::Evt => 4,
            Opcode::Sta => 4,
            Opcode::Tp => 6,
            Opcode::Des => 2,
            Opcode::Ack => 4,
        }
    }
}

/// Returns a human-readable name for a raw opcode value.
pub fn opcode_name(raw: u8) -> &'static str {
    match Opcode::try_from(raw) {
        Ok(opcode) => opcode.name(),
        Err(_) if raw <= MAX_WIRE_OPCODE => "RESERVED",
        Err(_) => "INVALID",
    }
}

impl TryFrom<u8> for Opcode {
    type Error = InvalidOpcode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Msg),
            1 => Ok(Opcode::Evt),
            2 => Ok(Opcode::Sta),
            3 => Ok(Opcode::Tp),
            4 => Ok(Opcode::Des),
            5 => Ok(Opcode::Ack),
            other => Err(InvalidOpcode(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode.as_u8()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(opcode) = Opcode::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(trimmed))
        {
            return Ok(opcode);
        }

        let alias = match trimmed.to_ascii_lowercase().as_str() {
            "message" => Some(Opcode::Msg),
            "event" => Some(Opcode::Evt),
            "state" => Some(Opcode::Sta),
            "testpoint" | "test-point" => Some(Opcode::Tp),
            "destroy" => Some(Opcode::Des),
            "acknowledge" | "acknowledgement" => Some(Opcode::Ack),
            _ => None,
        };
        if let Some(opcode) = alias {
            return Ok(opcode);
        }

        parse_int(trimmed)
            .and_then(|raw| u8::try_from(raw).ok())
            .and_then(|raw| Opcode::try_from(raw).ok())
            .ok_or_else(|| ParseError::Opcode(trimmed.to_string()))
    }
}
