use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::object::parse_int;

bitflags::bitflags! {
    /// Ordering hints carried in the top 3 bits of the header.
    ///
    /// This is a flag set, not an enumeration: every 3-bit combination is
    /// accepted and passed through unchecked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Priority: u8 {
        /// First record of a causal sequence.
        const START_OF_SEQUENCE = 0x01;
        /// Continues the current sequence.
        const SEQUENTIAL = 0x02;
        /// Needs attention on the host side.
        const ALERT = 0x04;
    }
}

impl Priority {
    /// Width of the priority field in the header.
    pub const BITS: u32 = 3;

    /// Mask of the priority field before shifting.
    pub const MASK: u8 = (1 << Self::BITS) - 1;

    /// Build from a raw 3-bit value. Bits above the field width are dropped.
    pub const fn from_wire(raw: u8) -> Self {
        Self::from_bits_retain(raw & Self::MASK)
    }

    /// Short flag names ("SOS", "SEQ", "ALT") of the set bits.
    pub fn short_names(self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.contains(Self::START_OF_SEQUENCE) {
            names.push("SOS");
        }
        if self.contains(Self::SEQUENTIAL) {
            names.push("SEQ");
        }
        if self.contains(Self::ALERT) {
            names.push("ALT");
        }
        names
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.short_names().join("|"))
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ParseError::Priority(trimmed.to_string());

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Priority::empty());
        }

        if let Some(raw) = parse_int(trimmed) {
            return u8::try_from(raw)
                .ok()
                .filter(|raw| *raw <= Self::MASK)
                .map(Self::from_wire)
                .ok_or_else(invalid);
        }

        let mut flags = Priority::empty();
        for part in trimmed.split(['|', ',', '+']) {
            flags |= match part.trim().to_ascii_lowercase().as_str() {
                "sos" | "start" | "start-of-sequence" => Priority::START_OF_SEQUENCE,
                "seq" | "sequential" => Priority::SEQUENTIAL,
                "alt" | "alert" => Priority::ALERT,
                _ => return Err(invalid()),
            };
        }
        Ok(flags)
    }
}
