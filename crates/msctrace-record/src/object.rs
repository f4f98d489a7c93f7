use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Identifies a trace participant (a lifeline in the sequence chart).
///
/// The packed form is `(module << 8) | instance`. Every `u16` is a valid
/// packed id and every `(module, instance)` pair maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ObjectId(u16);

impl ObjectId {
    /// Wire size of a packed object id.
    pub const SIZE: usize = 2;

    /// Pack a module and instance pair.
    pub const fn new(module: u8, instance: u8) -> Self {
        Self(((module as u16) << 8) | instance as u16)
    }

    /// Wrap an already packed id.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The packed 16-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Module identifier (high byte).
    pub const fn module(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Instance identifier within the module (low byte).
    pub const fn instance(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Split into `(module, instance)`.
    pub const fn into_parts(self) -> (u8, u8) {
        (self.module(), self.instance())
    }
}

impl From<u16> for ObjectId {
    fn from(raw: u16) -> Self {
        Self::from_raw(raw)
    }
}

impl From<ObjectId> for u16 {
    fn from(id: ObjectId) -> Self {
        id.raw()
    }
}

impl From<(u8, u8)> for ObjectId {
    fn from((module, instance): (u8, u8)) -> Self {
        Self::new(module, instance)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module(), self.instance())
    }
}

impl FromStr for ObjectId {
    type Err = ParseError;

    /// Accepts `module:instance` (decimal or `0x` hex parts) or a packed
    /// `u16` (decimal or `0x` hex).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseError::ObjectId(s.to_string());

        if let Some((module, instance)) = s.split_once(':') {
            let module = parse_int(module).ok_or_else(invalid)?;
            let instance = parse_int(instance).ok_or_else(invalid)?;
            let module = u8::try_from(module).map_err(|_| invalid())?;
            let instance = u8::try_from(instance).map_err(|_| invalid())?;
            return Ok(Self::new(module, instance));
        }

        let raw = parse_int(s).ok_or_else(invalid)?;
        u16::try_from(raw).map(Self::from_raw).map_err(|_| invalid())
    }
}

pub(crate) fn parse_int(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
