/// An opcode value outside the defined range (0-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown opcode {0} (defined opcodes are 0-5)")]
pub struct InvalidOpcode(pub u8);

/// Errors from parsing textual record fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Not a known opcode name or number.
    #[error("invalid opcode: {0:?}")]
    Opcode(String),

    /// Not a recognised priority flag combination.
    #[error("invalid priority: {0:?} (expected sos, seq, alt, none or 0-7)")]
    Priority(String),

    /// Not a `module:instance` pair or a packed 16-bit id.
    #[error("invalid object id: {0:?} (expected MODULE:INSTANCE or a 16-bit value)")]
    ObjectId(String),
}
