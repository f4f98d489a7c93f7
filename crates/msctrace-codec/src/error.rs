use msctrace_record::{opcode_name, InvalidOpcode, Opcode};

/// Errors that can occur while encoding, decoding or streaming records.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The header carries an opcode outside 0-5.
    #[error("unknown opcode {0} ({name}, defined opcodes are 0-5)", name = opcode_name(*.0))]
    UnknownOpcode(u8),

    /// Fewer bytes are available than the header or payload requires.
    #[error("truncated record ({available} bytes available, {needed} needed)")]
    TruncatedInput { needed: usize, available: usize },

    /// The header's length field disagrees with the opcode's fixed payload size.
    #[error("length mismatch for {opcode}: header declares {declared} bytes, payload is {expected}")]
    LengthMismatch {
        opcode: Opcode,
        declared: u8,
        expected: usize,
    },

    /// An I/O error occurred while reading or writing records.
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete record was received.
    #[error("stream closed (incomplete record)")]
    ConnectionClosed,
}

impl TraceError {
    /// True for errors caused by corrupt header bytes, which a consumer can
    /// skip past by scanning forward one byte at a time.
    pub fn is_resyncable(&self) -> bool {
        matches!(
            self,
            TraceError::UnknownOpcode(_) | TraceError::LengthMismatch { .. }
        )
    }
}

impl From<InvalidOpcode> for TraceError {
    fn from(err: InvalidOpcode) -> Self {
        TraceError::UnknownOpcode(err.0)
    }
}

pub type Result<T> = std::result::Result<T, TraceError>;
