//! Compact binary tracing protocol for message-sequence charts.
//!
//! Firmware emits small fixed-size records (messages, events, state changes,
//! test points, destruction, acknowledgements) and a host decodes them back
//! into typed values to reconstruct a sequence chart.
//!
//! # Crate Structure
//!
//! - [`record`]: typed record model (`ObjectId`, `Opcode`, `Priority`, `Record`)
//! - [`codec`]: encode/decode routines and blocking stream adapters
//!   (plus a `tokio_util` codec behind the `async` feature)

/// Re-export record model types.
pub mod record {
    pub use msctrace_record::*;
}

/// Re-export codec types.
pub mod codec {
    pub use msctrace_codec::*;
}

pub use msctrace_codec::{decode_record, encode_record, TraceError};
pub use msctrace_record::{ObjectId, Opcode, Packet, Priority, Record};
