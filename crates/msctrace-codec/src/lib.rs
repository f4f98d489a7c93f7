//! Wire codec for the MSC binary trace protocol.
//!
//! Every record is a 2-byte header followed by a fixed-size payload:
//! - Byte 0: opcode in bits 0-4, priority flags in bits 5-7
//! - Byte 1: payload length (header excluded)
//! - Payload fields in declared order, little-endian
//!
//! Records are self-delimiting through the fixed payload table, so a stream
//! of back-to-back records needs no extra framing.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_buf, decode_record, encode_packet, encode_record, encode_to_bytes, encode_to_vec,
    iter_records, Records, StreamConfig, MAX_RECORD_SIZE,
};
pub use error::{Result, TraceError};
pub use reader::{Packets, RecordReader};
pub use writer::RecordWriter;

#[cfg(feature = "async")]
pub use async_codec::TraceCodec;

pub use msctrace_record::{Header, ObjectId, Opcode, Packet, Priority, Record, HEADER_SIZE};
