//! Typed record model for the MSC binary trace protocol.
//!
//! Six record kinds share a 2-byte header:
//! - Opcode (5 bits) selecting the record kind
//! - Priority flags (3 bits) hinting at causal ordering
//! - Payload length (1 byte)
//!
//! Participants are addressed by [`ObjectId`], a packed `(module, instance)`
//! pair. Nothing in this crate touches bytes beyond the header packing; see
//! `msctrace-codec` for the payload codec.

pub mod error;
pub mod header;
pub mod object;
pub mod opcode;
pub mod priority;
pub mod record;

pub use error::{InvalidOpcode, ParseError};
pub use header::{Header, HEADER_SIZE};
pub use object::ObjectId;
pub use opcode::{opcode_name, Opcode, MAX_WIRE_OPCODE};
pub use priority::Priority;
pub use record::{Packet, Record};
