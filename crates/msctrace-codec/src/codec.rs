use bytes::{Buf, BufMut, Bytes, BytesMut};
use msctrace_record::header::{OPCODE_MASK, OPCODE_SHIFT};
use msctrace_record::{Header, ObjectId, Opcode, Packet, Priority, Record, HEADER_SIZE};

use crate::error::{Result, TraceError};

/// Largest record on the wire (MSG and TP carry 6 payload bytes).
pub const MAX_RECORD_SIZE: usize = HEADER_SIZE + 6;

/// Default cap on consecutive bytes skipped while resynchronizing.
pub const DEFAULT_MAX_RESYNC_SKIP: usize = 4096;

/// Encode a record into the wire format, appending to `dst`.
///
/// Wire format (all multi-byte fields little-endian):
/// ```text
/// ┌────────────────────┬──────────┬─────────────────────────────┐
/// │ Opcode | Priority  │ Length   │ Payload                     │
/// │ bits 0-4 | 5-7     │ (1B)     │ (fixed size per opcode)     │
/// └────────────────────┴──────────┴─────────────────────────────┘
/// ```
///
/// Payload layouts:
/// ```text
/// MSG: source(2) destination(2) message_id(2)
/// EVT: subject(2) event_id(2)
/// STA: subject(2) state_id(2)
/// TP:  subject(2) data(4)
/// DES: subject(2)
/// ACK: subject(2) message_id(2)
/// ```
pub fn encode_record(record: &Record, priority: Priority, dst: &mut BytesMut) {
    let header = Header::new(record.opcode(), priority);
    dst.reserve(header.record_len());
    dst.put_slice(&header.pack());

    match *record {
        Record::Message {
            source,
            destination,
            message_id,
        } => {
            dst.put_u16_le(source.raw());
            dst.put_u16_le(destination.raw());
            dst.put_u16_le(message_id);
        }
        Record::Event { subject, event_id } => {
            dst.put_u16_le(subject.raw());
            dst.put_u16_le(event_id);
        }
        Record::State { subject, state_id } => {
            dst.put_u16_le(subject.raw());
            dst.put_u16_le(state_id);
        }
        Record::TestPoint { subject, data } => {
            dst.put_u16_le(subject.raw());
            dst.put_u32_le(data);
        }
        Record::Destroy { subject } => {
            dst.put_u16_le(subject.raw());
        }
        Record::Acknowledge {
            subject,
            message_id,
        } => {
            dst.put_u16_le(subject.raw());
            dst.put_u16_le(message_id);
        }
    }
}

/// Encode a packet (record + priority), appending to `dst`.
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) {
    encode_record(&packet.record, packet.priority, dst);
}

/// Encode a single packet into a fresh buffer.
pub fn encode_to_bytes(packet: &Packet) -> Bytes {
    let mut buf = BytesMut::with_capacity(packet.wire_len());
    encode_packet(packet, &mut buf);
    buf.freeze()
}

/// Encode a record into an owned byte vector.
pub fn encode_to_vec(record: &Record, priority: Priority) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + record.payload_len());
    encode_record(record, priority, &mut buf);
    buf.to_vec()
}

/// Decode one record from the front of `src`.
///
/// Returns the packet and the number of bytes consumed. Bytes past the
/// record are never read, so back-to-back records can be decoded by
/// re-invoking at `src[consumed..]`.
pub fn decode_record(src: &[u8]) -> Result<(Packet, usize)> {
    let header = decode_header(src)?;
    let total = header.record_len();
    if src.len() < total {
        return Err(TraceError::TruncatedInput {
            needed: total,
            available: src.len(),
        });
    }

    let mut payload = &src[HEADER_SIZE..total];
    let record = decode_payload(header.opcode, &mut payload);
    Ok((Packet::new(record, header.priority), total))
}

/// Decode a record from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete record yet.
/// On success, consumes the record bytes from the buffer.
pub fn decode_buf(src: &mut BytesMut) -> Result<Option<Packet>> {
    match decode_record(src) {
        Ok((packet, consumed)) => {
            src.advance(consumed);
            Ok(Some(packet))
        }
        Err(TraceError::TruncatedInput { .. }) => Ok(None), // Need more data
        Err(err) => Err(err),
    }
}

fn decode_header(src: &[u8]) -> Result<Header> {
    let Some(&type_byte) = src.first() else {
        return Err(TraceError::TruncatedInput {
            needed: HEADER_SIZE,
            available: 0,
        });
    };

    // Opcode is checked before anything else so reserved values are
    // reported even when the rest of the header is missing.
    Opcode::try_from((type_byte >> OPCODE_SHIFT) & OPCODE_MASK)?;

    if src.len() < HEADER_SIZE {
        return Err(TraceError::TruncatedInput {
            needed: HEADER_SIZE,
            available: src.len(),
        });
    }

    let header = Header::unpack([src[0], src[1]])?;
    if !header.length_matches() {
        return Err(TraceError::LengthMismatch {
            opcode: header.opcode,
            declared: header.length,
            expected: header.opcode.payload_len(),
        });
    }
    Ok(header)
}

// `payload` is exactly `opcode.payload_len()` bytes long.
fn decode_payload(opcode: Opcode, payload: &mut &[u8]) -> Record {
    let subject = ObjectId::from_raw(payload.get_u16_le());
    match opcode {
        Opcode::Msg => Record::Message {
            source: subject,
            destination: ObjectId::from_raw(payload.get_u16_le()),
            message_id: payload.get_u16_le(),
        },
        Opcode::Evt => Record::Event {
            subject,
            event_id: payload.get_u16_le(),
        },
        Opcode::Sta => Record::State {
            subject,
            state_id: payload.get_u16_le(),
        },
        Opcode::Tp => Record::TestPoint {
            subject,
            data: payload.get_u32_le(),
        },
        Opcode::Des => Record::Destroy { subject },
        Opcode::Ack => Record::Acknowledge {
            subject,
            message_id: payload.get_u16_le(),
        },
    }
}

/// Iterate over back-to-back records in a byte slice.
///
/// Yields `(offset, packet)` pairs. Stops after the first error, which is
/// yielded once; a slice ending exactly on a record boundary ends cleanly.
pub fn iter_records(src: &[u8]) -> Records<'_> {
    Records {
        src,
        offset: 0,
        failed: false,
    }
}

/// Iterator returned by [`iter_records`].
#[derive(Debug, Clone)]
pub struct Records<'a> {
    src: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Records<'_> {
    /// Offset of the next undecoded byte.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for Records<'_> {
    type Item = Result<(usize, Packet)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.src.len() {
            return None;
        }
        match decode_record(&self.src[self.offset..]) {
            Ok((packet, consumed)) => {
                let at = self.offset;
                self.offset += consumed;
                Some(Ok((at, packet)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Configuration for the stream adapters.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Skip corrupt bytes (unknown opcode, length mismatch) instead of
    /// failing. Default: false.
    pub resync: bool,
    /// Maximum consecutive bytes skipped before giving up. Default: 4096.
    pub max_resync_skip: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            resync: false,
            max_resync_skip: DEFAULT_MAX_RESYNC_SKIP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<Record> {
        let a = ObjectId::new(2, 8);
        let b = ObjectId::new(1, 10);
        vec![
            Record::message(a, b, 0xBEEF),
            Record::event(a, 42),
            Record::state(b, 7),
            Record::test_point(b, 0x1234_5678),
            Record::destroy(b),
            Record::acknowledge(a, 0xFFFF),
        ]
    }

    fn encode(record: &Record, priority: Priority) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_record(record, priority, &mut buf);
        buf
    }

    #[test]
    fn event_example_bytes() {
        let buf = encode(&Record::event((3, 1), 42), Priority::SEQUENTIAL);
        assert_eq!(buf.as_ref(), &[0x41, 0x04, 0x01, 0x03, 0x2A, 0x00]);
    }

    #[test]
    fn owned_encoders_round_trip() {
        for record in all_kinds() {
            let packet = record.with_priority(Priority::ALERT);

            let vec = encode_to_vec(&record, Priority::ALERT);
            assert_eq!(vec.len(), packet.wire_len());
            assert_eq!(decode_record(&vec).unwrap(), (packet, vec.len()));

            let bytes = encode_to_bytes(&packet);
            assert_eq!(bytes.as_ref(), vec.as_slice());
        }
    }

    #[test]
    fn message_layout() {
        let buf = encode(&Record::message((2, 8), (1, 10), 0x0102), Priority::empty());
        assert_eq!(buf.as_ref(), &[0x00, 0x06, 0x08, 0x02, 0x0A, 0x01, 0x02, 0x01]);
    }

    #[test]
    fn test_point_layout() {
        let buf = encode(&Record::test_point((1, 10), 0x1234_5678), Priority::ALERT);
        assert_eq!(buf.as_ref(), &[0x83, 0x06, 0x0A, 0x01, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn destroy_layout() {
        let buf = encode(&Record::destroy((1, 10)), Priority::START_OF_SEQUENCE);
        assert_eq!(buf.as_ref(), &[0x24, 0x02, 0x0A, 0x01]);
    }

    #[test]
    fn length_field_matches_payload() {
        for record in all_kinds() {
            let buf = encode(&record, Priority::empty());
            assert_eq!(usize::from(buf[1]), buf.len() - HEADER_SIZE);
            assert_eq!(usize::from(buf[1]), record.payload_len());
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for record in all_kinds() {
            for bits in 0..=Priority::MASK {
                let priority = Priority::from_wire(bits);
                let buf = encode(&record, priority);
                let (packet, consumed) = decode_record(&buf).unwrap();
                assert_eq!(packet, Packet::new(record, priority));
                assert_eq!(consumed, buf.len());
            }
        }
    }

    #[test]
    fn test_decode_truncated_at_every_cut() {
        for record in all_kinds() {
            let buf = encode(&record, Priority::SEQUENTIAL);
            for cut in 0..buf.len() {
                let result = decode_record(&buf[..cut]);
                assert!(
                    matches!(result, Err(TraceError::TruncatedInput { .. })),
                    "{:?} cut at {cut}",
                    record.opcode()
                );
            }
        }
    }

    #[test]
    fn test_decode_unknown_opcode() {
        for raw in 6..=OPCODE_MASK {
            let trailers: [&[u8]; 3] = [&[], &[0x04], &[0x04, 1, 2, 3, 4, 5, 6, 7]];
            for trailing in trailers {
                let mut buf = vec![raw | 0b101_00000];
                buf.extend_from_slice(trailing);
                let result = decode_record(&buf);
                assert!(matches!(result, Err(TraceError::UnknownOpcode(op)) if op == raw));
            }
        }
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut buf = encode(&Record::event((3, 1), 42), Priority::empty());
        buf[1] = 6;
        buf.extend_from_slice(&[0, 0]);
        let result = decode_record(&buf);
        assert!(matches!(
            result,
            Err(TraceError::LengthMismatch {
                opcode: Opcode::Evt,
                declared: 6,
                expected: 4
            })
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = encode(&Record::destroy((4, 4)), Priority::empty());
        buf.extend_from_slice(&[0xFF; 16]);
        let (packet, consumed) = decode_record(&buf).unwrap();
        assert_eq!(packet.record, Record::destroy((4, 4)));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_concatenated_records() {
        let r1 = Record::message((2, 8), (1, 10), 1);
        let r2 = Record::state((1, 10), 3);
        let mut buf = encode(&r1, Priority::START_OF_SEQUENCE);
        buf.extend_from_slice(&encode(&r2, Priority::SEQUENTIAL));

        let (p1, n1) = decode_record(&buf).unwrap();
        let (p2, n2) = decode_record(&buf[n1..]).unwrap();
        assert_eq!(p1.record, r1);
        assert_eq!(p2.record, r2);
        assert_eq!(n1 + n2, buf.len());
    }

    #[test]
    fn test_decode_buf_incremental() {
        let bytes = encode(&Record::acknowledge((5, 5), 9), Priority::empty());
        let mut buf = BytesMut::new();
        for (i, byte) in bytes.iter().enumerate() {
            assert!(decode_buf(&mut buf).unwrap().is_none(), "byte {i}");
            buf.put_u8(*byte);
        }
        let packet = decode_buf(&mut buf).unwrap().unwrap();
        assert_eq!(packet.record, Record::acknowledge((5, 5), 9));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_buf_propagates_corruption() {
        let mut buf = BytesMut::from(&[0x1F, 0x00][..]);
        assert!(matches!(
            decode_buf(&mut buf),
            Err(TraceError::UnknownOpcode(0x1F))
        ));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_iter_records() {
        let mut buf = BytesMut::new();
        for record in all_kinds() {
            encode_record(&record, Priority::empty(), &mut buf);
        }
        let decoded: Vec<_> = iter_records(&buf).collect::<Result<_>>().unwrap();
        assert_eq!(decoded.len(), 6);
        assert_eq!(decoded[0].0, 0);
        assert_eq!(decoded[1].0, 8);
        let records: Vec<Record> = decoded.iter().map(|(_, p)| p.record).collect();
        assert_eq!(records, all_kinds());
    }

    #[test]
    fn test_iter_records_stops_after_error() {
        let mut buf = encode(&Record::destroy((1, 1)), Priority::empty());
        buf.put_u8(0x07);
        buf.extend_from_slice(&encode(&Record::destroy((2, 2)), Priority::empty()));

        let mut iter = iter_records(&buf);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(iter.next(), Some(Err(TraceError::UnknownOpcode(7)))));
        assert!(iter.next().is_none());
        assert_eq!(iter.offset(), 4);
    }

    #[test]
    fn test_encode_to_bytes() {
        let packet = Record::state((9, 9), 1).with_priority(Priority::ALERT);
        let bytes = encode_to_bytes(&packet);
        assert_eq!(bytes.len(), packet.wire_len());
        assert_eq!(decode_record(&bytes).unwrap().0, packet);
    }

    #[test]
    fn max_record_size_covers_all_kinds() {
        for record in all_kinds() {
            assert!(HEADER_SIZE + record.payload_len() <= MAX_RECORD_SIZE);
        }
    }
}
