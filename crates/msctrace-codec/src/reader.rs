use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use msctrace_record::Packet;
use tracing::{debug, trace, warn};

use crate::codec::{decode_buf, StreamConfig};
use crate::error::{Result, TraceError};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete trace records from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete records.
/// Records are self-delimiting through the fixed payload table, so no extra
/// framing is expected on the stream.
pub struct RecordReader<T> {
    inner: T,
    buf: BytesMut,
    config: StreamConfig,
    skipped: u64,
    run: usize,
}

impl<T: Read> RecordReader<T> {
    /// Create a new record reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Create a new record reader with explicit configuration.
    pub fn with_config(inner: T, config: StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            skipped: 0,
            run: 0,
        }
    }

    /// Read the next complete record (blocking).
    ///
    /// Returns `Err(TraceError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Packet> {
        self.try_read_packet()?.ok_or(TraceError::ConnectionClosed)
    }

    /// Read the next complete record, or `Ok(None)` on a clean EOF.
    ///
    /// EOF in the middle of a record is `Err(TraceError::ConnectionClosed)`.
    pub fn try_read_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            match decode_buf(&mut self.buf) {
                Ok(Some(packet)) => {
                    self.run = 0;
                    trace!(
                        opcode = %packet.record.opcode(),
                        subject = %packet.record.subject(),
                        "decoded record"
                    );
                    return Ok(Some(packet));
                }
                Ok(None) => {}
                Err(err) if self.config.resync && err.is_resyncable() => {
                    if self.run >= self.config.max_resync_skip {
                        debug!(skipped = self.run, "resync limit reached");
                        return Err(err);
                    }
                    warn!(error = %err, "skipping corrupt byte");
                    self.buf.advance(1);
                    self.skipped += 1;
                    self.run += 1;
                    continue;
                }
                Err(err) => {
                    debug!(error = %err, "record decode failed");
                    return Err(err);
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TraceError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                debug!(buffered = self.buf.len(), "stream ended mid-record");
                return Err(TraceError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Iterate over records until a clean EOF.
    ///
    /// The iterator ends after yielding the first error.
    pub fn packets(&mut self) -> Packets<'_, T> {
        Packets {
            reader: self,
            done: false,
        }
    }

    /// Total bytes discarded while resynchronizing.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current record reader configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

/// Iterator returned by [`RecordReader::packets`].
pub struct Packets<'a, T> {
    reader: &'a mut RecordReader<T>,
    done: bool,
}

impl<T: Read> Iterator for Packets<'_, T> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.try_read_packet() {
            Ok(Some(packet)) => Some(Ok(packet)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    #[cfg(unix)]
    use std::sync::{Arc, Mutex};

    use bytes::{BufMut, BytesMut};
    use msctrace_record::{Priority, Record};

    use super::*;
    use crate::codec::encode_record;

    fn wire(records: &[(Record, Priority)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (record, priority) in records {
            encode_record(record, *priority, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_record() {
        let bytes = wire(&[(Record::event((3, 1), 42), Priority::SEQUENTIAL)]);

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let packet = reader.read_packet().unwrap();

        assert_eq!(packet.record, Record::event((3, 1), 42));
        assert_eq!(packet.priority, Priority::SEQUENTIAL);
    }

    #[test]
    fn read_multiple_records() {
        let bytes = wire(&[
            (Record::message((2, 8), (1, 10), 0), Priority::empty()),
            (Record::state((1, 10), 1), Priority::empty()),
            (Record::destroy((1, 10)), Priority::ALERT),
        ]);

        let mut reader = RecordReader::new(Cursor::new(bytes));

        let p1 = reader.read_packet().unwrap();
        let p2 = reader.read_packet().unwrap();
        let p3 = reader.read_packet().unwrap();

        assert_eq!(p1.record, Record::message((2, 8), (1, 10), 0));
        assert_eq!(p2.record, Record::state((1, 10), 1));
        assert_eq!((p3.record, p3.priority), (Record::destroy((1, 10)), Priority::ALERT));
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(&[(Record::test_point((1, 10), 0x1234_5678), Priority::empty())]);

        let byte_reader = ByteByByteReader { bytes, pos: 0 };
        let mut reader = RecordReader::new(byte_reader);

        let packet = reader.read_packet().unwrap();
        assert_eq!(packet.record, Record::test_point((1, 10), 0x1234_5678));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = RecordReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.try_read_packet().unwrap().is_none());
        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, TraceError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_record() {
        let mut partial = BytesMut::new();
        partial.put_u8(0x00);
        partial.put_u8(0x06);
        partial.put_u16_le(0x0208);

        let mut reader = RecordReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, TraceError::ConnectionClosed));
    }

    #[test]
    fn unknown_opcode_in_stream() {
        let bytes = vec![0x06, 0x04, 0x00, 0x00, 0x00, 0x00];
        let mut reader = RecordReader::new(Cursor::new(bytes));
        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, TraceError::UnknownOpcode(6)));
    }

    #[test]
    fn resync_skips_garbage() {
        let mut bytes = vec![0xFF, 0x1E];
        bytes.extend(wire(&[(Record::event((2, 8), 3), Priority::ALERT)]));
        bytes.push(0x07);
        bytes.extend(wire(&[(Record::destroy((2, 8)), Priority::empty())]));

        let cfg = StreamConfig {
            resync: true,
            ..StreamConfig::default()
        };
        let mut reader = RecordReader::with_config(Cursor::new(bytes), cfg);

        let records: Vec<Record> = reader.packets().map(|p| p.unwrap().record).collect();
        assert_eq!(records, vec![Record::event((2, 8), 3), Record::destroy((2, 8))]);
        assert_eq!(reader.skipped_bytes(), 3);
    }

    #[test]
    fn resync_gives_up_after_limit() {
        let bytes = vec![0x1F; 32];
        let cfg = StreamConfig {
            resync: true,
            max_resync_skip: 8,
        };
        let mut reader = RecordReader::with_config(Cursor::new(bytes), cfg);
        let err = reader.read_packet().unwrap_err();
        assert!(matches!(err, TraceError::UnknownOpcode(0x1F)));
        assert_eq!(reader.skipped_bytes(), 8);
    }

    #[test]
    fn packets_iterator_stops_on_error() {
        let mut bytes = wire(&[(Record::acknowledge((1, 1), 5), Priority::empty())]);
        bytes.extend_from_slice(&[0x01, 0x09]);

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let mut packets = reader.packets();
        assert!(packets.next().unwrap().is_ok());
        assert!(matches!(
            packets.next(),
            Some(Err(TraceError::LengthMismatch { declared: 9, .. }))
        ));
        assert!(packets.next().is_none());
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::RecordWriter::new(left);
        let mut reader = RecordReader::new(right);

        writer.send(&Record::event((3, 1), 42), Priority::SEQUENTIAL).unwrap();
        let packet = reader.read_packet().unwrap();

        assert_eq!(packet.record, Record::event((3, 1), 42));
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::RecordWriter::new(left);
        let reader = RecordReader::new(right);
        let reader = Arc::new(Mutex::new(reader));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u16 {
                    let packet = reader.lock().unwrap().read_packet().unwrap();
                    assert_eq!(packet.record, Record::state((1, (expected % 5) as u8), expected));
                }
            })
        };

        for i in 0..64u16 {
            writer
                .send(&Record::state((1, (i % 5) as u8), i), Priority::empty())
                .unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = RecordReader::new(cursor);

        assert!(!reader.config().resync);
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let bytes = wire(&[(Record::destroy((7, 7)), Priority::empty())]);

        let reader = WouldBlockThenData {
            state: 0,
            bytes,
            pos: 0,
        };
        let mut traced = RecordReader::new(reader);
        let err = traced.read_packet().unwrap_err();
        assert!(matches!(err, TraceError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(&[(Record::destroy((8, 8)), Priority::empty())]);

        let reader = InterruptedThenData { state: 0, bytes };
        let mut traced = RecordReader::new(reader);
        let packet = traced.read_packet().unwrap();

        assert_eq!(packet.record, Record::destroy((8, 8)));
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            self.bytes.drain(..n);
            Ok(n)
        }
    }
}
