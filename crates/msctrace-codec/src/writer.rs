use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use msctrace_record::{Packet, Priority, Record};
use tracing::trace;

use crate::codec::{encode_record, MAX_RECORD_SIZE};
use crate::error::{Result, TraceError};

/// Writes complete trace records to any `Write` stream.
///
/// Each record is written in full and the stream flushed before `send`
/// returns, so records from one writer reach the transport in call order.
pub struct RecordWriter<T> {
    inner: T,
    buf: BytesMut,
    written: u64,
}

impl<T: Write> RecordWriter<T> {
    /// Create a new record writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_RECORD_SIZE),
            written: 0,
        }
    }

    /// Write a complete packet (blocking).
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.send(&packet.record, packet.priority)
    }

    /// Encode and send a record with the given priority flags.
    pub fn send(&mut self, record: &Record, priority: Priority) -> Result<()> {
        self.buf.clear();
        encode_record(record, priority, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(TraceError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TraceError::Io(err)),
            }
        }

        self.flush()?;
        self.written += 1;
        trace!(opcode = %record.opcode(), %priority, "wrote record");
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TraceError::Io(err)),
            }
        }
    }

    /// Number of records fully written so far.
    pub fn records_written(&self) -> u64 {
        self.written
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
