use bytes::{Buf, BytesMut};
use msctrace_record::Packet;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{decode_buf, encode_packet, StreamConfig};
use crate::error::{Result, TraceError};

/// `tokio_util` codec for trace record streams.
///
/// Use with `FramedRead`/`FramedWrite` over any async byte stream.
#[derive(Debug, Clone, Default)]
pub struct TraceCodec {
    config: StreamConfig,
    run: usize,
    skipped: u64,
}

impl TraceCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            config,
            run: 0,
            skipped: 0,
        }
    }

    /// Total bytes discarded while resynchronizing.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }
}

impl Decoder for TraceCodec {
    type Item = Packet;
    type Error = TraceError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        loop {
            match decode_buf(src) {
                Ok(Some(packet)) => {
                    self.run = 0;
                    return Ok(Some(packet));
                }
                Err(err)
                    if self.config.resync
                        && err.is_resyncable()
                        && self.run < self.config.max_resync_skip =>
                {
                    warn!(error = %err, "skipping corrupt byte");
                    src.advance(1);
                    self.run += 1;
                    self.skipped += 1;
                }
                other => return other,
            }
        }
    }
}

impl Encoder<Packet> for TraceCodec {
    type Error = TraceError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        encode_packet(&item, dst);
        Ok(())
    }
}

impl Encoder<&Packet> for TraceCodec {
    type Error = TraceError;

    fn encode(&mut self, item: &Packet, dst: &mut BytesMut) -> Result<()> {
        encode_packet(item, dst);
        Ok(())
    }
}
