//! Decodes a record stream with `FramedRead` over an in-memory duplex pipe.
//!
//! Run with:
//!   cargo run --example async-consumer --features async

use futures_util::StreamExt;
use msctrace::codec::{encode_packet, TraceCodec};
use msctrace::{Priority, Record};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::FramedRead;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut producer, consumer) = tokio::io::duplex(64);

    let writer = tokio::spawn(async move {
        let mut wire = bytes::BytesMut::new();
        for id in 0..8u16 {
            let packet = Record::event((1, 4), id).with_priority(Priority::SEQUENTIAL);
            encode_packet(&packet, &mut wire);
        }
        // Split mid-record so the codec has to reassemble.
        for chunk in wire.chunks(5) {
            producer.write_all(chunk).await?;
        }
        producer.shutdown().await
    });

    let mut records = FramedRead::new(consumer, TraceCodec::new());
    while let Some(packet) = records.next().await {
        let packet = packet?;
        println!(
            "{} priority={} subject={} id={:?}",
            packet.record.opcode(),
            packet.priority,
            packet.record.subject(),
            packet.record.id()
        );
    }

    writer.await??;
    Ok(())
}
