//! Emulates a firmware tracer writing records to a capture file.
//!
//! Run with:
//!   cargo run --example firmware-producer
//!
//! Then decode the capture:
//!   cargo run --features cli -- --format pretty decode <path printed above>

use std::fs::File;

use msctrace::codec::RecordWriter;
use msctrace::{ObjectId, Priority, Record};

const SCHEDULER: u8 = 1;
const RADIO: u8 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join(format!(
        "msctrace-capture-{}.bin",
        std::process::id()
    ));
    let mut writer = RecordWriter::new(File::create(&path)?);

    let sched = ObjectId::new(SCHEDULER, 0);
    let radio = ObjectId::new(RADIO, 3);

    writer.send(
        &Record::message(sched, radio, 0x0010),
        Priority::START_OF_SEQUENCE,
    )?;
    writer.send(&Record::state(radio, 2), Priority::SEQUENTIAL)?;
    writer.send(&Record::acknowledge(radio, 0x0010), Priority::SEQUENTIAL)?;
    for sample in [0x0000_00FF_u32, 0x0000_0100, 0xDEAD_BEEF] {
        writer.send(&Record::test_point(radio, sample), Priority::empty())?;
    }
    writer.send(&Record::event(sched, 0x0042), Priority::ALERT)?;
    writer.send(&Record::destroy(radio), Priority::empty())?;
    writer.flush()?;

    eprintln!(
        "Wrote {} records to {}",
        writer.records_written(),
        path.display()
    );
    Ok(())
}
