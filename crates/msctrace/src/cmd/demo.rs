use std::fs::File;

use msctrace_codec::RecordWriter;
use msctrace_record::{Packet, Priority, Record};
use tracing::info;

use crate::cmd::DemoArgs;
use crate::exit::{io_error, trace_error, CliResult, SUCCESS};
use crate::names::Names;
use crate::output::{OutputFormat, PacketPrinter};

/// Sample trace: three modules exchanging messages, then state, test point,
/// destroy and event records.
pub fn demo_packets() -> Vec<Packet> {
    let none = Priority::empty();
    let sos = Priority::START_OF_SEQUENCE;
    let seq = Priority::SEQUENTIAL;
    let alt = Priority::ALERT;

    vec![
        Record::message((2, 8), (1, 10), 0).with_priority(none),
        Record::message((1, 10), (2, 8), 0).with_priority(none),
        Record::message((2, 9), (1, 11), 1).with_priority(sos),
        Record::message((2, 9), (2, 9), 2).with_priority(seq),
        Record::message((1, 11), (2, 8), 3).with_priority(seq),
        Record::message((1, 10), (2, 9), 4).with_priority(seq),
        Record::message((2, 8), (1, 10), 0).with_priority(none),
        Record::state((1, 10), 1).with_priority(none),
        Record::test_point((1, 10), 0x1234_5678).with_priority(none),
        Record::destroy((1, 10)).with_priority(none),
        Record::event((1, 11), 2).with_priority(alt),
        Record::event((2, 8), 3).with_priority(alt),
        Record::event((2, 8), 0xDEAD).with_priority(none),
    ]
}

/// Names matching [`demo_packets`].
pub fn demo_names() -> Names {
    let mut names = Names::default();
    for (module, name) in [(0, "ModA"), (1, "ModB"), (2, "ModC")] {
        names.register_module(module, name);
    }
    for (id, name) in ["MsgA", "MsgB", "MsgC", "MsgD", "MsgE", "MsgF"]
        .into_iter()
        .enumerate()
    {
        names.register_message(id as u16, name);
    }
    names
}

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let packets = demo_packets();

    if let Some(path) = args.output.as_ref() {
        let context = format!("failed writing {}", path.display());
        let file = File::create(path).map_err(|err| io_error(&context, err))?;
        let mut writer = RecordWriter::new(file);
        for packet in &packets {
            writer
                .write_packet(packet)
                .map_err(|err| trace_error(&context, err))?;
        }
        writer.flush().map_err(|err| trace_error(&context, err))?;
        info!(
            path = %path.display(),
            records = writer.records_written(),
            "demo trace written"
        );
        return Ok(SUCCESS);
    }

    let names = demo_names();
    let mut printer = PacketPrinter::new(format, &names);
    let mut offset = 0u64;
    for packet in &packets {
        printer.print(offset, packet)?;
        offset += packet.wire_len() as u64;
    }
    printer.finish();
    Ok(SUCCESS)
}
