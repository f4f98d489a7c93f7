use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use msctrace_codec::{RecordReader, StreamConfig};
use msctrace_record::{Opcode, Packet, Priority};
use tracing::{debug, info};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, trace_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::names::Names;
use crate::output::{OutputFormat, PacketPrinter};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let names = match args.names.as_deref() {
        Some(path) => Names::load(path)?,
        None => Names::default(),
    };

    let source = open_input(args.input.as_deref(), args.hex)?;
    let mut config = StreamConfig {
        resync: args.resync,
        ..StreamConfig::default()
    };
    if let Some(limit) = args.max_resync_skip {
        config.max_resync_skip = limit;
    }

    let filter = RecordFilter {
        opcodes: args.opcode,
        modules: args.module,
        priority: args.priority,
    };

    let mut printer = PacketPrinter::new(format, &names);
    let result = decode_stream(source, config, &filter, args.count, |offset, packet| {
        printer.print(offset, packet)
    });
    printer.finish();

    let summary = result?;
    info!(
        records = summary.records,
        filtered = summary.filtered,
        skipped = summary.skipped,
        "decode complete"
    );
    Ok(SUCCESS)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub records: usize,
    pub filtered: usize,
    pub skipped: u64,
}

/// Record selection for decode output. `None` fields match everything.
#[derive(Debug, Default)]
pub struct RecordFilter {
    pub opcodes: Option<Vec<Opcode>>,
    pub modules: Option<Vec<u8>>,
    pub priority: Option<Priority>,
}

impl RecordFilter {
    pub fn matches(&self, packet: &Packet) -> bool {
        let record = &packet.record;
        if let Some(opcodes) = &self.opcodes {
            if !opcodes.contains(&record.opcode()) {
                return false;
            }
        }
        if let Some(modules) = &self.modules {
            let subject = record.subject().module();
            let destination = record.destination().map(|d| d.module());
            if !modules.contains(&subject) && !destination.is_some_and(|m| modules.contains(&m)) {
                return false;
            }
        }
        self.priority
            .is_none_or(|wanted| packet.priority.contains(wanted))
    }
}

/// Decode records from `source`, handing each one that passes `filter` to
/// `emit` with its stream offset. `limit` counts emitted records.
pub fn decode_stream<R, F>(
    source: R,
    config: StreamConfig,
    filter: &RecordFilter,
    limit: Option<usize>,
    mut emit: F,
) -> CliResult<DecodeSummary>
where
    R: Read,
    F: FnMut(u64, &Packet) -> CliResult<()>,
{
    let mut reader = RecordReader::with_config(source, config);
    let mut consumed: u64 = 0;
    let mut records = 0usize;
    let mut filtered = 0usize;

    while limit.is_none_or(|max| records < max) {
        let packet = match reader.try_read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(err) => {
                let position = consumed + reader.skipped_bytes();
                debug!(offset = position, error = %err, "decode stopped");
                return Err(trace_error(
                    &format!("decode failed at offset {position}"),
                    err,
                ));
            }
        };

        consumed += packet.wire_len() as u64;
        let offset = consumed + reader.skipped_bytes() - packet.wire_len() as u64;
        if !filter.matches(&packet) {
            filtered += 1;
            continue;
        }
        emit(offset, &packet)?;
        records += 1;
    }

    Ok(DecodeSummary {
        records,
        filtered,
        skipped: reader.skipped_bytes(),
    })
}

fn open_input(path: Option<&Path>, hex: bool) -> CliResult<Box<dyn Read>> {
    let source: Box<dyn Read> = match path {
        Some(path) if path != Path::new("-") => {
            let context = format!("failed opening {}", path.display());
            Box::new(File::open(path).map_err(|err| io_error(&context, err))?)
        }
        _ => Box::new(std::io::stdin().lock()),
    };

    if !hex {
        return Ok(source);
    }
    Ok(Box::new(Cursor::new(read_hex(source)?)))
}

/// Read hex text, ignoring whitespace between digits.
pub fn read_hex(mut source: impl Read) -> CliResult<Vec<u8>> {
    let mut text = String::new();
    source
        .read_to_string(&mut text)
        .map_err(|err| io_error("failed reading hex input", err))?;
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}
