use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use msctrace_record::{Packet, Record};
use serde::Serialize;

use crate::exit::{io_error, CliResult};
use crate::names::Names;

const RECORD_SCHEMA_ID: &str = "urn:msctrace:cli:v1:record";
const ENCODED_SCHEMA_ID: &str = "urn:msctrace:cli:v1:encoded";

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    schema_id: &'static str,
    offset: u64,
    opcode: &'static str,
    priority: Vec<&'static str>,
    length: usize,
    #[serde(flatten)]
    record: &'a Record,
    subject_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_label: Option<String>,
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    schema_id: &'static str,
    opcode: &'static str,
    priority: Vec<&'static str>,
    length: usize,
    hex: String,
    #[serde(flatten)]
    record: &'a Record,
}

/// Renders decoded packets to stdout in the selected format.
///
/// Table output is buffered and printed by [`PacketPrinter::finish`].
pub struct PacketPrinter<'a> {
    format: OutputFormat,
    names: &'a Names,
    table: Option<Table>,
}

impl<'a> PacketPrinter<'a> {
    pub fn new(format: OutputFormat, names: &'a Names) -> Self {
        let table = (format == OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "OFFSET", "OPCODE", "PRIORITY", "SUBJECT", "DEST", "DETAIL",
                ]);
            table
        });
        Self {
            format,
            names,
            table,
        }
    }

    pub fn print(&mut self, offset: u64, packet: &Packet) -> CliResult<()> {
        let record = &packet.record;
        match self.format {
            OutputFormat::Json => {
                let out = packet_output(offset, packet, self.names);
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        offset.to_string(),
                        record.opcode().name().to_string(),
                        packet.priority.to_string(),
                        self.names.object_label(record.subject()),
                        record
                            .destination()
                            .map(|d| self.names.object_label(d))
                            .unwrap_or_default(),
                        detail(record, self.names),
                    ]);
                }
            }
            OutputFormat::Pretty => {
                println!(
                    "offset={} opcode={} priority={} {}",
                    offset,
                    record.opcode().name(),
                    packet.priority,
                    describe(record, self.names)
                );
            }
            OutputFormat::Raw => {
                print_raw(&msctrace_codec::encode_to_bytes(packet))?;
            }
        }
        Ok(())
    }

    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }
}

/// Print an encoded packet. Raw writes the wire bytes; the rest show hex.
pub fn print_encoded(packet: &Packet, wire: &[u8], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Raw => print_raw(wire)?,
        OutputFormat::Json => {
            let out = EncodedOutput {
                schema_id: ENCODED_SCHEMA_ID,
                opcode: packet.record.opcode().name(),
                priority: packet.priority.short_names(),
                length: packet.record.payload_len(),
                hex: hex::encode(wire),
                record: &packet.record,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", hex::encode(wire)),
    }
    Ok(())
}

pub fn print_raw(data: &[u8]) -> CliResult<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(data)
        .and_then(|()| out.flush())
        .map_err(|err| io_error("failed writing stdout", err))
}

fn packet_output<'a>(offset: u64, packet: &'a Packet, names: &Names) -> PacketOutput<'a> {
    let record = &packet.record;
    PacketOutput {
        schema_id: RECORD_SCHEMA_ID,
        offset,
        opcode: record.opcode().name(),
        priority: packet.priority.short_names(),
        length: record.payload_len(),
        record,
        subject_label: names.object_label(record.subject()),
        destination_label: record.destination().map(|d| names.object_label(d)),
        message_label: record.id().map(|id| names.message_label(id)),
    }
}

// Message, event, state and ack ids share one dictionary.
fn detail(record: &Record, names: &Names) -> String {
    match *record {
        Record::TestPoint { data, .. } => format!("data=0x{data:08x}"),
        Record::Destroy { .. } => String::new(),
        _ => record
            .id()
            .map(|id| names.message_label(id))
            .unwrap_or_default(),
    }
}

/// One-line chart description of a record.
pub fn describe(record: &Record, names: &Names) -> String {
    let subject = names.object_label(record.subject());
    match *record {
        Record::Message {
            destination,
            message_id,
            ..
        } => format!(
            "{subject} -> {} {}",
            names.object_label(destination),
            names.message_label(message_id)
        ),
        Record::Acknowledge { message_id, .. } => {
            format!("{subject} ack {}", names.message_label(message_id))
        }
        Record::Destroy { .. } => format!("{subject} destroyed"),
        _ => format!("{subject} {}", detail(record, names)),
    }
}
