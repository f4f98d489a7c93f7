use clap::{Args, Subcommand};
use msctrace_record::{ObjectId, Opcode, Priority};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod demo;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a single record to wire bytes.
    Encode(EncodeArgs),
    /// Decode a captured record stream.
    Decode(DecodeArgs),
    /// Emit the sample trace.
    Demo(DemoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Demo(args) => demo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Record kind (MSG, EVT, STA, TP, DES, ACK or 0-5).
    #[arg(long, short = 'o')]
    pub opcode: Opcode,
    /// Subject object as MODULE:INSTANCE (the sender for MSG).
    #[arg(long, short = 's', value_name = "OBJECT")]
    pub subject: ObjectId,
    /// Destination object as MODULE:INSTANCE (MSG only).
    #[arg(long, short = 'd', value_name = "OBJECT")]
    pub dest: Option<ObjectId>,
    /// Message, event or state id (MSG, EVT, STA, ACK).
    #[arg(long, value_parser = parse_u16)]
    pub id: Option<u16>,
    /// 32-bit test point sample (TP only).
    #[arg(long, value_parser = parse_u32)]
    pub data: Option<u32>,
    /// Priority flags, e.g. SOS, SEQ|ALT or 0-7.
    #[arg(long, short = 'p', default_value = "none")]
    pub priority: Priority,
    /// Append the encoded bytes to FILE instead of printing them.
    #[arg(long, value_name = "FILE")]
    pub append: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read. Reads stdin when omitted or "-".
    pub input: Option<PathBuf>,
    /// Treat the input as hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Skip corrupt bytes instead of stopping at the first bad record.
    #[arg(long)]
    pub resync: bool,
    /// Longest run of bytes to skip while resynchronizing.
    #[arg(long, value_name = "BYTES", requires = "resync")]
    pub max_resync_skip: Option<usize>,
    /// JSON dictionary of module and message names.
    #[arg(long, value_name = "FILE")]
    pub names: Option<PathBuf>,
    /// Stop after N records.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only show these record kinds (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub opcode: Option<Vec<Opcode>>,
    /// Only show records whose subject or destination is in these modules (comma-separated).
    #[arg(long, value_delimiter = ',', value_parser = parse_u8)]
    pub module: Option<Vec<u8>>,
    /// Only show records carrying all of these priority flags.
    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Write the binary trace to FILE.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_u8(s: &str) -> Result<u8, String> {
    parse_u32(s).and_then(|v| u8::try_from(v).map_err(|_| format!("{s} exceeds 0xFF")))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    parse_u32(s).and_then(|v| u16::try_from(v).map_err(|_| format!("{s} exceeds 0xFFFF")))
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid number {s:?}: {err}"))
}
