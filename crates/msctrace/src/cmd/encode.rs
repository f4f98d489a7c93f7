use std::fs::OpenOptions;

use msctrace_codec::{encode_to_bytes, RecordWriter};
use msctrace_record::{Opcode, Record};
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, trace_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let packet = build_record(&args)?.with_priority(args.priority);

    if let Some(path) = args.append.as_ref() {
        let context = format!("failed appending to {}", path.display());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| io_error(&context, err))?;
        let mut writer = RecordWriter::new(file);
        writer
            .write_packet(&packet)
            .map_err(|err| trace_error(&context, err))?;
        info!(
            path = %path.display(),
            opcode = %packet.record.opcode(),
            bytes = packet.wire_len(),
            "record appended"
        );
        return Ok(SUCCESS);
    }

    let wire = encode_to_bytes(&packet);
    print_encoded(&packet, &wire, format)?;
    Ok(SUCCESS)
}

/// Build a record from flags, rejecting fields the opcode does not carry.
pub fn build_record(args: &EncodeArgs) -> CliResult<Record> {
    let opcode = args.opcode;
    let wants_dest = opcode == Opcode::Msg;
    let wants_id = matches!(
        opcode,
        Opcode::Msg | Opcode::Evt | Opcode::Sta | Opcode::Ack
    );
    let wants_data = opcode == Opcode::Tp;

    reject_extra(opcode, "--dest", args.dest.is_some() && !wants_dest)?;
    reject_extra(opcode, "--id", args.id.is_some() && !wants_id)?;
    reject_extra(opcode, "--data", args.data.is_some() && !wants_data)?;

    let record = match opcode {
        Opcode::Msg => Record::message(
            args.subject,
            require(opcode, "--dest", args.dest)?,
            require(opcode, "--id", args.id)?,
        ),
        Opcode::Evt => Record::event(args.subject, require(opcode, "--id", args.id)?),
        Opcode::Sta => Record::state(args.subject, require(opcode, "--id", args.id)?),
        Opcode::Tp => Record::test_point(args.subject, require(opcode, "--data", args.data)?),
        Opcode::Des => Record::destroy(args.subject),
        Opcode::Ack => Record::acknowledge(args.subject, require(opcode, "--id", args.id)?),
    };
    Ok(record)
}

fn require<T>(opcode: Opcode, flag: &str, value: Option<T>) -> CliResult<T> {
    value.ok_or_else(|| CliError::new(USAGE, format!("{opcode} requires {flag}")))
}

fn reject_extra(opcode: Opcode, flag: &str, present: bool) -> CliResult<()> {
    if present {
        return Err(CliError::new(
            USAGE,
            format!("{flag} is not valid for {opcode}"),
        ));
    }
    Ok(())
}
