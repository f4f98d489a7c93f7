use msctrace_record::{Opcode, HEADER_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("msctrace {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: msctrace");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("MSCTRACE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: async={}, serde={}, cli=true",
        cfg!(feature = "async"),
        cfg!(feature = "serde")
    );
    println!("header_size: {HEADER_SIZE}");
    let opcodes: Vec<String> = Opcode::ALL
        .iter()
        .map(|op| format!("{}={}", op.name(), op.as_u8()))
        .collect();
    println!("opcodes: {}", opcodes.join(", "));

    Ok(SUCCESS)
}
