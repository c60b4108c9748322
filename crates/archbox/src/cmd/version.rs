use archbox_codec::{MAX_BLOB_LEN, MAX_STRING_LEN};
use archbox_outbox::DEFAULT_MAX_SEND_ATTEMPTS;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("archbox {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: archbox");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ARCHBOX_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("byte_order: little-endian");
    println!("max_string_len: {MAX_STRING_LEN}");
    println!("max_blob_len: {MAX_BLOB_LEN}");
    println!("default_max_attempts: {DEFAULT_MAX_SEND_ATTEMPTS}");
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
