use std::io::Read;

use bytes::Bytes;

use crate::cmd::DecodeArgs;
use crate::exit::{field_error, io_error, CliError, CliResult, SUCCESS};
use crate::fields::{decode_fields, from_hex};
use crate::output::{print_fields, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let hex = match args.hex {
        Some(hex) => hex,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|err| io_error("failed reading stdin", err))?;
            input
        }
    };
    let frame = Bytes::from(from_hex(&hex).map_err(CliError::usage)?);
    let len = frame.len();

    let fields = decode_fields(&args.layout.0, frame)
        .map_err(|err| field_error("decode failed", err))?;
    print_fields(&fields, "input", len, format);
    Ok(SUCCESS)
}
