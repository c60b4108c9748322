use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{field_error, CliResult, SUCCESS};
use crate::fields::encode_fields;
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = encode_fields(&args.fields).map_err(|err| field_error("encode failed", err))?;
    debug!(fields = args.fields.len(), len = frame.len(), "frame encoded");
    print_frame(&frame, format);
    Ok(SUCCESS)
}
