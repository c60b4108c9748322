use std::io::{IsTerminal, Write};

use chrono::{SecondsFormat, Utc};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::fields::{to_hex, DecodedField};

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
struct FrameOutput<'a> {
    len: usize,
    hex: &'a str,
}

#[derive(Serialize)]
struct FieldsOutput<'a> {
    source: &'a str,
    frame_len: usize,
    fields: &'a [DecodedField],
    timestamp: String,
}

/// Print an encoded frame. `Raw` writes the frame bytes unchanged.
pub fn print_frame(frame: &[u8], format: OutputFormat) {
    let hex = to_hex(frame);
    match format {
        OutputFormat::Json => print_json(&FrameOutput {
            len: frame.len(),
            hex: &hex,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["LEN", "HEX"]);
            table.add_row(vec![frame.len().to_string(), hex]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("len={} hex={hex}", frame.len()),
        OutputFormat::Raw => print_raw(frame),
    }
}

/// Print the fields decoded from one frame received from `source`.
pub fn print_fields(fields: &[DecodedField], source: &str, frame_len: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FieldsOutput {
            source,
            frame_len,
            fields,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "KIND", "VALUE"]);
            for field in fields {
                table.add_row(vec![
                    field.index.to_string(),
                    field.kind.clone(),
                    field.value.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|field| format!("{}={}", field.kind, field.value))
                .collect();
            println!("source={source} len={frame_len} {}", rendered.join(" "));
        }
        OutputFormat::Raw => {
            for field in fields {
                println!("{}", field.value);
            }
        }
    }
}

/// Print a flat record: JSON uses `record`, the other formats use `rows`.
pub fn print_record<T: Serialize>(record: &T, rows: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (key, value) in rows {
                table.add_row(vec![key.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let rendered: Vec<String> = rows.iter().map(|(k, v)| format!("{k}={v}")).collect();
            println!("{}", rendered.join(" "));
        }
        OutputFormat::Raw => {
            for (_, value) in rows {
                println!("{value}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}
