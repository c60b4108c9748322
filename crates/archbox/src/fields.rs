use std::str::FromStr;

use archbox_codec::{ArchiveReader, ArchiveWriter, CodecError, FieldKind, Timestamp, Uuid};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A `kind=value` pair given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub value: String,
}

impl FromStr for FieldSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected kind=value, got: {s}"))?;
        Ok(Self {
            kind: kind.parse()?,
            value: value.to_string(),
        })
    }
}

/// One field read back out of a frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DecodedField {
    pub index: usize,
    pub kind: String,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("field {index} ({kind}): {message}")]
    Value {
        index: usize,
        kind: FieldKind,
        message: String,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Encode `fields` in order into one frame.
pub fn encode_fields(fields: &[FieldSpec]) -> Result<Bytes, FieldError> {
    let mut writer = ArchiveWriter::new();
    for (index, field) in fields.iter().enumerate() {
        let bad = |message: String| FieldError::Value {
            index,
            kind: field.kind,
            message,
        };
        let value = field.value.as_str();
        match field.kind {
            FieldKind::Short => writer.write_short(parse_num(value).map_err(bad)?),
            FieldKind::Int => writer.write_int(parse_num(value).map_err(bad)?),
            FieldKind::Long => writer.write_long(parse_num(value).map_err(bad)?),
            FieldKind::ULong => writer.write_ulong(parse_num(value).map_err(bad)?),
            FieldKind::Float => writer.write_float(parse_num(value).map_err(bad)?),
            FieldKind::Guid => {
                let guid = Uuid::parse_str(value).map_err(|err| bad(err.to_string()))?;
                writer.write_guid(&guid);
            }
            FieldKind::Timestamp => {
                writer.write_timestamp(parse_timestamp(value).map_err(bad)?);
            }
            FieldKind::String => writer.write_string(value)?,
            FieldKind::Bytes => writer.write_bytes(&from_hex(value).map_err(bad)?)?,
        }
    }
    Ok(writer.finalize())
}

/// Read one field per entry of `layout` from `frame`.
///
/// Fails with `TrailingBytes` when the layout does not cover the whole frame.
pub fn decode_fields(
    layout: &[FieldKind],
    frame: Bytes,
) -> Result<Vec<DecodedField>, FieldError> {
    let mut reader = ArchiveReader::new(frame);
    let mut out = Vec::with_capacity(layout.len());
    for (index, &kind) in layout.iter().enumerate() {
        let value = match kind {
            FieldKind::Short => reader.read_short()?.to_string(),
            FieldKind::Int => reader.read_int()?.to_string(),
            FieldKind::Long => reader.read_long()?.to_string(),
            FieldKind::ULong => reader.read_ulong()?.to_string(),
            FieldKind::Float => reader.read_float()?.to_string(),
            FieldKind::Guid => reader.read_guid()?.hyphenated().to_string(),
            FieldKind::Timestamp => reader.read_timestamp()?.to_string(),
            FieldKind::String => reader.read_string()?,
            FieldKind::Bytes => to_hex(&reader.read_bytes()?),
        };
        out.push(DecodedField {
            index,
            kind: kind.name().to_string(),
            value,
        });
    }
    if !reader.is_exhausted() {
        return Err(CodecError::TrailingBytes(reader.remaining()).into());
    }
    Ok(out)
}

/// Parse a comma-separated list of field kinds.
pub fn parse_layout(input: &str) -> Result<Vec<FieldKind>, String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(FieldKind::from_str)
        .collect()
}

pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Hex digits in either case; whitespace between them is ignored.
pub fn from_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    hex::decode(digits).map_err(|err| format!("invalid hex: {err}"))
}

fn parse_num<T: FromStr>(value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| format!("invalid number {value:?}: {err}"))
}

/// RFC 3339 text, `now`, or a raw tick count.
fn parse_timestamp(value: &str) -> Result<Timestamp, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("now") {
        return Ok(Timestamp::now());
    }
    if let Ok(ticks) = value.parse::<i64>() {
        return Ok(Timestamp::from_ticks(ticks));
    }
    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|err| format!("invalid timestamp {value:?}: {err}"))?;
    Timestamp::from_datetime(parsed.with_timezone(&Utc))
        .ok_or_else(|| format!("timestamp out of range: {value}"))
}
