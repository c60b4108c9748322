use bytes::Bytes;
use tracing::debug;

use crate::error::{CodecError, Result};
use crate::reader::ArchiveReader;
use crate::writer::ArchiveWriter;

/// A value that can write itself into an archive.
///
/// Implementations choose the field order; the matching [`Decode`] impl must
/// read fields back in that same order.
pub trait Encode {
    fn encode(&self, writer: &mut ArchiveWriter) -> Result<()>;
}

/// A value that can read itself back out of an archive.
pub trait Decode: Sized {
    fn decode(reader: &mut ArchiveReader) -> Result<Self>;
}

/// Encode `value` into a fresh frame.
pub fn encode_to_frame<T: Encode + ?Sized>(value: &T) -> Result<Bytes> {
    let mut writer = ArchiveWriter::new();
    value.encode(&mut writer)?;
    Ok(writer.finalize())
}

/// Decode a `T` that must occupy the whole frame.
pub fn decode_from_frame<T: Decode>(frame: impl Into<Bytes>) -> Result<T> {
    let mut reader = ArchiveReader::new(frame);
    let value = T::decode(&mut reader)?;
    if !reader.is_exhausted() {
        debug!(
            trailing = reader.remaining(),
            consumed = reader.position(),
            "frame has bytes past the decoded entity"
        );
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::timestamp::Timestamp;

    #[derive(Debug, PartialEq)]
    struct SessionNotice {
        session: Uuid,
        user: String,
        issued: Timestamp,
        retries: i16,
        token: Bytes,
    }

    impl Encode for SessionNotice {
        fn encode(&self, writer: &mut ArchiveWriter) -> Result<()> {
            writer.write_guid(&self.session);
            writer.write_string(&self.user)?;
            writer.write_timestamp(self.issued);
            writer.write_short(self.retries);
            writer.write_bytes(&self.token)
        }
    }

    impl Decode for SessionNotice {
        fn decode(reader: &mut ArchiveReader) -> Result<Self> {
            Ok(Self {
                session: reader.read_guid()?,
                user: reader.read_string()?,
                issued: reader.read_timestamp()?,
                retries: reader.read_short()?,
                token: reader.read_bytes()?,
            })
        }
    }

    fn notice() -> SessionNotice {
        SessionNotice {
            session: Uuid::from_u128(42),
            user: "alise".to_string(),
            issued: Timestamp::from_ticks(635_000_000_000_000_000),
            retries: 3,
            token: Bytes::from_static(b"\x00\x01\x02"),
        }
    }

    #[test]
    fn entity_round_trip() {
        let frame = encode_to_frame(&notice()).unwrap();
        let decoded: SessionNotice = decode_from_frame(frame).unwrap();
        assert_eq!(decoded, notice());
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let mut writer = ArchiveWriter::new();
        notice().encode(&mut writer).unwrap();
        writer.write_int(99);

        let err = decode_from_frame::<SessionNotice>(writer.finalize()).unwrap_err();
        assert!(matches!(err, CodecError::TrailingBytes(4)));
    }

    #[test]
    fn short_frame_is_truncated() {
        let frame = encode_to_frame(&notice()).unwrap();
        let cut = frame.slice(..frame.len() - 1);
        let err = decode_from_frame::<SessionNotice>(cut).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedData { .. }));
    }
}
