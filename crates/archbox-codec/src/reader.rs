use bytes::Bytes;
use uuid::Uuid;

use crate::error::{CodecError, Result};
use crate::timestamp::Timestamp;

/// Reads archive fields, in write order, from a complete frame.
///
/// The whole frame must be available up front; this is not a streaming
/// parser. A failed read leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    buf: Bytes,
    pos: usize,
}

impl ArchiveReader {
    pub fn new(frame: impl Into<Bytes>) -> Self {
        Self {
            buf: frame.into(),
            pos: 0,
        }
    }

    /// Length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let payload = self.read_prefixed()?;
        match std::str::from_utf8(&payload) {
            Ok(text) => Ok(text.to_owned()),
            Err(err) => {
                self.pos = start;
                Err(CodecError::InvalidUtf8(err))
            }
        }
    }

    /// Length-prefixed opaque blob. Shares the frame's storage.
    pub fn read_bytes(&mut self) -> Result<Bytes> {
        self.read_prefixed()
    }

    pub fn read_short(&mut self) -> Result<i16> {
        self.take_array().map(i16::from_le_bytes)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        self.take_array().map(i32::from_le_bytes)
    }

    pub fn read_long(&mut self) -> Result<i64> {
        self.take_array().map(i64::from_le_bytes)
    }

    pub fn read_ulong(&mut self) -> Result<u64> {
        self.take_array().map(u64::from_le_bytes)
    }

    pub fn read_float(&mut self) -> Result<f32> {
        self.take_array().map(f32::from_le_bytes)
    }

    pub fn read_guid(&mut self) -> Result<Uuid> {
        self.take_array().map(Uuid::from_bytes_le)
    }

    pub fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.read_long().map(Timestamp::from_ticks)
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn read_prefixed(&mut self) -> Result<Bytes> {
        let start = self.pos;
        let len = self.read_short()?;
        if len < 0 {
            self.pos = start;
            return Err(CodecError::NegativeLength(len));
        }
        match self.take(len as usize) {
            Ok(payload) => Ok(payload),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    fn take(&mut self, needed: usize) -> Result<Bytes> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(CodecError::TruncatedData { needed, remaining });
        }
        let slice = self.buf.slice(self.pos..self.pos + needed);
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let remaining = self.remaining();
        if N > remaining {
            return Err(CodecError::TruncatedData {
                needed: N,
                remaining,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ArchiveWriter;

    #[test]
    fn reads_fields_in_write_order() {
        let id = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let mut writer = ArchiveWriter::new();
        writer.write_string("player-1").unwrap();
        writer.write_short(-12);
        writer.write_int(40_000);
        writer.write_long(-9_000_000_000);
        writer.write_ulong(u64::MAX);
        writer.write_float(1.5);
        writer.write_bytes(&[0xde, 0xad]).unwrap();
        writer.write_guid(&id);
        writer.write_timestamp(Timestamp::from_ticks(638_000_000_000_000_000));

        let mut reader = ArchiveReader::new(writer.finalize());
        assert_eq!(reader.read_string().unwrap(), "player-1");
        assert_eq!(reader.read_short().unwrap(), -12);
        assert_eq!(reader.read_int().unwrap(), 40_000);
        assert_eq!(reader.read_long().unwrap(), -9_000_000_000);
        assert_eq!(reader.read_ulong().unwrap(), u64::MAX);
        assert_eq!(reader.read_float().unwrap(), 1.5);
        assert_eq!(reader.read_bytes().unwrap().as_ref(), &[0xde, 0xad]);
        assert_eq!(reader.read_guid().unwrap(), id);
        assert_eq!(
            reader.read_timestamp().unwrap(),
            Timestamp::from_ticks(638_000_000_000_000_000)
        );
        assert!(reader.is_exhausted());
    }

    #[test]
    fn truncated_fixed_width_field() {
        let mut reader = ArchiveReader::new(vec![1u8, 2, 3]);
        let err = reader.read_int().unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedData {
                needed: 4,
                remaining: 3
            }
        ));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_short().unwrap(), 0x0201);
    }

    #[test]
    fn truncated_string_payload_rewinds_to_prefix() {
        let mut reader = ArchiveReader::new(vec![5u8, 0, b'a', b'b']);
        let err = reader.read_string().unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedData {
                needed: 5,
                remaining: 2
            }
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn negative_length_prefix_is_rejected() {
        let mut reader = ArchiveReader::new((-1i16).to_le_bytes().to_vec());
        assert!(matches!(
            reader.read_bytes().unwrap_err(),
            CodecError::NegativeLength(-1)
        ));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut reader = ArchiveReader::new(vec![2u8, 0, 0xff, 0xfe]);
        assert!(matches!(
            reader.read_string().unwrap_err(),
            CodecError::InvalidUtf8(_)
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn clone_has_its_own_cursor() {
        let mut writer = ArchiveWriter::new();
        writer.write_short(1);
        writer.write_short(2);

        let mut first = ArchiveReader::new(writer.finalize());
        assert_eq!(first.read_short().unwrap(), 1);

        let mut second = first.clone();
        assert_eq!(second.read_short().unwrap(), 2);
        assert!(second.is_exhausted());
        assert_eq!(first.remaining(), 2);
        assert_eq!(first.read_short().unwrap(), 2);
    }

    #[test]
    fn blob_shares_frame_storage() {
        let mut writer = ArchiveWriter::new();
        writer.write_bytes(b"payload").unwrap();
        let frame = writer.finalize();

        let mut reader = ArchiveReader::new(frame.clone());
        let blob = reader.read_bytes().unwrap();
        assert_eq!(blob.as_ptr(), frame[2..].as_ptr());
    }
}
