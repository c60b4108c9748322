use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{CodecError, Result};
use crate::timestamp::Timestamp;
use crate::wire::{ArchiveLimits, FieldKind, LENGTH_PREFIX_SIZE};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Appends archive fields to a growable buffer.
///
/// Cloning a writer snapshots its buffer; later writes to either copy do not
/// show up in the other.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    buf: BytesMut,
    limits: ArchiveLimits,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    /// Create an empty writer with default limits.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY)
    }

    /// Create an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            limits: ArchiveLimits::default(),
        }
    }

    /// Create an empty writer with explicit string/blob bounds.
    pub fn with_limits(limits: ArchiveLimits) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            limits: limits.clamped(),
        }
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_prefixed(FieldKind::String, value.as_bytes(), self.limits.max_string_len)
    }

    /// Length-prefixed opaque blob.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_prefixed(FieldKind::Bytes, value, self.limits.max_blob_len)
    }

    pub fn write_short(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    pub fn write_int(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_long(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn write_ulong(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_float(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_guid(&mut self, value: &Uuid) {
        self.buf.put_slice(&value.to_bytes_le());
    }

    pub fn write_timestamp(&mut self, value: Timestamp) {
        self.buf.put_i64_le(value.ticks());
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Limits applied to strings and blobs.
    pub fn limits(&self) -> ArchiveLimits {
        self.limits
    }

    /// Consume the writer and return the encoded frame.
    pub fn finalize(self) -> Bytes {
        self.buf.freeze()
    }

    fn write_prefixed(&mut self, kind: FieldKind, payload: &[u8], max: usize) -> Result<()> {
        // Validate before the prefix goes out so a rejected field leaves no trace.
        if payload.len() > max {
            tracing::debug!(%kind, len = payload.len(), max, "rejecting oversized field");
            return Err(CodecError::EncodingTooLarge {
                kind,
                len: payload.len(),
                max,
            });
        }
        self.buf.reserve(LENGTH_PREFIX_SIZE + payload.len());
        self.buf.put_i16_le(payload.len() as i16);
        self.buf.put_slice(payload);
        Ok(())
    }
}
