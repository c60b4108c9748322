//! Positional binary archive codec.
//!
//! Values are appended to an [`ArchiveWriter`] and read back, in the same
//! order, from an [`ArchiveReader`]. The format carries no tags and no
//! version field; the caller owns the field order. Wire shapes:
//!
//! - `short`/`int`/`long`/`ulong`: 2/4/8/8 bytes, little-endian
//! - `float`: 4 bytes, IEEE-754 single, little-endian
//! - `guid`: 16 bytes, mixed-endian GUID layout
//! - `timestamp`: 8 bytes, signed 100 ns ticks since 0001-01-01 UTC
//! - `string`/`bytes`: 2-byte signed little-endian length, then the payload

pub mod entity;
pub mod error;
pub mod reader;
pub mod timestamp;
pub mod wire;
pub mod writer;

pub use entity::{decode_from_frame, encode_to_frame, Decode, Encode};
pub use error::{CodecError, Result};
pub use reader::ArchiveReader;
pub use timestamp::Timestamp;
pub use wire::{ArchiveLimits, FieldKind, LENGTH_PREFIX_SIZE, MAX_BLOB_LEN, MAX_STRING_LEN};
pub use writer::ArchiveWriter;

pub use uuid::Uuid;
