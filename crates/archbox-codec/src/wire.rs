use std::fmt;
use std::str::FromStr;

/// Width of the signed length prefix in front of strings and blobs.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest UTF-8 string, in bytes, a length prefix can describe.
pub const MAX_STRING_LEN: usize = i16::MAX as usize;

/// Largest opaque blob accepted by default.
pub const MAX_BLOB_LEN: usize = (i16::MAX / 2) as usize;

/// Length bounds applied when writing strings and blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum UTF-8 length of a string field. Default: 32767.
    pub max_string_len: usize,
    /// Maximum length of a blob field. Default: 16383.
    pub max_blob_len: usize,
}

impl ArchiveLimits {
    /// The same bound, the full prefix range, for strings and blobs.
    pub const fn uniform() -> Self {
        Self {
            max_string_len: MAX_STRING_LEN,
            max_blob_len: MAX_STRING_LEN,
        }
    }

    /// Clamp both bounds to what a 2-byte signed prefix can carry.
    pub fn clamped(self) -> Self {
        Self {
            max_string_len: self.max_string_len.min(MAX_STRING_LEN),
            max_blob_len: self.max_blob_len.min(MAX_STRING_LEN),
        }
    }
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_string_len: MAX_STRING_LEN,
            max_blob_len: MAX_BLOB_LEN,
        }
    }
}

/// The kinds of field the archive knows how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Short,
    Int,
    Long,
    ULong,
    Float,
    Guid,
    Timestamp,
    String,
    Bytes,
}

impl FieldKind {
    pub const ALL: [FieldKind; 9] = [
        FieldKind::Short,
        FieldKind::Int,
        FieldKind::Long,
        FieldKind::ULong,
        FieldKind::Float,
        FieldKind::Guid,
        FieldKind::Timestamp,
        FieldKind::String,
        FieldKind::Bytes,
    ];

    /// Wire width for fixed-size kinds; `None` for length-prefixed ones.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            FieldKind::Short => Some(2),
            FieldKind::Int | FieldKind::Float => Some(4),
            FieldKind::Long | FieldKind::ULong | FieldKind::Timestamp => Some(8),
            FieldKind::Guid => Some(16),
            FieldKind::String | FieldKind::Bytes => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FieldKind::Short => "short",
            FieldKind::Int => "int",
            FieldKind::Long => "long",
            FieldKind::ULong => "ulong",
            FieldKind::Float => "float",
            FieldKind::Guid => "guid",
            FieldKind::Timestamp => "timestamp",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FieldKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("unknown field kind: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_prefix_ranges() {
        let limits = ArchiveLimits::default();
        assert_eq!(limits.max_string_len, 32767);
        assert_eq!(limits.max_blob_len, 16383);
        assert_eq!(ArchiveLimits::uniform().max_blob_len, 32767);
    }

    #[test]
    fn clamped_never_exceeds_prefix() {
        let limits = ArchiveLimits {
            max_string_len: 1 << 20,
            max_blob_len: 10,
        }
        .clamped();
        assert_eq!(limits.max_string_len, MAX_STRING_LEN);
        assert_eq!(limits.max_blob_len, 10);
    }

    #[test]
    fn field_kind_parses_its_own_name() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.name().parse::<FieldKind>().unwrap(), kind);
        }
        assert_eq!(" ULong ".parse::<FieldKind>().unwrap(), FieldKind::ULong);
        assert!("double".parse::<FieldKind>().is_err());
    }
}
