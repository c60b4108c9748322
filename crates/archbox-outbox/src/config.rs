use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default number of write attempts per frame before it is abandoned.
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 3;

/// Configuration for an outbox and the worker that drains it.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Write attempts per frame used by spawned workers. Default: 3.
    pub max_send_attempts: u32,
    /// Readability poll timeout used by the liveness probe. Default: zero.
    pub probe_timeout: Duration,
    /// Pause a spawned worker takes after a failed write. Default: 10 ms.
    pub retry_backoff: Duration,
    /// Text encoding the connection's producers agreed on. Metadata only.
    pub encoding: TextEncoding,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
            probe_timeout: Duration::ZERO,
            retry_backoff: Duration::from_millis(10),
            encoding: TextEncoding::default(),
        }
    }
}

/// Text encoding label carried with a connection.
///
/// The outbox never transcodes; frames are opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Ascii,
    Latin1,
}

impl TextEncoding {
    pub const fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Ascii => "us-ascii",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16le" | "utf-16" | "unicode" => Ok(TextEncoding::Utf16Le),
            "utf-16be" => Ok(TextEncoding::Utf16Be),
            "us-ascii" | "ascii" => Ok(TextEncoding::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unsupported text encoding: {other}")),
        }
    }
}
