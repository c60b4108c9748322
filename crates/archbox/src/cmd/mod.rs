use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use archbox_codec::FieldKind;
use archbox_outbox::{TextEncoding, DEFAULT_MAX_SEND_ATTEMPTS};
#[cfg(unix)]
use archbox_transport::UnixDomainSocket;
use archbox_transport::{Stream, TcpSocket};
use clap::{Args, Subcommand};

use crate::exit::{transport_error, CliError, CliResult, INTERNAL};
use crate::fields::{parse_layout, FieldSpec};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod probe;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode fields into an archive frame.
    Encode(EncodeArgs),
    /// Decode a hex frame with a field layout.
    Decode(DecodeArgs),
    /// Queue frames on a connection and drain them.
    Send(SendArgs),
    /// Accept connections and decode received frames.
    Listen(ListenArgs),
    /// Repeatedly check whether a peer is still connected.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Field to append, as kind=value (repeatable, in wire order).
    #[arg(long = "field", short = 'f', value_name = "KIND=VALUE", required = true)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame as hex. Reads stdin when omitted.
    pub hex: Option<String>,
    /// Field kinds in wire order (comma-separated).
    #[arg(long, value_parser = parse_layout_arg)]
    pub layout: Layout,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to (unix:/path, /path, or host:port).
    pub address: Address,
    /// Field to append, as kind=value (repeatable, in wire order).
    #[arg(long = "field", short = 'f', value_name = "KIND=VALUE", required = true)]
    pub fields: Vec<FieldSpec>,
    /// Queue the frame this many times.
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
    /// Write attempts per frame before it is dropped.
    #[arg(long, default_value_t = DEFAULT_MAX_SEND_ATTEMPTS, env = "ARCHBOX_MAX_ATTEMPTS")]
    pub max_attempts: u32,
    /// Text encoding label recorded on the connection.
    #[arg(long, default_value = "utf-8")]
    pub encoding: TextEncoding,
    /// Maximum time to wait for the queue to drain (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (unix:/path, /path, or host:port).
    pub address: Address,
    /// Field kinds in wire order (comma-separated).
    #[arg(long, value_parser = parse_layout_arg)]
    pub layout: Layout,
    /// Exit after decoding N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Address to connect to (unix:/path, /path, or host:port).
    pub address: Address,
    /// Time between probes (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Stop after N probes. Default: until the peer disappears.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Field kinds expected in each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout(pub Vec<FieldKind>);

fn parse_layout_arg(input: &str) -> Result<Layout, String> {
    let kinds = parse_layout(input)?;
    if kinds.is_empty() {
        return Err("layout must name at least one field kind".to_string());
    }
    Ok(Layout(kinds))
}

/// Where to bind or connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Unix(PathBuf),
    Tcp(String),
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err("unix: address needs a path".to_string());
            }
            return Ok(Address::Unix(PathBuf::from(path)));
        }
        if s.contains('/') {
            return Ok(Address::Unix(PathBuf::from(s)));
        }
        match s.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Address::Tcp(s.to_string()))
            }
            _ => Err(format!("expected unix:/path, a socket path, or host:port, got: {s}")),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Unix(path) => write!(f, "unix:{}", path.display()),
            Address::Tcp(addr) => f.write_str(addr),
        }
    }
}

impl Address {
    pub fn connect(&self) -> CliResult<Stream> {
        let stream = match self {
            #[cfg(unix)]
            Address::Unix(path) => UnixDomainSocket::connect(path),
            #[cfg(not(unix))]
            Address::Unix(_) => return Err(unix_unsupported()),
            Address::Tcp(addr) => TcpSocket::connect(addr.as_str()),
        };
        stream.map_err(|err| transport_error("connect failed", err))
    }
}

/// A bound listener for either address family.
pub enum Listener {
    #[cfg(unix)]
    Unix(UnixDomainSocket),
    Tcp(TcpSocket),
}

impl Listener {
    pub fn bind(address: &Address) -> CliResult<Self> {
        let listener = match address {
            #[cfg(unix)]
            Address::Unix(path) => UnixDomainSocket::bind(path).map(Listener::Unix),
            #[cfg(not(unix))]
            Address::Unix(_) => return Err(unix_unsupported()),
            Address::Tcp(addr) => TcpSocket::bind(addr.as_str()).map(Listener::Tcp),
        };
        listener.map_err(|err| transport_error("bind failed", err))
    }

    pub fn accept(&self) -> CliResult<Stream> {
        let stream = match self {
            #[cfg(unix)]
            Listener::Unix(listener) => listener.accept(),
            Listener::Tcp(listener) => listener.accept(),
        };
        stream.map_err(|err| transport_error("accept failed", err))
    }
}

#[cfg(not(unix))]
fn unix_unsupported() -> CliError {
    CliError::usage("unix socket addresses need a unix host")
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Clear `running` on Ctrl-C.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
