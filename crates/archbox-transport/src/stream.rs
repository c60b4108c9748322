use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected stream socket.
///
/// Implements `Read` + `Write` both by value and through a shared reference,
/// so a single handle can be written by one context while another queries
/// its liveness.
pub struct Stream {
    inner: StreamInner,
    connected: AtomicBool,
}

enum StreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Read for &Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let result = match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => (&*stream).read(buf),
            StreamInner::Tcp(stream) => (&*stream).read(buf),
        };
        self.track(result)
    }
}

impl Write for &Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let result = match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => (&*stream).write(buf),
            StreamInner::Tcp(stream) => (&*stream).write(buf),
        };
        self.track(result)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let result = match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => (&*stream).flush(),
            StreamInner::Tcp(stream) => (&*stream).flush(),
        };
        self.track(result)
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (&*self).read(buf)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (&*self).flush()
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for Stream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self::from_unix(stream)
    }
}

impl From<TcpStream> for Stream {
    fn from(stream: TcpStream) -> Self {
        Self::from_tcp(stream)
    }
}

impl Stream {
    /// Wrap an already-connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
            connected: AtomicBool::new(true),
        }
    }

    /// Wrap an already-connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: StreamInner::Tcp(stream),
            connected: AtomicBool::new(true),
        }
    }

    /// Whether the socket still considers itself connected.
    ///
    /// Reflects the outcome of the most recent I/O and whether the socket
    /// still has a peer address. No data is read or written.
    pub fn is_connected(&self) -> bool {
        if !self.connected.load(Ordering::Acquire) {
            return false;
        }
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.peer_addr().is_ok(),
            StreamInner::Tcp(stream) => stream.peer_addr().is_ok(),
        }
    }

    /// Number of bytes that can be read without blocking.
    #[cfg(unix)]
    pub fn bytes_available(&self) -> Result<usize> {
        let fd = self.raw_fd();
        let mut available: libc::c_int = 0;

        // SAFETY: `fd` is an open socket descriptor owned by this stream and
        // `available` is a valid writable `c_int` for FIONREAD.
        let rc = unsafe { libc::ioctl(fd, libc::FIONREAD as _, &mut available) };
        if rc < 0 {
            return Err(classify_os_error(std::io::Error::last_os_error()));
        }
        Ok(available.max(0) as usize)
    }

    /// Number of bytes that can be read without blocking.
    #[cfg(not(unix))]
    pub fn bytes_available(&self) -> Result<usize> {
        Err(TransportError::Io(std::io::Error::from(ErrorKind::Unsupported)))
    }

    /// Poll the socket for readability, waiting at most `timeout`.
    ///
    /// A socket whose peer has hung up or which carries a pending error is
    /// reported readable: a read would return immediately.
    #[cfg(unix)]
    pub fn poll_readable(&self, timeout: Duration) -> Result<bool> {
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
        let mut pfd = libc::pollfd {
            fd: self.raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        loop {
            // SAFETY: `pfd` is a valid pollfd array of length 1 for the
            // duration of the call.
            let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(classify_os_error(err));
            }
            if rc == 0 {
                return Ok(false);
            }
            if pfd.revents & libc::POLLNVAL != 0 {
                return Err(TransportError::Shutdown);
            }
            return Ok(pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0);
        }
    }

    /// Poll the socket for readability, waiting at most `timeout`.
    #[cfg(not(unix))]
    pub fn poll_readable(&self, _timeout: Duration) -> Result<bool> {
        Err(TransportError::Io(std::io::Error::from(ErrorKind::Unsupported)))
    }

    /// Write a complete buffer, retrying on interruption.
    ///
    /// A failure after some bytes went out is reported as
    /// [`TransportError::PartialWrite`] so the caller can resume from there.
    pub fn write_all_shared(&self, buf: &[u8]) -> Result<()> {
        let mut writer = self;
        let mut written = 0;
        while written < buf.len() {
            match writer.write(&buf[written..]) {
                Ok(0) => {
                    return Err(write_failure(written, ErrorKind::WriteZero.into()));
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(write_failure(written, err)),
            }
        }
        writer.flush().map_err(classify_os_error)
    }

    /// Shut down both halves of the connection.
    ///
    /// Idempotent: shutting down an already disconnected socket succeeds.
    pub fn shutdown(&self) -> Result<()> {
        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        let result = match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
            StreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => {
                if was_connected {
                    debug!(peer = %self.peer_label(), "stream shut down");
                }
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Human-readable peer description for logs and metadata.
    pub fn peer_label(&self) -> String {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => match stream.peer_addr() {
                Ok(addr) => match addr.as_pathname() {
                    Some(path) => format!("unix:{}", path.display()),
                    None => "unix:(unnamed)".to_string(),
                },
                Err(_) => "unix:(disconnected)".to_string(),
            },
            StreamInner::Tcp(stream) => match stream.peer_addr() {
                Ok(addr) => addr.to_string(),
                Err(_) => "tcp:(disconnected)".to_string(),
            },
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => Self::from_unix(stream.try_clone()?),
            StreamInner::Tcp(stream) => Self::from_tcp(stream.try_clone()?),
        };
        cloned
            .connected
            .store(self.connected.load(Ordering::Acquire), Ordering::Release);
        Ok(cloned)
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix-domain-socket",
            StreamInner::Tcp(_) => "tcp",
        }
    }

    #[cfg(unix)]
    fn raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::AsRawFd;

        match &self.inner {
            StreamInner::Unix(stream) => stream.as_raw_fd(),
            StreamInner::Tcp(stream) => stream.as_raw_fd(),
        }
    }

    fn track<T>(&self, result: std::io::Result<T>) -> std::io::Result<T> {
        if let Err(err) = &result {
            if is_disconnect(err.kind()) {
                self.connected.store(false, Ordering::Release);
            }
        }
        result
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("type", &self.transport_name())
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
    )
}

fn write_failure(written: usize, err: std::io::Error) -> TransportError {
    if written == 0 {
        classify_os_error(err)
    } else {
        TransportError::PartialWrite {
            written,
            source: err,
        }
    }
}

/// Map an OS error to a transport error, singling out an invalid descriptor.
fn classify_os_error(err: std::io::Error) -> TransportError {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::EBADF) {
        return TransportError::Shutdown;
    }
    TransportError::Io(err)
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    use super::*;

    fn pair() -> (Stream, Stream) {
        let (left, right) = UnixStream::pair().unwrap();
        (Stream::from(left), Stream::from(right))
    }

    #[test]
    fn idle_stream_has_nothing_available() {
        let (left, _right) = pair();
        assert!(left.is_connected());
        assert_eq!(left.bytes_available().unwrap(), 0);
        assert!(!left.poll_readable(Duration::ZERO).unwrap());
    }

    #[test]
    fn written_bytes_show_up_as_available() {
        let (left, right) = pair();
        left.write_all_shared(b"hello").unwrap();

        assert!(right.poll_readable(Duration::from_secs(1)).unwrap());
        assert_eq!(right.bytes_available().unwrap(), 5);

        let mut buf = [0u8; 5];
        (&right).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(right.bytes_available().unwrap(), 0);
    }

    #[test]
    fn closed_peer_polls_readable_with_nothing_available() {
        let (left, right) = pair();
        drop(right);

        assert!(left.poll_readable(Duration::ZERO).unwrap());
        assert_eq!(left.bytes_available().unwrap(), 0);
    }

    #[test]
    fn write_to_closed_peer_clears_connected_flag() {
        let (mut left, right) = pair();
        drop(right);

        let err = left.write_all(b"late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert!(!left.is_connected());
    }

    #[test]
    fn timed_out_write_reports_bytes_sent() {
        let (left, right) = pair();
        left.set_write_timeout(Some(Duration::from_millis(50))).unwrap();
        let big = vec![0xa5u8; 4 * 1024 * 1024];

        let err = left.write_all_shared(&big).unwrap_err();
        let written = err.bytes_written();
        assert!(matches!(err, TransportError::PartialWrite { .. }));
        assert!(written > 0 && written < big.len());
        assert_eq!(right.bytes_available().unwrap(), written);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (left, _right) = pair();
        left.shutdown().unwrap();
        assert!(!left.is_connected());
        left.shutdown().unwrap();
    }

    #[test]
    fn clone_shares_the_connection() {
        let (left, right) = pair();
        let clone = left.try_clone().unwrap();
        clone.write_all_shared(b"x").unwrap();

        let mut buf = [0u8; 1];
        (&right).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"x");
        assert_eq!(clone.transport_name(), "unix-domain-socket");
    }

    #[test]
    fn tcp_loopback_liveness() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = Stream::from(std::net::TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        let server = Stream::from(server);

        assert!(client.is_connected());
        assert_eq!(client.peer_label(), addr.to_string());

        (&server).write_all(b"ping").unwrap();
        assert!(client.poll_readable(Duration::from_secs(1)).unwrap());
        assert_eq!(client.bytes_available().unwrap(), 4);

        drop(server);
        let mut buf = [0u8; 4];
        (&client).read_exact(&mut buf).unwrap();
        assert!(client.poll_readable(Duration::from_secs(1)).unwrap());
        assert_eq!(client.bytes_available().unwrap(), 0);
    }
}
