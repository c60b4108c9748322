use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::Stream;

/// TCP listener handing out connected [`Stream`]s.
pub struct TcpSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpSocket {
    /// Bind and listen on `addr`. Port 0 picks an ephemeral port.
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self> {
        let endpoint = format!("{addr:?}");
        let listener = TcpListener::bind(&addr).map_err(|source| TransportError::Bind {
            endpoint: endpoint.clone(),
            source,
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind { endpoint, source })?;

        info!(%local_addr, "listening on tcp");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Stream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted tcp connection");
        Ok(Stream::from_tcp(stream))
    }

    /// Connect to a listening TCP endpoint (blocking).
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Stream> {
        let stream = TcpStream::connect(&addr).map_err(|source| TransportError::Connect {
            endpoint: format!("{addr:?}"),
            source,
        })?;
        debug!(?addr, "connected over tcp");
        Ok(Stream::from_tcp(stream))
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    #[test]
    fn bind_accept_connect() {
        let listener = TcpSocket::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr();
        assert_ne!(addr.port(), 0);

        let client = std::thread::spawn(move || {
            let mut stream = TcpSocket::connect(addr).unwrap();
            stream.write_all(b"tcp").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 3];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"tcp");
        assert_eq!(server.transport_name(), "tcp");
        client.join().unwrap();
    }

    #[test]
    fn connect_refused_is_reported() {
        let addr = {
            let listener = TcpSocket::bind("127.0.0.1:0").unwrap();
            listener.local_addr()
        };
        let result = TcpSocket::connect(addr);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
