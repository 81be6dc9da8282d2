//! TCP transport for running the core as an independent endpoint during
//! development.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use super::{Attached, TransportKind, framed};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A listener that accepts exactly one peer.
pub struct TcpTransportListener {
    listener: TcpListener,
    max_frame_bytes: usize,
}

impl TcpTransportListener {
    pub async fn bind(addr: impl ToSocketAddrs, max_frame_bytes: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            max_frame_bytes,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Wait for one peer to connect. The listener is closed afterwards.
    pub async fn await_connection(self) -> io::Result<Attached> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::info!(%peer, "tcp peer connected");
        Ok(attach_stream(stream, self.max_frame_bytes))
    }
}

pub async fn connect(
    addr: SocketAddr,
    timeout: Duration,
    max_frame_bytes: usize,
) -> io::Result<Attached> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connecting to {addr} timed out after {timeout:?}"),
            )
        })??;
    tracing::debug!(%addr, "tcp connected");
    Ok(attach_stream(stream, max_frame_bytes))
}

fn attach_stream(stream: TcpStream, max_frame_bytes: usize) -> Attached {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    framed::attach(
        TransportKind::Tcp,
        read_half,
        write_half,
        max_frame_bytes,
        None,
    )
}
