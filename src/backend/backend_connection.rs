use std::fmt;
use std::net::SocketAddr;
use std::sync::Weak;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::errors::ConnectionError;
use crate::net::LineReader;

// -----------------------------------------------------------------------------
// ----- BackendAddr -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAddr {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// -----------------------------------------------------------------------------
// ----- LinkEvents ------------------------------------------------------------

/// Receiver side of a running link. Every event carries the generation the
/// link was spawned with so the owner can ignore stragglers from an older
/// connection.
pub trait LinkEvents: Send + Sync + 'static {
    fn on_line(&self, generation: u64, line: String);
    fn on_closed(&self, generation: u64, error: ConnectionError);
}

// -----------------------------------------------------------------------------
// ----- BackendConnection -----------------------------------------------------

/// A freshly connected socket that has not been split into tasks yet.
#[derive(Debug)]
pub struct BackendConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl BackendConnection {
    pub async fn connect(
        addr: &BackendAddr,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        match tokio::time::timeout(connect_timeout, Self::connect_any(addr)).await {
            Ok(result) => result.map_err(|e| ConnectionError::Connect {
                addr: addr.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ConnectionError::Connect {
                addr: addr.to_string(),
                reason: format!(
                    "timed out after {}",
                    humantime::format_duration(connect_timeout)
                ),
            }),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Split the socket into a reader task and a writer task.
    ///
    /// The tasks report back through `events`; they hold it weakly so an
    /// abandoned owner does not stay alive because of its own socket.
    pub fn spawn(
        self,
        generation: u64,
        max_line_bytes: usize,
        events: Weak<dyn LinkEvents>,
    ) -> BackendLink {
        let (reader, writer) = self.stream.into_split();
        let (writer_tx, writer_rx) = mpsc::unbounded_channel::<Bytes>();

        let reader_task = tokio::spawn(read_lines(
            reader,
            LineReader::new(max_line_bytes),
            generation,
            events.clone(),
        ));
        let writer_task = tokio::spawn(write_frames(writer, writer_rx, generation, events));

        BackendLink {
            generation,
            writer: writer_tx,
            tasks: vec![reader_task.abort_handle(), writer_task.abort_handle()],
        }
    }
}

// -----------------------------------------------------------------------------
// ----- BackendConnection: Private --------------------------------------------

impl BackendConnection {
    async fn connect_any(addr: &BackendAddr) -> std::io::Result<Self> {
        let mut last_err = None;

        for target in lookup_host((addr.host.as_str(), addr.port)).await? {
            match Self::connect_one(target).await {
                Ok(conn) => return Ok(conn),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            )
        }))
    }

    async fn connect_one(target: SocketAddr) -> std::io::Result<Self> {
        let socket = if target.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_keepalive(true)?;

        let stream = socket.connect(target).await?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            peer: target,
        })
    }
}

// -----------------------------------------------------------------------------
// ----- BackendLink -----------------------------------------------------------

/// Handle to a running connection. Dropping it stops both tasks.
#[derive(Debug)]
pub struct BackendLink {
    generation: u64,
    writer: mpsc::UnboundedSender<Bytes>,
    tasks: Vec<AbortHandle>,
}

impl BackendLink {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue one complete frame for the writer task.
    pub fn send_frame(&self, frame: Bytes) -> Result<(), ConnectionError> {
        self.writer
            .send(frame)
            .map_err(|_| ConnectionError::Closed)
    }

    /// A link with no socket behind it; written frames land in the returned
    /// receiver.
    #[cfg(test)]
    pub(crate) fn detached(generation: u64) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (writer, rx) = mpsc::unbounded_channel();
        let link = Self {
            generation,
            writer,
            tasks: Vec::new(),
        };
        (link, rx)
    }
}

impl Drop for BackendLink {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Tasks -------------------------------------------------------

async fn read_lines(
    mut reader: OwnedReadHalf,
    mut frames: LineReader,
    generation: u64,
    events: Weak<dyn LinkEvents>,
) {
    let error = 'read: loop {
        match frames.read_from(&mut reader).await {
            Ok(0) => break ConnectionError::Closed,
            Ok(_) => {}
            Err(e) => break ConnectionError::io(e),
        }

        loop {
            match frames.next_line() {
                Ok(Some(line)) => {
                    let Some(owner) = events.upgrade() else {
                        return;
                    };
                    owner.on_line(generation, line);
                }
                Ok(None) => break,
                Err(e) => break 'read e.into(),
            }
        }
    };

    debug!("backend link {generation} reader stopped: {error}");

    if let Some(owner) = events.upgrade() {
        owner.on_closed(generation, error);
    }
}

async fn write_frames(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
    generation: u64,
    events: Weak<dyn LinkEvents>,
) {
    while let Some(mut frame) = rx.recv().await {
        if let Err(e) = writer.write_all_buf(&mut frame).await {
            if let Some(owner) = events.upgrade() {
                owner.on_closed(generation, ConnectionError::io(e));
            }
            return;
        }
    }

    let _ = writer.shutdown().await;
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
