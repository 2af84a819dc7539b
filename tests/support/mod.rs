use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use linecrab::{SessionRegistry, SessionSettings, backend::BackendAddr};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

// -----------------------------------------------------------------------------
// ----- Reply -----------------------------------------------------------------

/// What the mock backend does with one request line.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Raw(String),
    Delayed(Duration, Box<Reply>),
    Silent,
    Close,
}

/// Wire events as the backend saw them, in order, across all connections.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Received { conn: usize, request: Value },
    Replied { conn: usize, op: String },
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

// -----------------------------------------------------------------------------
// ----- MockBackend -----------------------------------------------------------

/// Line-delimited JSON server on an ephemeral port. Each connection answers its
/// requests one at a time, in arrival order.
pub struct MockBackend {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    events: Arc<Mutex<Vec<Event>>>,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start<F>(banner: Option<&str>, handler: F) -> MockBackend
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");

        let connections = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);
        let banner = banner.map(str::to_string);

        let task = {
            let connections = connections.clone();
            let events = events.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let conn = connections.fetch_add(1, Ordering::SeqCst) + 1;
                    tokio::spawn(serve(
                        stream,
                        conn,
                        banner.clone(),
                        handler.clone(),
                        events.clone(),
                    ));
                }
            })
        };

        MockBackend {
            addr,
            connections,
            events,
            task,
        }
    }

    /// Answers every request with `{"echo": <request>}`.
    #[allow(dead_code)]
    pub async fn echo() -> MockBackend {
        Self::start(None, |req| Reply::Json(serde_json::json!({ "echo": req }))).await
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Connections accepted so far.
    #[allow(dead_code)]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Received { request, .. } => Some(request.clone()),
                Event::Replied { .. } => None,
            })
            .collect()
    }

    /// Stop accepting. Established connections stay up.
    #[allow(dead_code)]
    pub fn stop_accepting(&self) {
        self.task.abort();
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: TcpStream,
    conn: usize,
    banner: Option<String>,
    handler: Arc<Handler>,
    events: Arc<Mutex<Vec<Event>>>,
) {
    let (read_half, mut write_half) = stream.into_split();

    if let Some(banner) = banner {
        if write_line(&mut write_half, &banner).await.is_err() {
            return;
        }
    }

    // Lines are recorded as soon as they arrive, even while an earlier one is
    // still being answered.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<Value>();
    let reader = {
        let events = events.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: Value =
                    serde_json::from_str(&line).unwrap_or(Value::String(line));
                events.lock().push(Event::Received {
                    conn,
                    request: request.clone(),
                });
                if line_tx.send(request).is_err() {
                    return;
                }
            }
        })
    };

    while let Some(request) = line_rx.recv().await {
        let op = request
            .get("op")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut reply = handler(&request);
        loop {
            match reply {
                Reply::Delayed(delay, inner) => {
                    sleep(delay).await;
                    reply = *inner;
                }
                Reply::Json(value) => {
                    if write_line(&mut write_half, &value.to_string()).await.is_err() {
                        reader.abort();
                        return;
                    }
                    break;
                }
                Reply::Raw(raw) => {
                    if write_line(&mut write_half, &raw).await.is_err() {
                        reader.abort();
                        return;
                    }
                    break;
                }
                Reply::Silent => break,
                Reply::Close => {
                    reader.abort();
                    return;
                }
            }
        }

        events.lock().push(Event::Replied { conn, op });
    }
}

async fn write_line(out: &mut tokio::net::tcp::OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

// -----------------------------------------------------------------------------
// ----- Helpers ---------------------------------------------------------------

/// Short timeouts so failures show up quickly.
pub fn settings(addr: SocketAddr) -> SessionSettings {
    SessionSettings {
        backend: BackendAddr {
            host: addr.ip().to_string(),
            port: addr.port(),
        },
        connect_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(2),
        ..SessionSettings::default()
    }
}

#[allow(dead_code)]
pub fn registry(addr: SocketAddr) -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(settings(addr)))
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}

/// Poll `check` until it holds or `within` elapses.
#[allow(dead_code)]
pub async fn eventually<F>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    check()
}
