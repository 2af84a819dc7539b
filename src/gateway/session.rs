//! One client session and its backend connection.
//!
//! The wire protocol has no request ids, so responses are matched by position:
//! the n-th non-banner line answers the n-th call still queued. Only the head of
//! the queue is ever written before its answer arrives, which keeps that
//! assumption true as long as the backend answers every request once and in
//! order. A backend that drops or duplicates an answer misaligns every call
//! after it and nothing here can detect that.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{BackendConnection, BackendLink, BannerFilter, LinkEvents};
use crate::errors::{CallError, ConnectionError};
use crate::shared_types::{ConnectionState, SessionId};

use super::settings::SessionSettings;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const NON_JSON_RESPONSE: &str = "non-JSON response";

const FRAME_CAPACITY_HINT: usize = 128;

// -----------------------------------------------------------------------------
// ----- SessionConnection -----------------------------------------------------

#[derive(Debug)]
pub struct SessionConnection {
    id: SessionId,
    settings: Arc<SessionSettings>,
    state: Mutex<SessionState>,
    this: Weak<SessionConnection>,
}

// -----------------------------------------------------------------------------
// ----- SessionConnection: Static ---------------------------------------------

impl SessionConnection {
    pub fn new(id: SessionId, settings: Arc<SessionSettings>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id,
            settings,
            state: Mutex::new(SessionState::new(Instant::now())),
            this: this.clone(),
        })
    }
}

// -----------------------------------------------------------------------------
// ----- SessionConnection: Public ---------------------------------------------

impl SessionConnection {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state.lock().connection_state()
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        self.state.lock().idle_for(now)
    }

    pub fn is_retired(&self) -> bool {
        self.state.lock().retired
    }

    /// Queue `payload` behind every earlier call and wait for its answer.
    ///
    /// Connects first if needed. Resolves with the parsed response line (or the
    /// non-JSON sentinel), fails with a connection error if the link goes away
    /// first, or with a timeout once `timeout` elapses. A timed-out call is only
    /// dropped locally; the backend is not told.
    pub async fn send(&self, payload: &Value, timeout: Duration) -> Result<Value, CallError> {
        let frame = encode_frame(payload)?;
        let (reply_tx, mut reply_rx) = oneshot::channel();

        let call_id = {
            let mut state = self.state.lock();
            if state.retired {
                return Err(CallError::Retired);
            }

            let (call_id, connect) = state.enqueue(frame, reply_tx, Instant::now());
            if let Some(generation) = connect {
                self.spawn_connect(generation);
            }
            call_id
        };

        debug!("session {} queued call {call_id}", self.id);

        // Abandons the call if this future is dropped before it resolves.
        let _cancel = CancelOnDrop {
            session: self,
            call_id,
        };

        let outcome = match tokio::time::timeout(timeout, &mut reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ConnectionError::SessionDestroyed.into()),
            Err(_) => self.expire(call_id, timeout, &mut reply_rx),
        };

        self.state.lock().touch(Instant::now());
        outcome
    }

    /// Tear down the connection, fail everything queued and refuse new calls.
    pub fn destroy(&self) -> usize {
        let failed = self.state.lock().retire(&ConnectionError::SessionDestroyed);
        debug!("session {} destroyed; failed {failed} pending call(s)", self.id);
        failed
    }
}

// -----------------------------------------------------------------------------
// ----- SessionConnection: Crate ----------------------------------------------

impl SessionConnection {
    /// Check-and-retire under one lock so a send can't slip in between.
    pub(crate) fn retire_if_idle(&self, now: Instant, threshold: Duration) -> bool {
        let mut state = self.state.lock();
        if state.retired || state.idle_for(now) <= threshold {
            return false;
        }

        let failed = state.retire(&ConnectionError::SessionDestroyed);
        if failed > 0 {
            warn!("session {} evicted with {failed} pending call(s)", self.id);
        }
        true
    }
}

// -----------------------------------------------------------------------------
// ----- SessionConnection: Private --------------------------------------------

impl SessionConnection {
    fn spawn_connect(&self, generation: u64) {
        let Some(session) = self.this.upgrade() else {
            return;
        };

        tokio::spawn(async move {
            session.connect(generation).await;
        });
    }

    async fn connect(self: Arc<Self>, generation: u64) {
        let settings = &self.settings;

        let conn =
            match BackendConnection::connect(&settings.backend, settings.connect_timeout).await {
                Ok(conn) => conn,
                Err(error) => {
                    warn!("session {} {error}", self.id);
                    let failed = self.state.lock().connect_failed(generation, &error);
                    debug!("session {} failed {failed} queued call(s)", self.id);
                    return;
                }
            };

        let peer = conn.peer_addr();
        let mut state = self.state.lock();

        // Destroyed or superseded while the connect was in flight.
        if !state.accepts_link(generation) {
            debug!("session {} discarding stale connection to {peer}", self.id);
            return;
        }

        let events: Weak<dyn LinkEvents> = self.this.clone();
        let link = conn.spawn(generation, settings.max_line_bytes, events);
        if state.connected(link).is_ok() {
            info!("session {} connected to {peer} (link {generation})", self.id);
        }
    }

    fn expire(
        &self,
        call_id: u64,
        timeout: Duration,
        reply_rx: &mut oneshot::Receiver<Result<Value, CallError>>,
    ) -> Result<Value, CallError> {
        if self.state.lock().remove_call(call_id).is_some() {
            debug!("session {} call {call_id} timed out", self.id);
            return Err(CallError::Timeout(timeout));
        }

        // Answered in the same instant the deadline fired; keep the answer.
        reply_rx
            .try_recv()
            .unwrap_or(Err(CallError::Timeout(timeout)))
    }
}

// -----------------------------------------------------------------------------
// ----- SessionConnection: LinkEvents -----------------------------------------

impl LinkEvents for SessionConnection {
    fn on_line(&self, generation: u64, line: String) {
        let len = line.len();
        let outcome = self
            .state
            .lock()
            .on_line(generation, line, &self.settings.banner);

        match outcome {
            LineOutcome::Matched => {}
            LineOutcome::Banner => debug!("session {} skipped backend banner", self.id),
            LineOutcome::Unsolicited => {
                warn!("session {} dropped unsolicited line ({len} bytes)", self.id)
            }
            LineOutcome::Stale => {}
        }
    }

    fn on_closed(&self, generation: u64, error: ConnectionError) {
        if let Some(failed) = self.state.lock().link_closed(generation, &error) {
            info!(
                "session {} link {generation} closed: {error}; failed {failed} pending call(s)",
                self.id
            );
        }
    }
}

// -----------------------------------------------------------------------------
// ----- SessionState ----------------------------------------------------------

type Reply = oneshot::Sender<Result<Value, CallError>>;

#[derive(Debug)]
struct PendingCall {
    id: u64,
    frame: Bytes,
    reply: Reply,
}

#[derive(Debug)]
enum LinkState {
    Disconnected,
    Connecting { generation: u64 },
    Idle(BackendLink),
    Busy(BackendLink),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Matched,
    Banner,
    Unsolicited,
    Stale,
}

#[derive(Debug)]
struct SessionState {
    link: LinkState,
    queue: VecDeque<PendingCall>,
    last_used: Instant,
    retired: bool,
    // Open from connect until the first non-banner line on that link.
    banner_window: bool,
    next_generation: u64,
    next_call_id: u64,
}

impl SessionState {
    fn new(now: Instant) -> Self {
        Self {
            link: LinkState::Disconnected,
            queue: VecDeque::new(),
            last_used: now,
            retired: false,
            banner_window: false,
            next_generation: 0,
            next_call_id: 0,
        }
    }

    fn connection_state(&self) -> ConnectionState {
        match self.link {
            LinkState::Disconnected => ConnectionState::Disconnected,
            LinkState::Connecting { .. } => ConnectionState::Connecting,
            LinkState::Idle(_) => ConnectionState::Idle,
            LinkState::Busy(_) => ConnectionState::Busy,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_used = now;
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used)
    }

    // ----- transitions -------------------------------------------------------

    /// Append a call. Returns its id, plus a generation when the caller has to
    /// start a connect attempt for it.
    fn enqueue(&mut self, frame: Bytes, reply: Reply, now: Instant) -> (u64, Option<u64>) {
        self.touch(now);

        let id = self.next_call_id;
        self.next_call_id += 1;
        self.queue.push_back(PendingCall { id, frame, reply });

        let connect = match self.link {
            LinkState::Disconnected => Some(self.begin_connect()),
            LinkState::Idle(_) => {
                self.dispatch_head();
                None
            }
            LinkState::Connecting { .. } | LinkState::Busy(_) => None,
        };

        (id, connect)
    }

    /// Disconnected -> Connecting.
    fn begin_connect(&mut self) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.link = LinkState::Connecting { generation };
        generation
    }

    fn accepts_link(&self, generation: u64) -> bool {
        !self.retired
            && matches!(self.link, LinkState::Connecting { generation: g } if g == generation)
    }

    /// Connecting -> Idle, then straight to Busy if calls queued meanwhile.
    fn connected(&mut self, link: BackendLink) -> Result<(), BackendLink> {
        if !self.accepts_link(link.generation()) {
            return Err(link);
        }

        self.link = LinkState::Idle(link);
        self.banner_window = true;
        self.dispatch_head();
        Ok(())
    }

    /// Connecting -> Disconnected, failing everything that queued behind it.
    fn connect_failed(&mut self, generation: u64, error: &ConnectionError) -> usize {
        if !matches!(self.link, LinkState::Connecting { generation: g } if g == generation) {
            return 0;
        }

        self.link = LinkState::Disconnected;
        self.fail_all(error)
    }

    /// Idle -> Busy by writing the head of the queue. No-op unless Idle.
    fn dispatch_head(&mut self) {
        let LinkState::Idle(link) = &self.link else {
            return;
        };
        let Some(head) = self.queue.front() else {
            return;
        };

        match link.send_frame(head.frame.clone()) {
            Ok(()) => self.mark_busy(),
            Err(error) => {
                self.teardown(&error);
            }
        }
    }

    /// Busy -> Idle -> (Busy): hand the line to the head, write the next one.
    fn on_line(&mut self, generation: u64, line: String, banner: &BannerFilter) -> LineOutcome {
        let current = matches!(
            &self.link,
            LinkState::Idle(link) | LinkState::Busy(link) if link.generation() == generation
        );
        if !current {
            return LineOutcome::Stale;
        }

        if self.banner_window && banner.is_banner(&line) {
            return LineOutcome::Banner;
        }
        self.banner_window = false;

        if !matches!(self.link, LinkState::Busy(_)) {
            return LineOutcome::Unsolicited;
        }

        self.mark_idle();
        let Some(head) = self.queue.pop_front() else {
            return LineOutcome::Unsolicited;
        };

        let _ = head.reply.send(Ok(parse_response(line)));
        self.dispatch_head();
        LineOutcome::Matched
    }

    /// Any connected state -> Disconnected when that link's socket dies.
    /// `None` when the event belongs to a link that is already gone.
    fn link_closed(&mut self, generation: u64, error: &ConnectionError) -> Option<usize> {
        let current = matches!(
            &self.link,
            LinkState::Idle(link) | LinkState::Busy(link) if link.generation() == generation
        );
        if !current {
            return None;
        }

        Some(self.teardown(error))
    }

    /// Drop a call wherever it sits in the queue. If it was in flight the
    /// session goes back to Idle and the next call is written.
    fn remove_call(&mut self, call_id: u64) -> Option<PendingCall> {
        let idx = self.queue.iter().position(|c| c.id == call_id)?;
        let in_flight = idx == 0 && matches!(self.link, LinkState::Busy(_));
        let call = self.queue.remove(idx)?;

        if in_flight {
            self.mark_idle();
            self.dispatch_head();
        }

        Some(call)
    }

    /// The caller went away. A call not yet written is dropped; one already
    /// on the wire keeps its slot so its answer is consumed before the next
    /// call is written. Its reply then goes nowhere.
    fn abandon_call(&mut self, call_id: u64) -> bool {
        let Some(idx) = self.queue.iter().position(|c| c.id == call_id) else {
            return false;
        };
        if idx == 0 && matches!(self.link, LinkState::Busy(_)) {
            return false;
        }

        self.queue.remove(idx).is_some()
    }

    fn retire(&mut self, error: &ConnectionError) -> usize {
        self.retired = true;
        self.teardown(error)
    }

    /// Any state -> Disconnected. Dropping the link stops its tasks.
    fn teardown(&mut self, error: &ConnectionError) -> usize {
        self.link = LinkState::Disconnected;
        self.banner_window = false;
        self.fail_all(error)
    }

    // ----- helpers -----------------------------------------------------------

    fn fail_all(&mut self, error: &ConnectionError) -> usize {
        let failed = self.queue.len();
        for call in self.queue.drain(..) {
            let _ = call.reply.send(Err(CallError::Connection(error.clone())));
        }
        failed
    }

    fn mark_busy(&mut self) {
        self.link = match std::mem::replace(&mut self.link, LinkState::Disconnected) {
            LinkState::Idle(link) => LinkState::Busy(link),
            other => other,
        };
    }

    fn mark_idle(&mut self) {
        self.link = match std::mem::replace(&mut self.link, LinkState::Disconnected) {
            LinkState::Busy(link) => LinkState::Idle(link),
            other => other,
        };
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

struct CancelOnDrop<'a> {
    session: &'a SessionConnection,
    call_id: u64,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        let _ = self.session.state.lock().abandon_call(self.call_id);
    }
}

fn encode_frame(payload: &Value) -> Result<Bytes, CallError> {
    let mut writer = BytesMut::with_capacity(FRAME_CAPACITY_HINT).writer();
    serde_json::to_writer(&mut writer, payload).map_err(|e| CallError::Encode(e.to_string()))?;

    let mut frame = writer.into_inner();
    frame.put_u8(b'\n');
    Ok(frame.freeze())
}

fn parse_response(line: String) -> Value {
    match serde_json::from_str(&line) {
        Ok(value) => value,
        Err(_) => json!({ "ok": false, "error": NON_JSON_RESPONSE, "raw": line }),
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
