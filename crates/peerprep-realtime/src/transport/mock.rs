//! Scripted in-process transport.
//!
//! Available to unit tests and, through the `mock` feature, to integration
//! tests. Each `open` consumes the next scripted [`MockBehavior`]; when the
//! script runs dry the fallback behavior applies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use peerprep_core::config::TransportKind;
use peerprep_core::error::AppError;

use crate::message::packet::{EnginePacket, OpenHandshake, SocketPacket};

use super::{ConnectRequest, Transport, TransportSession};

/// What the next `open` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Open and accept the namespace join.
    Accept,
    /// Fail the open with a connection error.
    Fail,
    /// Open, then refuse the namespace join with this message.
    Refuse(String),
    /// Never complete the open.
    Hang,
}

enum Frame {
    Packet(EnginePacket),
    Drop,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU32,
    opens: AtomicU32,
    closes: AtomicU32,
}

/// A transport driven entirely by the test.
#[derive(Debug)]
pub struct MockTransport {
    kind: TransportKind,
    script: Mutex<VecDeque<MockBehavior>>,
    fallback: MockBehavior,
    ping_interval: u64,
    ping_timeout: u64,
    counters: Arc<Counters>,
    sent: Arc<Mutex<Vec<EnginePacket>>>,
    cookies: Mutex<Vec<Option<String>>>,
    link: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Packet(packet) => write!(f, "Packet({packet:?})"),
            Self::Drop => f.write_str("Drop"),
        }
    }
}

impl MockTransport {
    /// A transport whose every open succeeds.
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            script: Mutex::new(VecDeque::new()),
            fallback: MockBehavior::Accept,
            ping_interval: 25_000,
            ping_timeout: 20_000,
            counters: Arc::new(Counters::default()),
            sent: Arc::new(Mutex::new(Vec::new())),
            cookies: Mutex::new(Vec::new()),
            link: Mutex::new(None),
        }
    }

    /// A transport whose every open fails.
    pub fn failing(kind: TransportKind) -> Self {
        Self::new(kind).with_fallback(MockBehavior::Fail)
    }

    /// Behaviors consumed by the next opens, in order.
    pub fn with_script(self, script: impl IntoIterator<Item = MockBehavior>) -> Self {
        *lock(&self.script) = script.into_iter().collect();
        self
    }

    /// Behavior once the script is exhausted.
    pub fn with_fallback(mut self, fallback: MockBehavior) -> Self {
        self.fallback = fallback;
        self
    }

    /// Heartbeat timings advertised in the open handshake, in milliseconds.
    pub fn with_heartbeat(mut self, ping_interval: u64, ping_timeout: u64) -> Self {
        self.ping_interval = ping_interval;
        self.ping_timeout = ping_timeout;
        self
    }

    /// Calls to `open`, successful or not.
    pub fn attempts(&self) -> u32 {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    /// Sessions successfully opened.
    pub fn opens(&self) -> u32 {
        self.counters.opens.load(Ordering::SeqCst)
    }

    /// Calls to `close` across all sessions.
    pub fn closes(&self) -> u32 {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Every packet the client sent, across all sessions.
    pub fn sent(&self) -> Vec<EnginePacket> {
        lock(&self.sent).clone()
    }

    /// Cookie presented on each open attempt.
    pub fn cookies(&self) -> Vec<Option<String>> {
        lock(&self.cookies).clone()
    }

    /// Delivers a packet to the most recent session.
    pub fn push(&self, packet: EnginePacket) -> bool {
        match lock(&self.link).as_ref() {
            Some(link) => link.send(Frame::Packet(packet)).is_ok(),
            None => false,
        }
    }

    /// Delivers a socket event on the default namespace.
    pub fn push_event(&self, event: &str, args: Vec<Value>) -> bool {
        let packet = SocketPacket::Event {
            namespace: "/".to_string(),
            id: None,
            event: event.to_string(),
            args,
        };
        self.push(EnginePacket::Message(packet.encode()))
    }

    /// Makes the most recent session report that the peer went away.
    pub fn drop_link(&self) -> bool {
        match lock(&self.link).take() {
            Some(link) => link.send(Frame::Drop).is_ok(),
            None => false,
        }
    }

    fn next_behavior(&self) -> MockBehavior {
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn TransportSession>, AppError> {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        lock(&self.cookies).push(request.credentials.cookie.clone());

        let refuse = match self.next_behavior() {
            MockBehavior::Accept => None,
            MockBehavior::Refuse(message) => Some(message),
            MockBehavior::Fail => {
                return Err(AppError::connection(format!(
                    "mock {} transport refused the connection",
                    self.kind
                )));
            }
            MockBehavior::Hang => std::future::pending().await,
        };

        let serial = self.counters.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.link) = Some(tx.clone());

        Ok(Box::new(MockSession {
            handshake: OpenHandshake {
                sid: format!("engine-{serial}"),
                upgrades: Vec::new(),
                ping_interval: self.ping_interval,
                ping_timeout: self.ping_timeout,
                max_payload: None,
            },
            serial,
            refuse,
            inbound: rx,
            loopback: tx,
            counters: Arc::clone(&self.counters),
            sent: Arc::clone(&self.sent),
        }))
    }
}

struct MockSession {
    handshake: OpenHandshake,
    serial: u32,
    refuse: Option<String>,
    inbound: mpsc::UnboundedReceiver<Frame>,
    loopback: mpsc::UnboundedSender<Frame>,
    counters: Arc<Counters>,
    sent: Arc<Mutex<Vec<EnginePacket>>>,
}

impl MockSession {
    /// Answers a namespace join the way the server would.
    fn reply_to_join(&self, namespace: String) {
        let reply = match &self.refuse {
            Some(message) => SocketPacket::ConnectError {
                namespace,
                data: json!({ "message": message }),
            },
            None => SocketPacket::Connect {
                namespace,
                data: Some(json!({ "sid": format!("mock-{}", self.serial) })),
            },
        };
        let _ = self
            .loopback
            .send(Frame::Packet(EnginePacket::Message(reply.encode())));
    }
}

#[async_trait]
impl TransportSession for MockSession {
    fn handshake(&self) -> &OpenHandshake {
        &self.handshake
    }

    async fn send(&mut self, packet: EnginePacket) -> Result<(), AppError> {
        if let EnginePacket::Message(raw) = &packet {
            if let Ok(SocketPacket::Connect { namespace, .. }) = SocketPacket::decode(raw) {
                self.reply_to_join(namespace);
            }
        }
        lock(&self.sent).push(packet);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<EnginePacket>, AppError> {
        match self.inbound.recv().await {
            Some(Frame::Packet(packet)) => Ok(Some(packet)),
            Some(Frame::Drop) | None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
