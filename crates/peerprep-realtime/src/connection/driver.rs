//! The task that owns the transport for one mounted provider.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use peerprep_core::config::TransportKind;
use peerprep_core::error::AppError;

use crate::message::packet::{EnginePacket, SocketPacket};
use crate::message::types::{OutboundEmit, RealtimeEvent};
use crate::metrics::ConnectionMetrics;
use crate::transport::{ConnectRequest, Transport, TransportSession};

use super::handle::{ConnectionHandle, ConnectionStatus};
use super::heartbeat::{Heartbeat, HeartbeatConfig};
use super::reconnect::ReconnectPolicy;

/// Upper bound on a graceful transport close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one connect attempt across all transports.
enum Attempt {
    Connected {
        session: Box<dyn TransportSession>,
        transport: TransportKind,
        id: String,
    },
    Failed(AppError),
    Refused(String),
    Cancelled,
}

/// How a live connection ended.
enum Ended {
    Cancelled,
    ServerDisconnect,
    Lost(String),
}

/// Result of the namespace join on an open session.
enum Joined {
    Accepted(String),
    Refused(String),
}

pub(crate) struct Driver {
    pub(crate) handle: Arc<ConnectionHandle>,
    pub(crate) request: ConnectRequest,
    pub(crate) transports: Vec<Arc<dyn Transport>>,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) connect_timeout: Duration,
    pub(crate) outbound: mpsc::Receiver<OutboundEmit>,
    pub(crate) cancel: CancellationToken,
}

impl Driver {
    /// Connects, serves, and retries until cancelled or out of budget.
    pub(crate) async fn run(mut self) {
        let mut retries: u32 = 0;

        loop {
            if retries > 0 {
                ConnectionMetrics::inc(&self.handle.metrics().reconnects);
                self.handle
                    .publish(RealtimeEvent::Reconnecting { attempt: retries });
                info!(
                    attempt = retries,
                    max_attempts = self.policy.max_attempts,
                    "Reconnecting in {:?}",
                    self.policy.delay
                );

                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = time::sleep(self.policy.delay) => {}
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            self.handle.set_status(ConnectionStatus::Connecting);

            match self.attempt().await {
                Attempt::Cancelled => break,
                Attempt::Refused(message) => {
                    warn!(reason = %message, "Server refused the realtime connection");
                    self.handle
                        .publish(RealtimeEvent::ConnectError { message });
                    self.handle.set_status(ConnectionStatus::Error);
                    return;
                }
                Attempt::Failed(error) => {
                    ConnectionMetrics::inc(&self.handle.metrics().connect_failures);
                    warn!(error = %error, retry = retries, "Realtime connection error");
                    self.handle.publish(RealtimeEvent::ConnectError {
                        message: error.message.clone(),
                    });
                    self.handle.set_status(ConnectionStatus::Error);

                    match self.policy.next_retry(retries) {
                        Some(next) => retries = next,
                        None => {
                            self.give_up(retries);
                            return;
                        }
                    }
                }
                Attempt::Connected {
                    mut session,
                    transport,
                    id,
                } => {
                    retries = 0;
                    info!(id = %id, transport = %transport, "Realtime connected");
                    self.handle.set_connected(id.clone(), transport);
                    self.handle
                        .publish(RealtimeEvent::Connected { id, transport });

                    let ended = self.serve(session.as_mut()).await;
                    self.close_session(session.as_mut()).await;

                    match ended {
                        Ended::Cancelled => break,
                        Ended::ServerDisconnect => {
                            info!("Realtime disconnected by server");
                            self.disconnected("io server disconnect");
                            return;
                        }
                        Ended::Lost(reason) => {
                            warn!(reason = %reason, "Realtime connection lost");
                            self.disconnected(&reason);

                            match self.policy.next_retry(0) {
                                Some(next) => retries = next,
                                None => return,
                            }
                        }
                    }
                }
            }
        }

        self.disconnected("io client disconnect");
        debug!("Realtime driver stopped");
    }

    /// Tries every transport in preference order.
    async fn attempt(&self) -> Attempt {
        let metrics = self.handle.metrics();
        let mut last_error = AppError::configuration("No realtime transports configured");

        for transport in &self.transports {
            if self.cancel.is_cancelled() {
                return Attempt::Cancelled;
            }
            let kind = transport.kind();
            ConnectionMetrics::inc(&metrics.connect_attempts);

            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Attempt::Cancelled,
                opened = time::timeout(self.connect_timeout, transport.open(&self.request)) => opened,
            };

            let mut session = match opened {
                Ok(Ok(session)) => session,
                Ok(Err(error)) => {
                    debug!(transport = %kind, error = %error, "Transport open failed");
                    last_error = error;
                    continue;
                }
                Err(_) => {
                    debug!(transport = %kind, "Transport open timed out");
                    last_error = AppError::connection(format!("{kind} open timed out"));
                    continue;
                }
            };
            ConnectionMetrics::inc(&metrics.transport_opens);

            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                joined = time::timeout(
                    self.connect_timeout,
                    join_namespace(session.as_mut(), self.request.endpoint.namespace()),
                ) => Some(joined),
            };

            match joined {
                Some(Ok(Ok(Joined::Accepted(id)))) => {
                    return Attempt::Connected {
                        session,
                        transport: kind,
                        id,
                    };
                }
                None => {
                    self.close_session(session.as_mut()).await;
                    return Attempt::Cancelled;
                }
                Some(Ok(Ok(Joined::Refused(message)))) => {
                    self.close_session(session.as_mut()).await;
                    return Attempt::Refused(message);
                }
                Some(Ok(Err(error))) => {
                    debug!(transport = %kind, error = %error, "Namespace join failed");
                    self.close_session(session.as_mut()).await;
                    last_error = error;
                }
                Some(Err(_)) => {
                    debug!(transport = %kind, "Namespace join timed out");
                    self.close_session(session.as_mut()).await;
                    last_error = AppError::connection(format!("{kind} namespace join timed out"));
                }
            }
        }

        Attempt::Failed(last_error)
    }

    /// Pumps packets both ways until the connection ends.
    async fn serve(&mut self, session: &mut dyn TransportSession) -> Ended {
        let namespace = self.request.endpoint.namespace().to_string();
        let mut heartbeat = Heartbeat::new(HeartbeatConfig::from_handshake(session.handshake()));

        loop {
            let deadline = heartbeat.deadline();

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ended::Cancelled,
                _ = time::sleep_until(deadline) => return Ended::Lost("ping timeout".to_string()),
                received = session.recv() => {
                    let packet = match received {
                        Ok(Some(packet)) => packet,
                        Ok(None) => return Ended::Lost("transport close".to_string()),
                        Err(error) => return Ended::Lost(format!("transport error: {error}")),
                    };
                    heartbeat.touch();

                    if let Some(ended) = self.on_packet(session, &namespace, packet).await {
                        return ended;
                    }
                }
                Some(emit) = self.outbound.recv() => {
                    let packet = SocketPacket::Event {
                        namespace: namespace.clone(),
                        id: None,
                        event: emit.event,
                        args: emit.args,
                    };
                    if let Err(error) = session.send(EnginePacket::Message(packet.encode())).await {
                        return Ended::Lost(format!("transport error: {error}"));
                    }
                    ConnectionMetrics::inc(&self.handle.metrics().messages_sent);
                }
            }
        }
    }

    /// Handles one inbound packet. Returns `Some` when the connection ends.
    async fn on_packet(
        &self,
        session: &mut dyn TransportSession,
        namespace: &str,
        packet: EnginePacket,
    ) -> Option<Ended> {
        match packet {
            EnginePacket::Ping(data) => {
                if let Err(error) = session.send(EnginePacket::Pong(data)).await {
                    return Some(Ended::Lost(format!("transport error: {error}")));
                }
            }
            EnginePacket::Close => return Some(Ended::Lost("transport close".to_string())),
            EnginePacket::Message(raw) => match SocketPacket::decode(&raw) {
                Ok(packet) if packet.namespace() != namespace => {
                    debug!(namespace = %packet.namespace(), "Ignoring packet for another namespace");
                }
                Ok(SocketPacket::Event { event, args, id, .. }) => {
                    if id.is_some() {
                        debug!(event = %event, "Server requested an ack, which is not supported");
                    }
                    ConnectionMetrics::inc(&self.handle.metrics().messages_received);
                    self.handle.publish(RealtimeEvent::Message { event, args });
                }
                Ok(SocketPacket::Disconnect { .. }) => return Some(Ended::ServerDisconnect),
                Ok(other) => debug!(packet = ?other, "Ignoring socket packet"),
                Err(error) => warn!(error = %error, "Dropping undecodable packet"),
            },
            EnginePacket::Open(_)
            | EnginePacket::Pong(_)
            | EnginePacket::Upgrade
            | EnginePacket::Noop => {}
        }
        None
    }

    async fn close_session(&self, session: &mut dyn TransportSession) {
        ConnectionMetrics::inc(&self.handle.metrics().transport_closes);
        match time::timeout(CLOSE_TIMEOUT, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => debug!(error = %error, "Transport close failed"),
            Err(_) => debug!("Transport close timed out"),
        }
    }

    fn disconnected(&self, reason: &str) {
        self.handle.set_status(ConnectionStatus::Disconnected);
        self.handle.publish(RealtimeEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    fn give_up(&self, retries: u32) {
        if self.policy.enabled {
            warn!(attempts = retries, "Realtime reconnect attempts exhausted");
            self.handle
                .publish(RealtimeEvent::ReconnectFailed { attempts: retries });
            self.handle.set_status(ConnectionStatus::Disconnected);
        }
    }
}

/// Joins the namespace on a freshly opened session and waits for the ack.
async fn join_namespace(
    session: &mut dyn TransportSession,
    namespace: &str,
) -> Result<Joined, AppError> {
    let connect = SocketPacket::Connect {
        namespace: namespace.to_string(),
        data: None,
    };
    session.send(EnginePacket::Message(connect.encode())).await?;
    let fallback_id = session.handshake().sid.clone();

    loop {
        let packet = session
            .recv()
            .await?
            .ok_or_else(|| AppError::connection("Transport closed during namespace join"))?;

        match packet {
            EnginePacket::Ping(data) => session.send(EnginePacket::Pong(data)).await?,
            EnginePacket::Close => {
                return Err(AppError::connection("Server closed during namespace join"));
            }
            EnginePacket::Message(raw) => match SocketPacket::decode(&raw)? {
                SocketPacket::Connect { namespace: ns, data } if ns == namespace => {
                    let id = data
                        .as_ref()
                        .and_then(|d| d.get("sid"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or(fallback_id);
                    return Ok(Joined::Accepted(id));
                }
                SocketPacket::ConnectError { namespace: ns, data } if ns == namespace => {
                    return Ok(Joined::Refused(SocketPacket::error_message(&data)));
                }
                other => debug!(packet = ?other, "Ignoring packet before namespace ack"),
            },
            _ => {}
        }
    }
}
