//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Engine packets frame the transport; socket packets ride inside engine
//! `message` packets. Binary attachments are not supported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use peerprep_core::error::AppError;

/// Protocol revision sent in the `EIO` query parameter.
pub const ENGINE_PROTOCOL: u8 = 4;

/// Separator between packets in a polling payload.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Handshake data carried by the engine `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine session id.
    pub sid: String,
    /// Transports the server is willing to upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Interval between server pings, in milliseconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

/// An engine-level packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Session opened.
    Open(OpenHandshake),
    /// Session closed.
    Close,
    /// Heartbeat request (server to client in v4).
    Ping(Option<String>),
    /// Heartbeat reply.
    Pong(Option<String>),
    /// Application data: an encoded [`SocketPacket`].
    Message(String),
    /// Transport upgrade marker.
    Upgrade,
    /// No-op, used to flush polling requests.
    Noop,
}

impl EnginePacket {
    /// Encodes the packet as text.
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => {
                // OpenHandshake only holds strings and integers
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{}", data.as_deref().unwrap_or_default()),
            Self::Pong(data) => format!("3{}", data.as_deref().unwrap_or_default()),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }

    /// Decodes a text packet.
    pub fn decode(raw: &str) -> Result<Self, AppError> {
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| AppError::protocol("Empty engine packet"))?;
        let rest = chars.as_str();
        let optional = || (!rest.is_empty()).then(|| rest.to_string());

        match kind {
            '0' => {
                let handshake = serde_json::from_str(rest).map_err(|e| {
                    AppError::protocol(format!("Malformed open packet: {e}"))
                })?;
                Ok(Self::Open(handshake))
            }
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(optional())),
            '3' => Ok(Self::Pong(optional())),
            '4' => Ok(Self::Message(rest.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            'b' => Err(AppError::protocol("Binary engine packets are not supported")),
            other => Err(AppError::protocol(format!(
                "Unknown engine packet type '{other}'"
            ))),
        }
    }

    /// Splits a polling payload into packets.
    pub fn decode_payload(payload: &str) -> Result<Vec<Self>, AppError> {
        payload
            .split(RECORD_SEPARATOR)
            .filter(|p| !p.is_empty())
            .map(Self::decode)
            .collect()
    }

    /// Joins packets into a polling payload.
    pub fn encode_payload(packets: &[Self]) -> String {
        packets
            .iter()
            .map(Self::encode)
            .collect::<Vec<_>>()
            .join(&RECORD_SEPARATOR.to_string())
    }
}

/// A socket-level packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// Join a namespace (client) or acknowledge the join (server).
    Connect {
        /// Namespace.
        namespace: String,
        /// Auth payload (client) or `{"sid": ...}` (server).
        data: Option<Value>,
    },
    /// Leave a namespace.
    Disconnect {
        /// Namespace.
        namespace: String,
    },
    /// Named event with arguments.
    Event {
        /// Namespace.
        namespace: String,
        /// Ack id requested by the sender.
        id: Option<u64>,
        /// Event name.
        event: String,
        /// Event arguments.
        args: Vec<Value>,
    },
    /// Reply to an event that requested an ack.
    Ack {
        /// Namespace.
        namespace: String,
        /// Ack id being answered.
        id: u64,
        /// Reply arguments.
        args: Vec<Value>,
    },
    /// Namespace join refused.
    ConnectError {
        /// Namespace.
        namespace: String,
        /// Error payload, usually `{"message": ...}`.
        data: Value,
    },
}

impl SocketPacket {
    /// Namespace the packet belongs to.
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Encodes the packet as text (without the engine `4` prefix).
    pub fn encode(&self) -> String {
        let (kind, id, body) = match self {
            Self::Connect { data, .. } => ('0', None, data.as_ref().map(Value::to_string)),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event { id, event, args, .. } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(event.clone()));
                array.extend(args.iter().cloned());
                ('2', *id, Some(Value::Array(array).to_string()))
            }
            Self::Ack { id, args, .. } => {
                ('3', Some(*id), Some(Value::Array(args.clone()).to_string()))
            }
            Self::ConnectError { data, .. } => ('4', None, Some(data.to_string())),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != "/" && !namespace.is_empty() {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(body) = body {
            out.push_str(&body);
        }
        out
    }

    /// Decodes a socket packet.
    pub fn decode(raw: &str) -> Result<Self, AppError> {
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| AppError::protocol("Empty socket packet"))?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(AppError::protocol("Binary socket packets are not supported"));
        }

        let namespace = if rest.starts_with('/') {
            match rest.split_once(',') {
                Some((ns, tail)) => {
                    rest = tail;
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            "/".to_string()
        };

        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let id = if digits > 0 {
            let parsed = rest[..digits]
                .parse::<u64>()
                .map_err(|e| AppError::protocol(format!("Bad ack id: {e}")))?;
            rest = &rest[digits..];
            Some(parsed)
        } else {
            None
        };

        let body = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| AppError::protocol(format!("Malformed packet body: {e}")))?,
            )
        };

        match kind {
            '0' => Ok(Self::Connect {
                namespace,
                data: body,
            }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut array = match body {
                    Some(Value::Array(array)) if !array.is_empty() => array,
                    _ => return Err(AppError::protocol("Event body must be a non-empty array")),
                };
                let event = match array.remove(0) {
                    Value::String(name) => name,
                    _ => return Err(AppError::protocol("Event name must be a string")),
                };
                Ok(Self::Event {
                    namespace,
                    id,
                    event,
                    args: array,
                })
            }
            '3' => {
                let id = id.ok_or_else(|| AppError::protocol("Ack without id"))?;
                let args = match body {
                    Some(Value::Array(array)) => array,
                    None => Vec::new(),
                    Some(_) => return Err(AppError::protocol("Ack body must be an array")),
                };
                Ok(Self::Ack {
                    namespace,
                    id,
                    args,
                })
            }
            '4' => Ok(Self::ConnectError {
                namespace,
                data: body.unwrap_or(Value::Null),
            }),
            other => Err(AppError::protocol(format!(
                "Unknown socket packet type '{other}'"
            ))),
        }
    }

    /// Human-readable message from a connect error payload.
    pub fn error_message(data: &Value) -> String {
        data.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| data.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_open() {
        let raw = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":5000,"maxPayload":1000000}"#;
        match EnginePacket::decode(raw).unwrap() {
            EnginePacket::Open(handshake) => {
                assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(handshake.ping_timeout, 5000);
                assert_eq!(handshake.upgrades, vec!["websocket".to_string()]);
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn test_engine_ping_pong() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(None));
        assert_eq!(
            EnginePacket::decode("2hb-7").unwrap(),
            EnginePacket::Ping(Some("hb-7".to_string()))
        );
        assert_eq!(EnginePacket::Pong(None).encode(), "3");
    }

    #[test]
    fn test_engine_rejects_unknown() {
        assert!(EnginePacket::decode("").is_err());
        assert!(EnginePacket::decode("9").is_err());
        assert!(EnginePacket::decode("bAQID").is_err());
    }

    #[test]
    fn test_payload_split() {
        let payload = "2\u{1e}42[\"pairing\",{\"id\":1}]\u{1e}6";
        let packets = EnginePacket::decode_payload(payload).unwrap();
        assert_eq!(packets.len(), 3);
        assert_eq!(
            packets[1],
            EnginePacket::Message("2[\"pairing\",{\"id\":1}]".to_string())
        );
        assert_eq!(EnginePacket::encode_payload(&packets), payload);
    }

    #[test]
    fn test_socket_connect_default_namespace() {
        let connect = SocketPacket::Connect {
            namespace: "/".to_string(),
            data: None,
        };
        assert_eq!(connect.encode(), "0");

        let ack = SocketPacket::decode(r#"0{"sid":"oSO0OpakMV_3jnilAAAA"}"#).unwrap();
        assert_eq!(
            ack,
            SocketPacket::Connect {
                namespace: "/".to_string(),
                data: Some(json!({"sid": "oSO0OpakMV_3jnilAAAA"})),
            }
        );
    }

    #[test]
    fn test_socket_event_with_namespace_and_id() {
        let packet = SocketPacket::decode(r#"2/feedback,12["submitted",{"score":4}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/feedback".to_string(),
                id: Some(12),
                event: "submitted".to_string(),
                args: vec![json!({"score": 4})],
            }
        );
        assert_eq!(packet.encode(), r#"2/feedback,12["submitted",{"score":4}]"#);
    }

    #[test]
    fn test_socket_disconnect_namespace_without_comma() {
        assert_eq!(
            SocketPacket::decode("1/admin").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/admin".to_string()
            }
        );
    }

    #[test]
    fn test_socket_connect_error_message() {
        let packet = SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap();
        match packet {
            SocketPacket::ConnectError { data, .. } => {
                assert_eq!(SocketPacket::error_message(&data), "Not authorized");
            }
            other => panic!("expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn test_socket_rejects_bad_events() {
        assert!(SocketPacket::decode("2[]").is_err());
        assert!(SocketPacket::decode("2[42]").is_err());
        assert!(SocketPacket::decode("3[]").is_err());
        assert!(SocketPacket::decode("51-[\"x\",{}]").is_err());
    }
}
