//! Frame codec & packet model (component F): a tagged envelope over
//! `{connect, subscribe, unsubscribe, publish, ack}` with exhaustive
//! handling and no duck-typed dispatch. Deserialization rejects unknown
//! fields so a malformed or forward-incompatible frame fails fast instead
//! of silently losing data.

use serde::{Deserialize, Serialize};

/// Frames a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ClientFrame {
    Connect {
        grant_jwt: String,
    },
    Subscribe {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    Unsubscribe {
        topic: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    Publish {
        topic: String,
        payload: serde_json::Value,
        client_msg_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_publish_ts: Option<i64>,
        #[serde(default)]
        ack: bool,
    },
}

/// Frames the server sends back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Publish { body: MessageBody },
    Ack(Ack),
}

/// A fully enriched publish, broadcast to every subscriber of `topic` except
/// the publisher. Every field the server is responsible for (`sender_id`,
/// `seq`, `sent_at`, all `t_*`) is populated here and nowhere else;
/// `client_msg_id`/`client_publish_ts` are the only client-supplied values
/// carried through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub id: String,
    pub topic: String,
    pub sender_id: String,
    pub seq: u64,
    pub sent_at: i64,
    pub payload: serde_json::Value,
    pub client_msg_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_publish_ts: Option<i64>,
    pub t_ingress: f64,
    pub t_enqueued: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_broadcast_begin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_ws_write_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_broadcast_end: Option<f64>,
}

/// Which inbound operation an `Ack` corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPath {
    Publish,
    Subscribe,
    Unsubscribe,
}

/// Error code carried by a failed `Ack`, per the documented close/ack
/// taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckErrorCode {
    Unauthorized,
    Forbidden,
    Invalid,
    RateLimited,
    Internal,
}

/// Server-to-client acknowledgement, correlated to a client-generated
/// identifier where one was supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub path: AckPath,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<AckErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_msg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_assigned_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_ingress: Option<f64>,
}

impl Ack {
    #[must_use]
    pub fn ok(path: AckPath, client_msg_id: Option<String>) -> Self {
        Self {
            path,
            ok: true,
            code: None,
            message: None,
            client_msg_id,
            server_assigned_id: None,
            seq: None,
            t_ingress: None,
        }
    }

    #[must_use]
    pub fn err(path: AckPath, code: AckErrorCode, message: impl Into<String>, client_msg_id: Option<String>) -> Self {
        Self {
            path,
            ok: false,
            code: Some(code),
            message: Some(message.into()),
            client_msg_id,
            server_assigned_id: None,
            seq: None,
            t_ingress: None,
        }
    }
}

/// Application-range close codes (`4000`-`4999`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CloseCode {
    BadRequest = 4400,
    Unauthorized = 4401,
    Forbidden = 4403,
    Timeout = 4408,
    Conflict = 4409,
    PreconditionFailed = 4412,
}

impl CloseCode {
    #[must_use]
    pub fn code(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            CloseCode::BadRequest => "bad request",
            CloseCode::Unauthorized => "unauthorized",
            CloseCode::Forbidden => "forbidden",
            CloseCode::Timeout => "timeout",
            CloseCode::Conflict => "conflict",
            CloseCode::PreconditionFailed => "precondition failed",
        }
    }
}

/// Kind of billable action observed by a channel actor (component H input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageEventKind {
    Connect,
    Subscribe,
    Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub project_id: String,
    pub key_id: String,
    pub event: UsageEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_length: Option<usize>,
    /// Wall-clock unix millis.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frame_rejects_unknown_fields() {
        let raw = r#"{"type":"subscribe","topic":"chat","bogus":1}"#;
        let err = serde_json::from_str::<ClientFrame>(raw).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn client_frame_rejects_unknown_tag() {
        let raw = r#"{"type":"teleport"}"#;
        assert!(serde_json::from_str::<ClientFrame>(raw).is_err());
    }

    #[test]
    fn publish_round_trips() {
        let raw = r#"{"type":"publish","topic":"chat","payload":{"a":1},"client_msg_id":"c1"}"#;
        let frame: ClientFrame = serde_json::from_str(raw).unwrap();
        match frame {
            ClientFrame::Publish { topic, client_msg_id, ack, .. } => {
                assert_eq!(topic, "chat");
                assert_eq!(client_msg_id, "c1");
                assert!(!ack);
            }
            _ => panic!("expected Publish"),
        }
    }

    #[test]
    fn server_frame_publish_serializes_with_tag() {
        let body = MessageBody {
            id: "01J".into(),
            topic: "chat".into(),
            sender_id: "alice".into(),
            seq: 1,
            sent_at: 1000,
            payload: serde_json::json!({"x": 1}),
            client_msg_id: "c1".into(),
            client_publish_ts: None,
            t_ingress: 0.1,
            t_enqueued: 0.2,
            t_broadcast_begin: Some(0.3),
            t_ws_write_end: Some(0.4),
            t_broadcast_end: Some(0.5),
        };
        let frame = ServerFrame::Publish { body };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "publish");
        assert_eq!(json["body"]["seq"], 1);
    }
}
