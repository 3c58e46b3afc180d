//! JSON-RPC style message envelope exchanged over the local channel.
//!
//! Three shapes share one encode contract and are told apart by which fields
//! are present, not by a discriminator:
//!
//! - [`Request`]: `jsonrpc`, `id`, `method`, `params`
//! - [`Notification`]: `jsonrpc`, `method`, `params`
//! - [`Response`]: `jsonrpc`, `id`, and exactly one of `result` / `error`
//!
//! Decoding inbound requests never fails: peers are untrusted and a broken
//! document must not take the primary instance down.

use log::debug;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Protocol marker carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Serializes as the constant `"2.0"` marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

/// A command that expects (in principle) a correlated [`Response`].
///
/// `Request::default()` is the zero value produced for undecodable input:
/// empty id, empty method, null params.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Request {
    jsonrpc: JsonRpcVersion,
    pub id: String,
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Fire-and-forget message without an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    jsonrpc: JsonRpcVersion,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Either side of a response; serializes as a `result` or an `error` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Result(Value),
    Error(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: JsonRpcVersion,
    pub id: String,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl Response {
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: id.into(),
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn failure(id: impl Into<String>, error: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: id.into(),
            outcome: ResponseOutcome::Error(error),
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Closed set of envelope shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

impl Message {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Classify a document by field presence.
    ///
    /// `method` plus `id` is a request, `method` alone a notification, `id`
    /// with `result` or `error` a response. Anything else yields `None`.
    pub fn decode(bytes: &[u8]) -> Option<Message> {
        let object = parse_object(bytes)?;
        let id = string_field(&object, "id");
        let params = object.get("params").cloned().unwrap_or(Value::Null);

        if let Some(method) = object.get("method").and_then(Value::as_str) {
            if method.is_empty() {
                return None;
            }
            return Some(match id {
                Some(id) => Message::Request(Request::new(id, method, params)),
                None => Message::Notification(Notification::new(method, params)),
            });
        }

        let id = id?;
        if let Some(result) = object.get("result") {
            Some(Message::Response(Response::success(id, result.clone())))
        } else {
            object
                .get("error")
                .map(|error| Message::Response(Response::failure(id, error.clone())))
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Message::Notification(notification)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

/// Decode an inbound request, failing soft.
///
/// A missing `method` gives an empty method; malformed input gives
/// `Request::default()`. Callers must check `method` before acting.
pub fn decode_request(bytes: &[u8]) -> Request {
    let Some(object) = parse_object(bytes) else {
        return Request::default();
    };

    Request::new(
        string_field(&object, "id").unwrap_or_default(),
        string_field(&object, "method").unwrap_or_default(),
        object.get("params").cloned().unwrap_or(Value::Null),
    )
}

fn parse_object(bytes: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => {
            debug!("Inbound document is not a JSON object ({} bytes)", bytes.len());
            None
        }
        Err(e) => {
            debug!("Inbound document is not valid JSON ({} bytes): {e}", bytes.len());
            None
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}
