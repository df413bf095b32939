//! Codec for Switchboard envelopes.
//!
//! Inbound decoding is deliberately lenient about content and strict about
//! shape: anything that is not a JSON object is malformed, while an object
//! with a bad or missing channel still decodes so the router can answer it
//! with an error envelope.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::envelope::{Kind, Request};

/// Deepest nesting accepted in an inbound envelope.
///
/// Payloads are relayed as opaque values, so this is far above anything a
/// real document needs. Deeper input is rejected before it is parsed.
pub const MAX_DEPTH: usize = 2048;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input is not valid UTF-8 JSON.
    #[error("Malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Input is JSON but not an object.
    #[error("Malformed envelope: expected a JSON object")]
    NotAnObject,

    /// Input nests arrays or objects deeper than [`MAX_DEPTH`].
    #[error("Malformed envelope: nested {0} levels deep (limit {MAX_DEPTH})")]
    TooDeep(usize),

    /// Serialization failed.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result of decoding an inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A request the relay acts on.
    Request(Request),
    /// A well-formed envelope of a kind the relay does not handle.
    /// Carries the `type` value when it was a string.
    Ignored(Option<String>),
}

/// Decode one inbound envelope.
///
/// Nesting is only bounded by [`MAX_DEPTH`]; the parser grows its stack on
/// demand instead of applying serde_json's default recursion limit.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`], [`ProtocolError::NotAnObject`] or
/// [`ProtocolError::TooDeep`] if the input cannot be interpreted as an
/// envelope at all.
pub fn decode(raw: &[u8]) -> Result<Decoded, ProtocolError> {
    let depth = nesting_depth(raw);
    if depth > MAX_DEPTH {
        return Err(ProtocolError::TooDeep(depth));
    }

    let mut json = serde_json::Deserializer::from_slice(raw);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))
        .map_err(ProtocolError::Malformed)?;
    json.end().map_err(ProtocolError::Malformed)?;

    let Value::Object(mut fields) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let kind = take_string(&mut fields, "type");
    let channel = take_string(&mut fields, "channel");

    let decoded = match kind.as_deref().map(Kind::try_from) {
        Some(Ok(Kind::Join)) => Decoded::Request(Request::Join {
            channel,
            id: fields.remove("id"),
        }),
        Some(Ok(Kind::Message)) => Decoded::Request(Request::Message {
            channel,
            message: fields.remove("message"),
        }),
        _ => Decoded::Ignored(kind),
    };

    Ok(decoded)
}

/// Encode an envelope to a single text message.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode<T: Serialize>(envelope: &T) -> Result<String, ProtocolError> {
    let mut buf = Vec::with_capacity(128);
    let mut json = serde_json::Serializer::new(&mut buf);
    envelope
        .serialize(serde_stacker::Serializer::new(&mut json))
        .map_err(ProtocolError::Encode)?;
    String::from_utf8(buf).map_err(|e| ProtocolError::Encode(serde_json::Error::custom(e)))
}

/// Take a field if it holds a string. Any other value counts as absent.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

/// Deepest array/object nesting in `raw`, ignoring brackets inside strings.
fn nesting_depth(raw: &[u8]) -> usize {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let (mut in_string, mut escaped) = (false, false);

    for &byte in raw {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ServerEnvelope;
    use serde_json::json;

    fn decode_request(raw: &str) -> Request {
        match decode(raw.as_bytes()).unwrap() {
            Decoded::Request(request) => request,
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_join_with_id() {
        let request = decode_request(r#"{"type":"join","channel":"room1","id":42}"#);
        assert_eq!(request, Request::join("room1", Some(json!(42))));
    }

    #[test]
    fn test_decode_keeps_explicit_null() {
        let request = decode_request(r#"{"type":"join","channel":"room1","id":null}"#);
        assert_eq!(request, Request::join("room1", Some(Value::Null)));

        let request = decode_request(r#"{"type":"join","channel":"room1"}"#);
        assert_eq!(request, Request::join("room1", None));
    }

    #[test]
    fn test_decode_non_string_channel() {
        let request = decode_request(r#"{"type":"join","channel":7}"#);
        assert_eq!(request.channel(), None);

        let request = decode_request(r#"{"type":"message","message":"hi"}"#);
        assert_eq!(
            request,
            Request::Message {
                channel: None,
                message: Some(json!("hi")),
            }
        );
    }

    #[test]
    fn test_decode_message_payload_is_opaque() {
        let request = decode_request(
            r#"{"type":"message","channel":"c","message":{"command":"x","params":[1,2]},"extra":true}"#,
        );
        assert_eq!(
            request,
            Request::message("c", json!({"command": "x", "params": [1, 2]}))
        );
    }

    #[test]
    fn test_decode_ignored_kinds() {
        assert_eq!(
            decode(br#"{"type":"leave","channel":"c"}"#).unwrap(),
            Decoded::Ignored(Some("leave".to_string()))
        );
        assert_eq!(
            decode(br#"{"type":"broadcast","channel":"c"}"#).unwrap(),
            Decoded::Ignored(Some("broadcast".to_string()))
        );
        assert_eq!(decode(br#"{"channel":"c"}"#).unwrap(), Decoded::Ignored(None));
        assert_eq!(decode(br#"{"type":5}"#).unwrap(), Decoded::Ignored(None));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            decode(b"{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode(&[0xff, 0xfe, 0x00]),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(decode(b"[1,2]"), Err(ProtocolError::NotAnObject)));
        assert!(matches!(decode(b"\"join\""), Err(ProtocolError::NotAnObject)));
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "[".repeat(depth), "]".repeat(depth))
    }

    #[test]
    fn test_decode_deeply_nested_message() {
        let raw = format!(
            r#"{{"type":"message","channel":"c","message":{}}}"#,
            nested(200)
        );

        let mut value = match decode_request(&raw) {
            Request::Message {
                message: Some(value),
                ..
            } => value,
            other => panic!("Expected a message with a payload, got {:?}", other),
        };

        let mut depth = 0;
        while let Value::Array(mut items) = value {
            depth += 1;
            match items.pop() {
                Some(inner) => value = inner,
                None => break,
            }
        }
        assert_eq!(depth, 200);
    }

    #[test]
    fn test_decode_depth_limit() {
        let raw = format!(
            r#"{{"type":"message","channel":"c","message":{}}}"#,
            nested(MAX_DEPTH)
        );
        assert!(matches!(
            decode(raw.as_bytes()),
            Err(ProtocolError::TooDeep(depth)) if depth == MAX_DEPTH + 1
        ));

        // Brackets inside strings do not count
        let raw = format!(
            r#"{{"type":"message","channel":"c","message":"{}"}}"#,
            "[".repeat(MAX_DEPTH * 2)
        );
        assert!(decode(raw.as_bytes()).is_ok());
    }

    #[test]
    fn test_decode_trailing_garbage() {
        assert!(matches!(
            decode(br#"{"type":"join","channel":"c"} x"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_encode_is_single_line_text() {
        let text = encode(&ServerEnvelope::peer_joined("room1")).unwrap();
        assert_eq!(
            text,
            r#"{"type":"system","message":"A new user has joined the channel","channel":"room1"}"#
        );
    }
}
