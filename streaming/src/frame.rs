//! Frame encoding for one leg of a stream session.
//!
//! Wire-compatible with `smi_worker_service::worker::StreamFrameType`: the
//! bridge's ZeroMQ sockets are the other end of the same pair the Service
//! opens in `stream_start`, so the byte layout per type has to match
//! exactly. Text is the frame's raw UTF-8 bytes, Bytes is the frame's raw
//! binary content, Json is the frame's raw JSON encoding — none of the
//! three are wrapped or tagged on the wire.

use axum::extract::ws::Message;

use crate::error::StreamingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Text,
    Bytes,
    Json,
}

impl FrameType {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameType::Text => "text",
            FrameType::Bytes => "bytes",
            FrameType::Json => "json",
        }
    }
}

impl std::str::FromStr for FrameType {
    type Err = StreamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FrameType::Text),
            "bytes" => Ok(FrameType::Bytes),
            "json" => Ok(FrameType::Json),
            _ => Err(StreamingError::UnexpectedFrame),
        }
    }
}

/// Client → worker direction: a WebSocket message becomes the exact bytes
/// pushed onto the ZeroMQ socket.
pub fn encode_frame(intype: FrameType, message: Message) -> Result<Vec<u8>, StreamingError> {
    match (intype, message) {
        (FrameType::Text, Message::Text(s)) => Ok(s.as_str().as_bytes().to_vec()),
        (FrameType::Bytes, Message::Binary(b)) => Ok(b.to_vec()),
        (FrameType::Json, Message::Text(s)) => Ok(s.as_str().as_bytes().to_vec()),
        (FrameType::Json, Message::Binary(b)) => Ok(b.to_vec()),
        _ => Err(StreamingError::UnexpectedFrame),
    }
}

/// Worker → client direction: bytes pulled off the ZeroMQ socket become a
/// WebSocket message in the declared `outtype`.
pub fn decode_frame(outtype: FrameType, bytes: Vec<u8>) -> Result<Message, StreamingError> {
    match outtype {
        FrameType::Text => Ok(Message::Text(String::from_utf8(bytes)?.into())),
        FrameType::Bytes => Ok(Message::Binary(bytes.into())),
        FrameType::Json => Ok(Message::Text(String::from_utf8(bytes)?.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_round_trips_through_encode_and_decode() {
        let encoded = encode_frame(FrameType::Text, Message::Text("hello".into())).unwrap();
        assert_eq!(encoded, b"hello");
        let decoded = decode_frame(FrameType::Text, encoded).unwrap();
        assert_eq!(decoded, Message::Text("hello".into()));
    }

    #[test]
    fn bytes_frame_carries_raw_binary_unmodified() {
        let payload = vec![0u8, 1, 2, 255];
        let encoded = encode_frame(FrameType::Bytes, Message::Binary(payload.clone().into())).unwrap();
        assert_eq!(encoded, payload);
        let decoded = decode_frame(FrameType::Bytes, encoded).unwrap();
        assert_eq!(decoded, Message::Binary(payload.into()));
    }

    #[test]
    fn json_frame_accepts_either_ws_message_variant() {
        let from_text = encode_frame(FrameType::Json, Message::Text(r#"{"a":1}"#.into())).unwrap();
        let from_binary = encode_frame(FrameType::Json, Message::Binary(br#"{"a":1}"#.to_vec().into())).unwrap();
        assert_eq!(from_text, from_binary);
    }

    #[test]
    fn mismatched_frame_type_is_rejected() {
        assert!(encode_frame(FrameType::Text, Message::Binary(vec![1, 2].into())).is_err());
    }

    #[test]
    fn frame_type_parses_from_the_generic_service_wire_strings() {
        assert_eq!("text".parse::<FrameType>().unwrap(), FrameType::Text);
        assert_eq!("bytes".parse::<FrameType>().unwrap(), FrameType::Bytes);
        assert_eq!("json".parse::<FrameType>().unwrap(), FrameType::Json);
        assert!("csv".parse::<FrameType>().is_err());
    }
}
