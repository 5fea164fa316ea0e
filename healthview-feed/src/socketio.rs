//! Engine.IO v4 / Socket.IO text frames of the live push channel.

use healthview_core::{LiveMessage, ViewError};
use log::{debug, warn};
use serde_json::Value;

use crate::decode_live_value;

/// Reply to a server ping.
pub const PONG: &str = "3";
/// Join the default namespace after the Engine.IO handshake.
pub const CONNECT: &str = "40";

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO handshake (`0{"sid":...}`).
    Open(Value),
    Close,
    Ping,
    Pong,
    Connect,
    Disconnect,
    ConnectError(Value),
    Event { name: String, args: Vec<Value> },
    /// Upgrade, noop, acks and binary packets.
    Ignored,
}

pub fn decode_frame(text: &str) -> Result<Frame, ViewError> {
    let mut chars = text.chars();
    let Some(engine) = chars.next() else {
        return Err(ViewError::Frame("empty frame".into()));
    };
    let rest = chars.as_str();

    match engine {
        '0' => serde_json::from_str(rest)
            .map(Frame::Open)
            .map_err(|err| ViewError::Frame(format!("bad handshake: {err}"))),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_packet(rest),
        '5' | '6' => Ok(Frame::Ignored),
        other => Err(ViewError::Frame(format!("unknown engine packet {other:?}"))),
    }
}

fn decode_packet(packet: &str) -> Result<Frame, ViewError> {
    let mut chars = packet.chars();
    let Some(kind) = chars.next() else {
        return Err(ViewError::Frame("empty socket packet".into()));
    };
    let body = skip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => {
            let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut args: Vec<Value> = serde_json::from_str(body)
                .map_err(|err| ViewError::Frame(format!("bad event body: {err}")))?;
            if args.is_empty() {
                return Err(ViewError::Frame("event without a name".into()));
            }
            match args.remove(0) {
                Value::String(name) => Ok(Frame::Event { name, args }),
                other => Err(ViewError::Frame(format!("event name is not a string: {other}"))),
            }
        }
        '4' => Ok(Frame::ConnectError(
            serde_json::from_str(body).unwrap_or(Value::Null),
        )),
        '3' | '5' | '6' => Ok(Frame::Ignored),
        other => Err(ViewError::Frame(format!("unknown socket packet {other:?}"))),
    }
}

/// `/admin,["x"]` -> `["x"]`; the default namespace has no prefix.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.split_once(',') {
            Some((_, rest)) => rest,
            None => "",
        }
    } else {
        body
    }
}

/// Map a frame to what the synchronizer subscribes to: connect, the sample event, disconnect.
pub fn frame_to_message(frame: Frame, live_event: &str) -> Option<LiveMessage> {
    match frame {
        Frame::Connect => Some(LiveMessage::Connected),
        Frame::Disconnect | Frame::Close => Some(LiveMessage::Disconnected),
        Frame::Event { name, args } if name == live_event => {
            let payload = args.first().cloned().unwrap_or(Value::Null);
            Some(decode_live_value(&payload))
        }
        Frame::Event { name, .. } => {
            debug!("Ignoring live event {name:?}");
            None
        }
        Frame::ConnectError(reason) => {
            warn!("Live channel refused the connection: {reason}");
            None
        }
        Frame::Open(_) | Frame::Ping | Frame::Pong | Frame::Ignored => None,
    }
}

/// Decode a raw text frame, dropping what cannot be read.
pub fn decode_text(text: &str, live_event: &str) -> Option<LiveMessage> {
    match decode_frame(text) {
        Ok(frame) => frame_to_message(frame, live_event),
        Err(err) => {
            debug!("Dropping live frame: {err}");
            None
        }
    }
}
