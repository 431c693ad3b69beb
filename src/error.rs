use thiserror::Error;

use crate::ws::frame::CloseCode;

/// A violation of the websocket framing rules. Any of these is fatal for the
/// connection; the peer is told with close code 1002.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("reserved bits are set")]
    ReservedBits,
    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),
    #[error("client frame is not masked")]
    UnmaskedFrame,
    #[error("control frame payload exceeds 125 bytes")]
    OversizedControlFrame,
    #[error("control frame is fragmented")]
    FragmentedControlFrame,
    #[error("64-bit payload length has the most significant bit set")]
    LengthOverflow,
    #[error("data frame received while a fragmented message is in progress")]
    InterleavedMessage,
    #[error("continuation frame without a message in progress")]
    StrayContinuation,
}

/// Why an HTTP upgrade request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("malformed http request")]
    MalformedRequest,
    #[error("request method must be GET")]
    BadMethod,
    #[error("only HTTP/1.1 is supported")]
    BadHttpVersion,
    #[error("missing Host header")]
    MissingHost,
    #[error("Connection header does not list an upgrade token")]
    NotAnUpgrade,
    #[error("Upgrade header does not name websocket")]
    NotWebSocket,
    #[error("unsupported Sec-WebSocket-Version")]
    UnsupportedVersion,
    #[error("missing or malformed Sec-WebSocket-Key")]
    BadKey,
}

impl HandshakeError {
    /// The raw HTTP response sent back before the socket is dropped. Version
    /// mismatches get a 426 telling the client which version we do speak;
    /// everything else is a plain 400.
    pub fn response(&self) -> String {
        match self {
            HandshakeError::UnsupportedVersion => format!(
                "HTTP/1.1 426 Upgrade Required\r\nSec-WebSocket-Version: 13\r\nContent-Type: text/plain\r\n\r\n{self}\n"
            ),
            _ => format!("HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\n\r\n{self}\n"),
        }
    }
}

/// Transport-level failure of one websocket connection.
#[derive(Debug, Error)]
pub enum WsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("handshake rejected: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("text message is not valid utf-8")]
    InvalidUtf8,
    #[error("message exceeds the {0}-byte limit")]
    MessageTooBig(usize),
    #[error("connection is closed")]
    ConnectionClosed,
}

impl WsError {
    /// Close code reported to the peer when this error tears the
    /// connection down.
    pub fn close_code(&self) -> CloseCode {
        match self {
            WsError::Protocol(_) => CloseCode::ProtocolError,
            WsError::InvalidUtf8 => CloseCode::InvalidPayload,
            WsError::MessageTooBig(_) => CloseCode::MessageTooBig,
            _ => CloseCode::InternalError,
        }
    }
}

/// Crate-level error type. Transport errors terminate the session; the
/// command, subscription and envelope variants are local to the call that
/// produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ws(#[from] WsError),
    #[error("invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("command failed: {message} (code {code}, command {command:?})")]
    Command {
        code: i64,
        message: String,
        command: String,
    },
    #[error("command timed out: {command:?}")]
    CommandTimeout { command: String },
    #[error("subscription update for {event:?} failed: {source}")]
    Subscription {
        event: String,
        #[source]
        source: WsError,
    },
    #[error("session is closed")]
    SessionClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
