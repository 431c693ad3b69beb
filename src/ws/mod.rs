//! RFC 6455 server-role transport: frame codec, upgrade handshake,
//! connection state machine, and the per-connection reader/writer runtime.

pub mod connection;
pub mod frame;
pub mod handshake;
pub mod proto;

pub use connection::{ConnectionHandle, WsConnection, CLOSE_TIMEOUT};
pub use frame::{CloseCode, Frame, Opcode};
pub use proto::{Message, State};
