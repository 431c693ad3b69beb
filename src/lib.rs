//! WebSocket server for Minecraft Bedrock Edition.
//!
//! The game's `/connect host:port` command opens a websocket to this server.
//! Once connected, the server subscribes to named in-game events, the client
//! streams them as JSON, and handlers registered per event name can run
//! commands that round-trip back through the same connection.
//!
//! ```no_run
//! use bedrock_ws::{events, Server};
//!
//! #[tokio::main]
//! async fn main() -> bedrock_ws::Result<()> {
//!     let app = Server::new("greeter");
//!     app.on(events::PLAYER_MESSAGE, |ctx| async move {
//!         if let Some(sender) = ctx.event().sender() {
//!             ctx.reply(&format!("hello, {sender}!")).await?;
//!         }
//!         Ok(())
//!     });
//!     app.run().await
//! }
//! ```

pub mod command;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod events;
pub mod registry;
pub mod server;
pub mod session;
pub mod ws;

pub use command::{Command, CommandResponse};
pub use config::ServerConfig;
pub use context::{Context, Event};
pub use envelope::{Envelope, Header, MessagePurpose};
pub use error::{Error, HandshakeError, ProtocolViolation, Result, WsError};
pub use registry::{BoxedHandler, HandlerRegistry};
pub use server::{shutdown_signal, Server};
pub use session::Session;
