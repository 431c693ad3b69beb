//! Server configuration.

use std::time::Duration;

use tokio_rustls::TlsAcceptor;

/// Knobs for [`crate::Server`]. `Default` gives the address the game's
/// `/connect` command assumes plus conservative protocol limits.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// When set, every accepted socket is wrapped in TLS before the
    /// websocket handshake.
    pub tls: Option<TlsAcceptor>,
    /// Cap on one reassembled message; beyond it the connection closes
    /// with 1009.
    pub max_message_size: usize,
    /// How long a command waits for its reply.
    pub command_timeout: Duration,
    /// How long shutdown waits for sessions to finish their close
    /// handshakes before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "localhost".to_string(),
            port: 8765,
            tls: None,
            max_message_size: 16 * 1024 * 1024,
            command_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}
