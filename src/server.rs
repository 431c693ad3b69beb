//! Server runtime: the accept loop, the set of live sessions, and graceful
//! shutdown on SIGINT/SIGTERM.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::signal;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::context::Context;
use crate::error::{Error, Result, WsError};
use crate::registry::{BoxedHandler, HandlerRegistry};
use crate::session::{dispatch_loop, Session};
use crate::ws::{CloseCode, WsConnection};

type SessionMap = Arc<Mutex<HashMap<Uuid, Arc<Session>>>>;

#[derive(Clone, Copy)]
struct SessionOptions {
    max_message_size: usize,
    command_timeout: std::time::Duration,
}

/// A websocket server the game connects to with `/connect host:port`.
///
/// Register handlers with [`Server::on`], then call [`Server::run`]. Every
/// accepted connection becomes a [`Session`]; events stream in once the
/// session subscribes to them and each one fans out to its handlers.
pub struct Server {
    name: String,
    config: ServerConfig,
    registry: Arc<HandlerRegistry>,
    sessions: SessionMap,
}

impl Server {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, ServerConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: ServerConfig) -> Self {
        Server {
            name: name.into(),
            config,
            registry: Arc::new(HandlerRegistry::new()),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a handler that auto-subscribes its event on every new
    /// session.
    pub fn on<H, F>(&self, event_name: &str, handler: H)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(event_name, handler, true);
    }

    /// Register a handler, choosing whether the event is subscribed
    /// automatically when a client connects.
    pub fn register<H, F>(&self, event_name: &str, handler: H, auto_subscribe: bool)
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: BoxedHandler = Arc::new(move |ctx| Box::pin(handler(ctx)));
        self.registry.register(event_name, handler, auto_subscribe);
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|err| Error::Ws(WsError::Io(err)))?;
        info!(name = %self.name, host = %self.config.host, port = self.config.port, "listening");
        self.serve(listener, shutdown_signal()).await
    }

    /// Accept connections until `shutdown` resolves, then close every live
    /// session with 1001 and wait out the grace period.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);
        let mut connections: JoinSet<()> = JoinSet::new();
        loop {
            select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!(%peer, "inbound connection");
                        connections.spawn(drive_connection(
                            socket,
                            self.config.tls.clone(),
                            Arc::clone(&self.registry),
                            Arc::clone(&self.sessions),
                            SessionOptions {
                                max_message_size: self.config.max_message_size,
                                command_timeout: self.config.command_timeout,
                            },
                        ));
                    }
                    Err(err) => warn!(error = %err, "accept failed"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
        drop(listener);
        self.drain(connections).await;
        info!(name = %self.name, "server stopped");
        Ok(())
    }

    async fn drain(&self, mut connections: JoinSet<()>) {
        let sessions: Vec<Arc<Session>> = self.sessions.lock().await.values().cloned().collect();
        if !sessions.is_empty() {
            info!(count = sessions.len(), "closing live sessions");
        }
        let all_done = async {
            join_all(
                sessions
                    .iter()
                    .map(|session| session.shutdown(CloseCode::GoingAway)),
            )
            .await;
            while connections.join_next().await.is_some() {}
        };
        if timeout(self.config.shutdown_grace, all_done).await.is_err() {
            warn!("shutdown grace period expired, aborting remaining sessions");
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }
    }
}

async fn drive_connection(
    socket: TcpStream,
    tls: Option<TlsAcceptor>,
    registry: Arc<HandlerRegistry>,
    sessions: SessionMap,
    options: SessionOptions,
) {
    match tls {
        Some(acceptor) => match acceptor.accept(socket).await {
            Ok(stream) => drive_session(stream, registry, sessions, options).await,
            Err(err) => warn!(error = %err, "tls accept failed"),
        },
        None => drive_session(socket, registry, sessions, options).await,
    }
}

async fn drive_session<S>(
    stream: S,
    registry: Arc<HandlerRegistry>,
    sessions: SessionMap,
    options: SessionOptions,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let conn = match WsConnection::accept(stream, options.max_message_size).await {
        Ok(conn) => conn,
        Err(err) => {
            debug!(error = %err, "websocket handshake failed");
            return;
        }
    };
    let session = Arc::new(Session::new(conn.handle(), options.command_timeout));
    sessions.lock().await.insert(session.id(), Arc::clone(&session));
    info!(client = %session.id(), path = conn.handle().path(), "client connected");

    for event_name in registry.auto_subscribed_events() {
        if let Err(err) = session.subscribe(&event_name).await {
            warn!(client = %session.id(), event = %event_name, error = %err, "auto-subscribe failed");
        }
    }

    dispatch_loop(conn, Arc::clone(&session), registry).await;

    session.close().await;
    sessions.lock().await.remove(&session.id());
    info!(client = %session.id(), "client disconnected");
}

/// Resolves on SIGINT or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::frame::{Frame, Opcode};
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::{mpsc, oneshot};

    const REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: h\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";
    const KEY: [u8; 4] = [3, 1, 4, 1];

    async fn spawn_server(
        server: Server,
    ) -> (
        std::net::SocketAddr,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<Result<()>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve(listener, async move {
            let _ = stop_rx.await;
        }));
        (addr, stop_tx, serving)
    }

    async fn connect(addr: std::net::SocketAddr) -> (TcpStream, Vec<u8>) {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(REQUEST).await.unwrap();
        let mut response = vec![0u8; 1024];
        let mut n = client.read(&mut response).await.unwrap();
        while !response[..n].windows(4).any(|w| w == b"\r\n\r\n") {
            n += client.read(&mut response[n..]).await.unwrap();
        }
        let head_end = response[..n]
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .unwrap()
            + 4;
        let head = String::from_utf8_lossy(&response[..head_end]);
        assert!(
            head.starts_with("HTTP/1.1 101 Switching Protocols\r\n"),
            "{head}"
        );
        assert!(head.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        (client, response[head_end..n].to_vec())
    }

    async fn read_frame(client: &mut TcpStream, buf: &mut Vec<u8>) -> Frame {
        loop {
            if let Some((frame, consumed)) = Frame::parse(buf, usize::MAX).unwrap() {
                buf.drain(..consumed);
                return frame;
            }
            let mut chunk = [0u8; 4096];
            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "unexpected eof");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    async fn read_envelope(client: &mut TcpStream, buf: &mut Vec<u8>) -> Value {
        let frame = read_frame(client, buf).await;
        assert_eq!(frame.opcode, Opcode::Text);
        serde_json::from_slice(&frame.payload).unwrap()
    }

    fn masked_text(payload: &str) -> Vec<u8> {
        Frame {
            fin: true,
            opcode: Opcode::Text,
            mask: Some(KEY),
            payload: payload.as_bytes().to_vec(),
        }
        .serialize()
    }

    fn masked_close(code: u16) -> Vec<u8> {
        Frame {
            fin: true,
            opcode: Opcode::Close,
            mask: Some(KEY),
            payload: code.to_be_bytes().to_vec(),
        }
        .serialize()
    }

    #[tokio::test]
    async fn upgrades_and_auto_subscribes() {
        let server = Server::new("test");
        server.on("PlayerMessage", |_ctx| async { Ok(()) });
        server.register("BlockBroken", |_ctx| async { Ok(()) }, false);
        let (addr, stop_tx, serving) = spawn_server(server).await;

        let (mut client, leftover) = connect(addr).await;
        let mut buf = leftover;
        let subscribe = read_envelope(&mut client, &mut buf).await;
        assert_eq!(subscribe["header"]["messagePurpose"], "subscribe");
        assert_eq!(subscribe["body"]["eventName"], "PlayerMessage");

        // BlockBroken was registered without auto-subscribe, so the next
        // thing on the wire is the shutdown close frame.
        stop_tx.send(()).unwrap();
        let close = read_frame(&mut client, &mut buf).await;
        assert_eq!(close.close_code(), Some(1001));
        client.write_all(&masked_close(1001)).await.unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn event_handler_commands_round_trip() {
        let server = Server::new("test");
        let (codes_tx, mut codes_rx) = mpsc::unbounded_channel();
        server.on("PlayerMessage", move |ctx| {
            let codes = codes_tx.clone();
            async move {
                let response = ctx.run_command("say hello").await?;
                let _ = codes.send(response.code);
                Ok(())
            }
        });
        let (addr, stop_tx, serving) = spawn_server(server).await;

        let (mut client, leftover) = connect(addr).await;
        let mut buf = leftover;
        read_envelope(&mut client, &mut buf).await; // auto-subscribe

        let event = json!({
            "header": {"version": 1, "requestId": "11111111-1111-1111-1111-111111111111",
                       "messagePurpose": "event"},
            "body": {"eventName": "PlayerMessage",
                     "properties": {"Sender": "Alice", "Message": "hi", "MessageType": "chat"}},
        });
        client
            .write_all(&masked_text(&event.to_string()))
            .await
            .unwrap();

        let request = read_envelope(&mut client, &mut buf).await;
        assert_eq!(request["header"]["messagePurpose"], "commandRequest");
        assert_eq!(request["body"]["commandLine"], "say hello");
        let reply = json!({
            "header": {"version": 1, "requestId": request["header"]["requestId"],
                       "messagePurpose": "commandResponse"},
            "body": {"statusCode": 0, "statusMessage": "ok"},
        });
        client
            .write_all(&masked_text(&reply.to_string()))
            .await
            .unwrap();
        assert_eq!(codes_rx.recv().await.unwrap(), 0);

        stop_tx.send(()).unwrap();
        let close = read_frame(&mut client, &mut buf).await;
        assert_eq!(close.close_code(), Some(1001));
        client.write_all(&masked_close(1001)).await.unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_closes_every_session() {
        let server = Server::new("test");
        server.on("PlayerMessage", |_ctx| async { Ok(()) });
        let (addr, stop_tx, serving) = spawn_server(server).await;

        let (mut first, leftover_first) = connect(addr).await;
        let (mut second, leftover_second) = connect(addr).await;
        // Both sessions are fully up once their auto-subscribes arrive.
        let mut buf_first = leftover_first;
        read_envelope(&mut first, &mut buf_first).await;
        let mut buf_second = leftover_second;
        read_envelope(&mut second, &mut buf_second).await;
        stop_tx.send(()).unwrap();

        let close = read_frame(&mut first, &mut buf_first).await;
        assert_eq!(close.close_code(), Some(1001));
        first.write_all(&masked_close(1001)).await.unwrap();

        let close = read_frame(&mut second, &mut buf_second).await;
        assert_eq!(close.close_code(), Some(1001));
        second.write_all(&masked_close(1001)).await.unwrap();

        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serve_returns_with_no_sessions() {
        let server = Server::new("test");
        let (_addr, stop_tx, serving) = spawn_server(server).await;
        stop_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
