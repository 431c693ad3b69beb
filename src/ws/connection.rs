//! Connection runtime. Owns one upgraded byte stream and runs two tasks over
//! its halves: a reader that feeds the frame parser and state machine, and a
//! writer that drains the outbound frame queue. The writer task is the only
//! flow of control that touches the write half, so frames from concurrent
//! senders never interleave and a close frame is the last thing written.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Notify};
use tokio::task::AbortHandle;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::WsError;
use crate::ws::frame::{CloseCode, Frame, Opcode};
use crate::ws::handshake::{self, Request};
use crate::ws::proto::{Message, Outcome, Protocol, State};

/// How long we wait for the peer's close frame before dropping the transport.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const OUTBOUND_QUEUE: usize = 32;
const INBOUND_QUEUE: usize = 32;

struct Shared {
    path: String,
    state: AtomicU8,
    close_sent: AtomicBool,
    closed: AtomicBool,
    closed_notify: Notify,
    tasks: OnceLock<[AbortHandle; 2]>,
}

impl Shared {
    fn new(path: String) -> Self {
        Shared {
            path,
            state: AtomicU8::new(State::Connecting as u8),
            close_sent: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            closed_notify: Notify::new(),
            tasks: OnceLock::new(),
        }
    }

    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> State {
        match self.state.load(Ordering::Acquire) {
            0 => State::Connecting,
            1 => State::Open,
            2 => State::Closing,
            _ => State::Closed,
        }
    }

    fn mark_closed(&self) {
        self.set_state(State::Closed);
        self.closed.store(true, Ordering::Release);
        self.closed_notify.notify_waiters();
    }

    async fn wait_closed(&self) {
        let notified = self.closed_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }

    fn abort_tasks(&self) {
        if let Some(tasks) = self.tasks.get() {
            for task in tasks {
                task.abort();
            }
        }
    }
}

/// Cheap clone used to send and close from anywhere. The frames it enqueues
/// go out in enqueue order.
#[derive(Clone)]
pub struct ConnectionHandle {
    outbound: mpsc::Sender<Frame>,
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    /// The request target from the upgrade request, kept for diagnostics.
    pub fn path(&self) -> &str {
        &self.shared.path
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Queue one unmasked FIN text frame. Outbound messages are never
    /// fragmented; the payloads this protocol produces are small.
    pub async fn send_text(&self, text: &str) -> Result<(), WsError> {
        if self.shared.close_sent.load(Ordering::Acquire) || self.is_closed() {
            return Err(WsError::ConnectionClosed);
        }
        self.outbound
            .send(Frame::text(text.as_bytes().to_vec()))
            .await
            .map_err(|_| WsError::ConnectionClosed)
    }

    /// Begin the close handshake. Only the first call sends a close frame;
    /// the rest return immediately. Waits for the peer's close (or the
    /// close timeout, after which the transport is dropped).
    pub async fn close(&self, code: CloseCode) {
        if self.shared.close_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.is_closed() {
            return;
        }
        self.shared.set_state(State::Closing);
        if self.outbound.send(Frame::close(code, "")).await.is_err() {
            self.shared.mark_closed();
            return;
        }
        if timeout(CLOSE_TIMEOUT, self.shared.wait_closed()).await.is_err() {
            debug!(path = %self.shared.path, "close handshake timed out, dropping transport");
            self.shared.abort_tasks();
            self.shared.mark_closed();
        }
    }

}

/// One accepted websocket connection, post-handshake.
pub struct WsConnection {
    handle: ConnectionHandle,
    messages: mpsc::Receiver<Message>,
}

impl WsConnection {
    /// Perform the server side of the upgrade handshake on `stream` and
    /// start the reader and writer tasks. On a rejected handshake the HTTP
    /// error response is written and the stream is dropped.
    pub async fn accept<S>(stream: S, max_message_size: usize) -> Result<WsConnection, WsError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut rd, mut wr) = tokio::io::split(stream);

        let mut buf = BytesMut::with_capacity(4096);
        let request = loop {
            match Request::parse(&buf) {
                Ok(Some((request, consumed))) => {
                    buf.advance(consumed);
                    break request;
                }
                Ok(None) => {
                    if rd.read_buf(&mut buf).await? == 0 {
                        return Err(WsError::ConnectionClosed);
                    }
                }
                Err(err) => {
                    let _ = wr.write_all(err.response().as_bytes()).await;
                    return Err(err.into());
                }
            }
        };
        let accept = match handshake::validate(&request) {
            Ok(accept) => accept,
            Err(err) => {
                let _ = wr.write_all(err.response().as_bytes()).await;
                return Err(err.into());
            }
        };
        wr.write_all(handshake::accept_response(&accept).as_bytes())
            .await?;
        wr.flush().await?;
        trace!(path = %request.target, "handshake complete");

        let shared = Arc::new(Shared::new(request.target));
        shared.set_state(State::Open);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (message_tx, message_rx) = mpsc::channel(INBOUND_QUEUE);

        let writer = tokio::spawn(writer_task(wr, outbound_rx));
        let reader = tokio::spawn(reader_task(
            rd,
            buf,
            Protocol::new(max_message_size),
            Arc::clone(&shared),
            outbound_tx.clone(),
            message_tx,
        ));
        let _ = shared.tasks.set([reader.abort_handle(), writer.abort_handle()]);

        Ok(WsConnection {
            handle: ConnectionHandle {
                outbound: outbound_tx,
                shared,
            },
            messages: message_rx,
        })
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Next complete application message, in arrival order. `None` once the
    /// connection is closed.
    pub async fn recv(&mut self) -> Option<Message> {
        self.messages.recv().await
    }
}

async fn reader_task<S>(
    mut rd: ReadHalf<S>,
    mut buf: BytesMut,
    mut proto: Protocol,
    shared: Arc<Shared>,
    outbound: mpsc::Sender<Frame>,
    messages: mpsc::Sender<Message>,
) where
    S: AsyncRead + Send + 'static,
{
    if let Err(err) = read_loop(&mut rd, &mut buf, &mut proto, &shared, &outbound, &messages).await
    {
        debug!(path = %shared.path, error = %err, "connection failed");
        if !shared.close_sent.swap(true, Ordering::SeqCst) {
            shared.set_state(State::Closing);
            let _ = outbound.send(Frame::close(err.close_code(), "")).await;
        }
    }
    shared.mark_closed();
}

async fn read_loop<S>(
    rd: &mut ReadHalf<S>,
    buf: &mut BytesMut,
    proto: &mut Protocol,
    shared: &Shared,
    outbound: &mpsc::Sender<Frame>,
    messages: &mpsc::Sender<Message>,
) -> Result<(), WsError>
where
    S: AsyncRead + Send + 'static,
{
    loop {
        while let Some((frame, consumed)) = Frame::parse(&buf[..], proto.max_message_size())? {
            buf.advance(consumed);
            if shared.close_sent.load(Ordering::Acquire) {
                proto.begin_close();
            }
            match proto.on_frame(frame)? {
                Outcome::None => {}
                Outcome::Message(message) => {
                    if messages.send(message).await.is_err() {
                        // Nobody is listening anymore.
                        return Ok(());
                    }
                }
                Outcome::Reply(reply) => {
                    if outbound.send(reply).await.is_err() {
                        return Ok(());
                    }
                }
                Outcome::PeerClose(echo) => {
                    shared.close_sent.store(true, Ordering::SeqCst);
                    let _ = outbound.send(echo).await;
                    return Ok(());
                }
                Outcome::CloseAck => return Ok(()),
            }
        }
        if rd.read_buf(buf).await? == 0 {
            return Ok(());
        }
    }
}

async fn writer_task<S>(mut wr: WriteHalf<S>, mut outbound: mpsc::Receiver<Frame>)
where
    S: AsyncWrite + Send + 'static,
{
    while let Some(frame) = outbound.recv().await {
        let is_close = frame.opcode == Opcode::Close;
        if let Err(err) = write_frame(&mut wr, &frame).await {
            trace!(error = %err, "write failed");
            break;
        }
        if is_close {
            // Nothing goes out after a close frame.
            break;
        }
    }
}

async fn write_frame<S: AsyncWrite>(
    wr: &mut WriteHalf<S>,
    frame: &Frame,
) -> std::io::Result<()> {
    wr.write_all(&frame.serialize()).await?;
    wr.flush().await
}
