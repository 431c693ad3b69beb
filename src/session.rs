//! Per-client session: the subscription set, the pending-command table, and
//! the routing of inbound envelopes to waiters and event handlers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::command::{Command, CommandResponse};
use crate::context::{Context, Event};
use crate::envelope::{Envelope, EventBody, MessagePurpose};
use crate::error::{Error, Result};
use crate::registry::HandlerRegistry;
use crate::ws::{CloseCode, ConnectionHandle, Message, WsConnection};

pub struct Session {
    id: Uuid,
    handle: ConnectionHandle,
    subscriptions: Mutex<HashSet<String>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Envelope>>>,
    handler_tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
    command_timeout: Duration,
}

impl Session {
    pub fn new(handle: ConnectionHandle, command_timeout: Duration) -> Self {
        Session {
            id: Uuid::new_v4(),
            handle,
            subscriptions: Mutex::new(HashSet::new()),
            pending: Mutex::new(HashMap::new()),
            handler_tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
            command_timeout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.handle.is_closed()
    }

    /// Run one game command and wait for its reply. Accepts a command line
    /// or a [`Command`]; lines are parsed into a [`Command`] first, so what
    /// goes on the wire is its normalized rendering. The reply is matched
    /// by `requestId`; other traffic on the session flows freely in
    /// between. Fails with a command error on a non-zero status, and with a
    /// timeout error when no reply arrives in time (a late reply is
    /// discarded).
    pub async fn run_command(&self, command: impl Into<Command>) -> Result<CommandResponse> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        let command_line = command.into().to_string();
        let request_id = Uuid::new_v4();
        let text = serde_json::to_string(&Envelope::command_request(&request_id, &command_line))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending
            .lock()
            .await
            .insert(request_id.to_string(), reply_tx);

        if let Err(err) = self.handle.send_text(&text).await {
            self.pending.lock().await.remove(&request_id.to_string());
            return Err(err.into());
        }
        trace!(client = %self.id, %request_id, command = %command_line, "command sent");

        let reply = match timeout(self.command_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            // The waiter was dropped: the session is shutting down.
            Ok(Err(_)) => return Err(Error::SessionClosed),
            Err(_) => {
                self.pending.lock().await.remove(&request_id.to_string());
                return Err(Error::CommandTimeout {
                    command: command_line,
                });
            }
        };
        CommandResponse::from_envelope(reply, &command_line)
    }

    /// Ask the client to start streaming an event. Subscribing to a name
    /// already in the set is a no-op; the set is only updated once the
    /// request went out.
    pub async fn subscribe(&self, event_name: &str) -> Result<()> {
        self.update_subscription(event_name, MessagePurpose::Subscribe)
            .await
    }

    /// The inverse of [`Session::subscribe`]; unknown names are a no-op.
    pub async fn unsubscribe(&self, event_name: &str) -> Result<()> {
        self.update_subscription(event_name, MessagePurpose::Unsubscribe)
            .await
    }

    async fn update_subscription(&self, event_name: &str, purpose: MessagePurpose) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        let subscribing = purpose == MessagePurpose::Subscribe;
        if self.subscriptions.lock().await.contains(event_name) == subscribing {
            return Ok(());
        }
        let text = serde_json::to_string(&Envelope::subscription(purpose, event_name))?;
        self.handle
            .send_text(&text)
            .await
            .map_err(|source| Error::Subscription {
                event: event_name.to_string(),
                source,
            })?;
        let mut subscriptions = self.subscriptions.lock().await;
        if subscribing {
            subscriptions.insert(event_name.to_string());
        } else {
            subscriptions.remove(event_name);
        }
        trace!(client = %self.id, event = event_name, subscribed = subscribing, "subscription updated");
        Ok(())
    }

    /// Route one inbound envelope: command replies latch their waiter, events
    /// fan out to handlers, everything else is logged and dropped.
    pub(crate) async fn dispatch(self: Arc<Self>, envelope: Envelope, registry: &HandlerRegistry) {
        match envelope.header.message_purpose {
            MessagePurpose::CommandResponse | MessagePurpose::Error => {
                let request_id = envelope.header.request_id.clone();
                let waiter = self.pending.lock().await.remove(&request_id);
                match waiter {
                    // A dead receiver means the caller timed out; drop the reply.
                    Some(reply_tx) => {
                        let _ = reply_tx.send(envelope);
                    }
                    None => {
                        trace!(client = %self.id, %request_id, "reply without a waiter, discarding")
                    }
                }
            }
            MessagePurpose::Event => {
                let body: EventBody = match serde_json::from_value(envelope.body.clone()) {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(client = %self.id, error = %err, "malformed event body");
                        return;
                    }
                };
                let handlers = registry.handlers_for(&body.event_name);
                if handlers.is_empty() {
                    debug!(client = %self.id, event = %body.event_name, "event without handlers");
                    return;
                }
                let mut tasks = self.handler_tasks.lock().await;
                while tasks.try_join_next().is_some() {}
                for entry in handlers {
                    let context = Context::new(
                        Arc::clone(&self),
                        Event {
                            name: body.event_name.clone(),
                            properties: body.properties.clone(),
                        },
                        envelope.clone(),
                    );
                    let event_name = body.event_name.clone();
                    let client = self.id;
                    let handler = entry.handler;
                    tasks.spawn(async move {
                        if let Err(err) = handler(context).await {
                            error!(%client, event = %event_name, error = %err, "event handler failed");
                        }
                    });
                }
            }
            purpose => {
                debug!(client = %self.id, ?purpose, "ignoring message with unhandled purpose")
            }
        }
    }

    /// Tear the session down: waiters observe a session-closed error, the
    /// subscription set empties, in-flight handlers are cancelled, and the
    /// transport runs its close handshake with `code`.
    pub async fn shutdown(&self, code: CloseCode) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(client = %self.id, code = code.as_u16(), "closing session");
        self.pending.lock().await.clear();
        self.subscriptions.lock().await.clear();
        self.handler_tasks.lock().await.abort_all();
        self.handle.close(code).await;
    }

    /// Close with a normal status.
    pub async fn close(&self) {
        self.shutdown(CloseCode::Normal).await;
    }
}

/// Feed a connection's messages into a session until the transport closes.
pub(crate) async fn dispatch_loop(
    mut conn: WsConnection,
    session: Arc<Session>,
    registry: Arc<HandlerRegistry>,
) {
    while let Some(message) = conn.recv().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => Arc::clone(&session).dispatch(envelope, &registry).await,
                Err(err) => {
                    warn!(client = %session.id(), error = %err, "dropping malformed envelope")
                }
            },
            Message::Binary(payload) => {
                debug!(client = %session.id(), len = payload.len(), "ignoring binary message")
            }
        }
    }
}
