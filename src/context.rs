//! The snapshot handed to an event handler.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::command::{Command, CommandResponse};
use crate::envelope::Envelope;
use crate::error::Result;
use crate::session::Session;

/// A decoded game event: its name plus the `properties` object it arrived
/// with. Accessors exist for the fields chat handlers reach for constantly;
/// everything else goes through [`Event::property`].
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub properties: Value,
}

impl Event {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// `properties.Sender` on chat-style events.
    pub fn sender(&self) -> Option<&str> {
        self.property("Sender")?.as_str()
    }

    /// `properties.Message` on chat-style events.
    pub fn message(&self) -> Option<&str> {
        self.property("Message")?.as_str()
    }
}

/// Per-invocation handler context: the session that received the event, the
/// decoded event, and the raw envelope as an escape hatch.
pub struct Context {
    session: Arc<Session>,
    event: Event,
    raw: Envelope,
}

impl Context {
    pub(crate) fn new(session: Arc<Session>, event: Event, raw: Envelope) -> Self {
        Context {
            session,
            event,
            raw,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn raw(&self) -> &Envelope {
        &self.raw
    }

    /// Say something back in chat.
    pub async fn reply(&self, message: &str) -> Result<CommandResponse> {
        self.run_command(format!("say {message}")).await
    }

    pub async fn run_command(&self, command: impl Into<Command>) -> Result<CommandResponse> {
        self.session.run_command(command).await
    }

    pub async fn subscribe(&self, event_name: &str) -> Result<()> {
        self.session.subscribe(event_name).await
    }

    pub async fn unsubscribe(&self, event_name: &str) -> Result<()> {
        self.session.unsubscribe(event_name).await
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("event", &self.event.name)
            .field("client", &self.session.id())
            .finish()
    }
}
