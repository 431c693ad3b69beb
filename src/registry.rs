//! Event name to handler mapping. Lookups snapshot the current set, so
//! handlers registered mid-dispatch never corrupt an iteration in progress.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;

use crate::context::Context;
use crate::error::Result;

/// A registered event handler. Each invocation gets its own context and runs
/// as its own task.
pub type BoxedHandler = Arc<dyn Fn(Context) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct HandlerEntry {
    pub handler: BoxedHandler,
    pub auto_subscribe: bool,
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<HandlerEntry>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event name. Registering the same handler
    /// (the same `Arc`) twice for one event stores it once.
    pub fn register(&self, event_name: &str, handler: BoxedHandler, auto_subscribe: bool) {
        let mut handlers = self.handlers.write().expect("handler registry lock poisoned");
        let entries = handlers.entry(event_name.to_string()).or_default();
        if entries
            .iter()
            .any(|entry| Arc::ptr_eq(&entry.handler, &handler))
        {
            return;
        }
        entries.push(HandlerEntry {
            handler,
            auto_subscribe,
        });
    }

    pub(crate) fn handlers_for(&self, event_name: &str) -> Vec<HandlerEntry> {
        self.handlers
            .read()
            .expect("handler registry lock poisoned")
            .get(event_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Event names that should be subscribed for every new session: those
    /// with at least one auto-subscribing handler.
    pub(crate) fn auto_subscribed_events(&self) -> Vec<String> {
        self.handlers
            .read()
            .expect("handler registry lock poisoned")
            .iter()
            .filter(|(_, entries)| entries.iter().any(|entry| entry.auto_subscribe))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> BoxedHandler {
        Arc::new(|_ctx| Box::pin(async { Ok(()) }))
    }

    #[test]
    fn same_handler_registers_once() {
        let registry = HandlerRegistry::new();
        let handler = noop();
        registry.register("PlayerMessage", handler.clone(), true);
        registry.register("PlayerMessage", handler, true);
        assert_eq!(registry.handlers_for("PlayerMessage").len(), 1);
    }

    #[test]
    fn distinct_handlers_accumulate() {
        let registry = HandlerRegistry::new();
        registry.register("PlayerMessage", noop(), true);
        registry.register("PlayerMessage", noop(), false);
        assert_eq!(registry.handlers_for("PlayerMessage").len(), 2);
        assert!(registry.handlers_for("BlockBroken").is_empty());
    }

    #[test]
    fn auto_subscription_needs_at_least_one_flag() {
        let registry = HandlerRegistry::new();
        registry.register("PlayerMessage", noop(), true);
        registry.register("PlayerMessage", noop(), false);
        registry.register("BlockBroken", noop(), false);
        let names = registry.auto_subscribed_events();
        assert_eq!(names, vec!["PlayerMessage".to_string()]);
    }
}
