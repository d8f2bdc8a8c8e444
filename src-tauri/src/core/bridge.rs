use crate::core::app_log::AppLog;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tauri::{Emitter, EventTarget, Runtime, WebviewWindow};

/// Reserved echo channel.
pub const MESSAGE_CHANNEL: &str = "message";
const MESSAGE_SUFFIX: &str = " World!";

/// Injected into every webview; exposes `window.bridge.send` and `window.bridge.on`.
pub const BRIDGE_SCRIPT: &str = include_str!("../../assets/bridge.js");

/// Where a handler sends its reply: the webview that sent the message.
pub trait ReplySink {
    fn reply(&self, channel: &str, payload: Value) -> Result<(), String>;
}

impl<R: Runtime> ReplySink for WebviewWindow<R> {
    fn reply(&self, channel: &str, payload: Value) -> Result<(), String> {
        let target = EventTarget::webview_window(self.label());
        self.emit_to(target, channel, payload)
            .map_err(|e| format!("Failed to emit {} to {}: {}", channel, self.label(), e))
    }
}

pub type Handler = Arc<dyn Fn(&Value, &dyn ReplySink) + Send + Sync>;

/// Host side of the UI bridge: per-channel handlers, called in registration
/// order for every message the UI sends.
#[derive(Default)]
pub struct Bridge {
    handlers: RwLock<HashMap<String, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

/// Dropping a subscription keeps the handler; call `unsubscribe` to remove it.
#[must_use]
pub struct Subscription {
    bridge: Weak<Bridge>,
    channel: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let Some(bridge) = self.bridge.upgrade() else {
            return;
        };
        let mut handlers = bridge.handlers.write();
        if let Some(list) = handlers.get_mut(&self.channel) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                handlers.remove(&self.channel);
            }
        }
    }
}

impl Bridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on<F>(self: &Arc<Self>, channel: &str, handler: F) -> Result<Subscription, String>
    where
        F: Fn(&Value, &dyn ReplySink) + Send + Sync + 'static,
    {
        validate_channel(channel)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handler: Handler = Arc::new(handler);
        self.handlers
            .write()
            .entry(channel.to_string())
            .or_default()
            .push((id, handler));

        Ok(Subscription {
            bridge: Arc::downgrade(self),
            channel: channel.to_string(),
            id,
        })
    }

    /// Runs every handler registered for `channel`; returns how many ran.
    pub fn dispatch(&self, channel: &str, payload: &Value, sink: &dyn ReplySink) -> Result<usize, String> {
        validate_channel(channel)?;
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(channel)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(payload, sink);
        }
        Ok(handlers.len())
    }

    #[cfg(test)]
    pub fn handler_count(&self, channel: &str) -> usize {
        self.handlers.read().get(channel).map_or(0, Vec::len)
    }
}

/// Tauri event names only allow alphanumerics, `-`, `/`, `:` and `_`.
pub fn validate_channel(channel: &str) -> Result<(), String> {
    let valid = !channel.is_empty()
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | ':' | '_'));
    if valid {
        Ok(())
    } else {
        Err(format!("Invalid bridge channel: {:?}", channel))
    }
}

pub fn echo_reply(payload: &Value) -> Option<Value> {
    payload
        .as_str()
        .map(|s| Value::String(format!("{}{}", s, MESSAGE_SUFFIX)))
}

/// Registers the reserved `message` echo handler.
pub fn install_default_handlers(bridge: &Arc<Bridge>, log: AppLog) -> Result<Subscription, String> {
    bridge.on(MESSAGE_CHANNEL, move |payload, sink| {
        let Some(reply) = echo_reply(payload) else {
            log.warn(
                "bridge",
                "non_string_message",
                Some(serde_json::json!({ "payload": payload })),
            );
            return;
        };
        if let Err(e) = sink.reply(MESSAGE_CHANNEL, reply) {
            log.error(
                "bridge",
                "reply_failed",
                Some(serde_json::json!({ "channel": MESSAGE_CHANNEL, "error": e })),
            );
        }
    })
}
