//! Client events and user-facing notifications.
//!
//! Everything the core wants a shell to render (progress, toasts, channel
//! state) goes through an [`EventSink`]. The shell owns the receiving end.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::alerts::ChannelStatus;
use crate::location::LocationSnapshot;
use crate::trigger::{TriggerOutcome, TriggerSnapshot};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub text: Option<String>,
}

impl Notification {
    pub fn info(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            text: Some(text.into()),
        }
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            text: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            text: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientEvent {
    PhaseChanged(TriggerSnapshot),
    Progress(u8),
    Outcome(TriggerOutcome),
    Notification(Notification),
    ChannelStatus(ChannelStatus),
    Location(LocationSnapshot),
}

/// Cloneable handle for emitting [`ClientEvent`]s. Sends never block and a
/// dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, notification: Notification) {
        self.emit(ClientEvent::Notification(notification));
    }
}
