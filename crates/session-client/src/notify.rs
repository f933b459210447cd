//! User notifications and session lifecycle signals
//!
//! Notifications are fire-and-forget: the pipeline never waits on a sink and
//! a sink with no listener must not change pipeline behavior. `SessionEvent`
//! is the navigation signal; `Expired` means the user has to go back to the
//! unauthenticated entry point.

use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Info,
}

/// A message meant for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Receives user-visible messages. Must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Writes notices to the log. Default sink when nothing else is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Error => warn!(notice = message, "user notification"),
            NoticeKind::Info => info!(notice = message, "user notification"),
        }
    }
}

/// Forwards notices over an unbounded channel to a UI or CLI loop.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, kind: NoticeKind, message: &str) {
        // Receiver gone means nobody is listening; that is allowed.
        let _ = self.tx.send(Notice {
            kind,
            message: message.to_owned(),
        });
    }
}

/// Session lifecycle signal broadcast by the refresh coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A refresh exchange stored a new credential pair.
    Refreshed,
    /// Credentials were cleared; redirect to the unauthenticated entry point.
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.notify(NoticeKind::Error, "first");
        sink.notify(NoticeKind::Info, "second");

        assert_eq!(
            rx.try_recv().unwrap(),
            Notice {
                kind: NoticeKind::Error,
                message: "first".into()
            }
        );
        assert_eq!(rx.try_recv().unwrap().message, "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_without_listener_does_not_panic() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.notify(NoticeKind::Error, "nobody hears this");
    }

    #[test]
    fn tracing_sink_accepts_both_kinds() {
        TracingSink.notify(NoticeKind::Error, "error notice");
        TracingSink.notify(NoticeKind::Info, "info notice");
    }
}
