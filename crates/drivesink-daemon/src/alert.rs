//! Alert delivery for the daemon
//!
//! The engine raises at most one alert per process lifetime (the fatal
//! token-rejection halt). [`ChannelAlertSink`] hands the message to a
//! consumer task over an unbounded channel, which is where an external
//! notifier (email, webhook) would plug in; the bundled consumer writes
//! the alert to the error log. [`LogAlertSink`] logs directly and is
//! used for one-shot runs that have no long-lived consumer.

use drivesink_core::ports::IAlertSink;
use tokio::sync::mpsc;
use tracing::error;

/// Alert sink that forwards messages over a channel to a consumer task
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelAlertSink {
    /// Creates the sink and the receiving end for a consumer task
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Spawns the default consumer, which logs every alert
    pub fn spawn_log_consumer(mut rx: mpsc::UnboundedReceiver<String>) {
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                error!(alert = true, message, "Operator alert");
            }
        });
    }
}

#[async_trait::async_trait]
impl IAlertSink for ChannelAlertSink {
    async fn notify(&self, message: &str) {
        // A closed channel must not lose the alert.
        if self.tx.send(message.to_string()).is_err() {
            error!(alert = true, message, "Operator alert (consumer gone)");
        }
    }
}

/// Alert sink that raises operator alerts directly through the error log
pub struct LogAlertSink;

#[async_trait::async_trait]
impl IAlertSink for LogAlertSink {
    async fn notify(&self, message: &str) {
        error!(alert = true, message, "Operator alert");
    }
}
