//! User-facing notification capability, injected so tests can record or
//! silence it.

use tracing::error;

pub trait Notifier: Send + Sync {
    /// Fire-and-forget error toast. `duration_secs` overrides the display
    /// duration when the presentation layer supports it.
    fn error(&self, message: &str, duration_secs: Option<u64>);
}

/// Swallows every notification. Default for headless use.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn error(&self, _message: &str, _duration_secs: Option<u64>) {}
}

/// Routes notifications into the tracing stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error(&self, message: &str, duration_secs: Option<u64>) {
        error!(duration_secs, "user notification: {message}");
    }
}
