use notify_rust::Notification;

/// Best-effort desktop notification sink. Delivery is not guaranteed and
/// failures must never reach the timer state machine.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Sends real notifications through the platform notification service.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        if let Err(err) = Notification::new().summary(title).body(body).show() {
            log::debug!("desktop notification failed: {err}");
        }
    }
}

/// Discards notifications; for headless runs.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}
