use async_trait::async_trait;

use crate::model::Ms;

/// Failure handed back by a reminder transport. Logged and counted; the
/// sweep neither retries nor blocks on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendError(pub String);

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "send error: {}", self.0)
    }
}

impl std::error::Error for SendError {}

/// Outbound seam for booking reminders. Delivery transport lives behind this
/// trait; the sweeper only knows success or failure per recipient.
#[async_trait]
pub trait ReminderSender: Send + Sync {
    async fn send_reminder(
        &self,
        to: &str,
        first_name: &str,
        room_name: &str,
        start: Ms,
    ) -> Result<(), SendError>;
}

/// Default sender: logs the reminder instead of delivering it.
pub struct LogSender;

#[async_trait]
impl ReminderSender for LogSender {
    async fn send_reminder(
        &self,
        to: &str,
        first_name: &str,
        room_name: &str,
        start: Ms,
    ) -> Result<(), SendError> {
        tracing::info!("reminder to {to}: {first_name}, {room_name} starts at {start}");
        Ok(())
    }
}
