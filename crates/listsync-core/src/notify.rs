use chrono::{
  DateTime,
  Utc
};
use parking_lot::Mutex;
use tracing::{
  info,
  warn
};

pub const WRITE_FAILED_MESSAGE: &str =
  "An error occurred, Please try again.";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Level {
  Success,
  Error
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level:     Level,
  pub message:   String,
  pub raised_at: DateTime<Utc>
}

impl Notification {
  pub fn success(
    message: impl Into<String>
  ) -> Self {
    Self {
      level:     Level::Success,
      message:   message.into(),
      raised_at: Utc::now()
    }
  }

  pub fn error(
    message: impl Into<String>
  ) -> Self {
    Self {
      level:     Level::Error,
      message:   message.into(),
      raised_at: Utc::now()
    }
  }

  pub fn task_created(
    title: &str
  ) -> Self {
    Self::success(format!(
      "Task \"{title}\" successfully \
       created"
    ))
  }

  pub fn write_failed() -> Self {
    Self::error(WRITE_FAILED_MESSAGE)
  }
}

pub trait Notifier: Send + Sync {
  fn notify(
    &self,
    notification: Notification
  );
}

/// Keeps every notification so a caller
/// can drain and display them later.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
  queue: Mutex<Vec<Notification>>
}

impl MemoryNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn drain(
    &self
  ) -> Vec<Notification> {
    std::mem::take(&mut *self.queue.lock())
  }

  pub fn messages(&self) -> Vec<String> {
    self
      .queue
      .lock()
      .iter()
      .map(|n| n.message.clone())
      .collect()
  }
}

impl Notifier for MemoryNotifier {
  fn notify(
    &self,
    notification: Notification
  ) {
    log_notification(&notification);
    self.queue.lock().push(notification);
  }
}

fn log_notification(
  notification: &Notification
) {
  match notification.level {
    | Level::Success => {
      info!(text = %notification.message, "notification")
    }
    | Level::Error => {
      warn!(text = %notification.message, "notification")
    }
  }
}
