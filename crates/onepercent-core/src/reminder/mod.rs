mod notifier;
mod scheduler;

pub use notifier::{Notifier, Permission, RecordingNotifier, ReminderNotification};
pub use scheduler::{
    reminder_body, reminder_tag, ReminderScheduler, ScheduledNotification, SchedulerConfig,
    DEFAULT_CHECK_INTERVAL, DEFAULT_TITLE, MIN_CHECK_INTERVAL,
};
