//! # onepercent core library
//!
//! Business logic for the onepercent habit tracker. Every operation is
//! available through the standalone `onepercent` CLI, which is a thin layer
//! over this crate.
//!
//! ## Architecture
//!
//! - **Streak engine**: pure date arithmetic over a habit's completion set
//! - **Reminder scheduler**: holds one reminder per habit and fires due ones
//!   through an injected [`Notifier`]; the caller drives `tick()` or lets it
//!   run on a tokio interval
//! - **Storage**: SQLite habits/accounts and TOML configuration
//! - **Service**: validate, persist, then update derived state
//!
//! ## Key Components
//!
//! - [`HabitService`]: habit operations for the signed-in owner
//! - [`ReminderScheduler`]: per-minute reminder matching
//! - [`HabitDb`]: habit and account persistence
//! - [`Config`]: application configuration management

pub mod auth;
pub mod clock;
pub mod error;
pub mod events;
pub mod habit;
pub mod reminder;
pub mod service;
pub mod storage;
pub mod streak;

pub use auth::Accounts;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use habit::{
    Frequency, Habit, HabitDraft, HabitPatch, NotificationRule, ReminderDays, ReminderTime, Weekday,
};
pub use reminder::{
    Notifier, Permission, RecordingNotifier, ReminderNotification, ReminderScheduler,
    ScheduledNotification, SchedulerConfig,
};
pub use service::{HabitService, HabitView};
pub use storage::{Config, HabitDb, HabitStore, UserRecord};
pub use streak::{CompletionSet, HabitSummary};
