//! In-memory reminder scheduler.
//!
//! Holds one [`ScheduledNotification`] per habit and checks them against the
//! wall clock once per `check_interval`. A reminder fires when its `HH:MM`
//! equals the current minute and its day filter accepts today. Ticks that are
//! missed (process suspended, runtime busy) are skipped, not replayed, so a
//! missed minute means no reminder that day.
//!
//! ## State Transitions
//!
//! ```text
//! Unscheduled -> Scheduled -> Unscheduled
//! ```
//!
//! The background ticker runs only while at least one reminder is scheduled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::notifier::{Notifier, Permission, ReminderNotification};
use crate::clock::Clock;
use crate::events::Event;
use crate::habit::{Frequency, NotificationRule, ReminderDays, ReminderTime, Weekday};

pub const DEFAULT_TITLE: &str = "the 1% rule";
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
/// Floor for `check_interval`; a zero period would panic the ticker.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Title shown on every reminder.
    pub title: String,
    pub check_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// A reminder bound to one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    /// Dedup tag, `habit-<id>`.
    pub tag: String,
    pub habit_id: String,
    pub habit_name: String,
    pub time: ReminderTime,
    pub days: ReminderDays,
    pub enabled: bool,
}

impl ScheduledNotification {
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.enabled
            && self.time == ReminderTime::from_time(now.time())
            && self.days.matches(now.date())
    }

    pub fn describe(&self) -> String {
        self.days.describe(self.time)
    }
}

pub fn reminder_tag(habit_id: &str) -> String {
    format!("habit-{habit_id}")
}

pub fn reminder_body(habit_name: &str) -> String {
    format!("Time to complete your habit: {habit_name}")
}

struct Shared {
    entries: Mutex<HashMap<String, ScheduledNotification>>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    title: String,
}

impl Shared {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, ScheduledNotification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick_at(&self, now: NaiveDateTime) -> Vec<Event> {
        let mut due: Vec<ScheduledNotification> =
            self.entries().values().filter(|n| n.is_due(now)).cloned().collect();
        tracing::debug!(at = %now, due = due.len(), "reminder tick");
        if due.is_empty() {
            return Vec::new();
        }
        due.sort_by(|a, b| a.habit_id.cmp(&b.habit_id));

        // Permission can change between scheduling and firing.
        let permission = self.notifier.permission();
        if permission != Permission::Granted {
            tracing::debug!(
                permission = permission.as_str(),
                skipped = due.len(),
                "notification permission not granted; reminders suppressed"
            );
            return Vec::new();
        }

        let mut fired = Vec::with_capacity(due.len());
        for reminder in due {
            let notification = ReminderNotification {
                title: self.title.clone(),
                body: reminder_body(&reminder.habit_name),
                tag: reminder.tag.clone(),
            };
            match self.notifier.display(&notification) {
                Ok(()) => {
                    tracing::info!(habit_id = %reminder.habit_id, "reminder fired");
                    fired.push(Event::ReminderFired {
                        habit_id: reminder.habit_id,
                        habit_name: reminder.habit_name,
                        tag: reminder.tag,
                        time: reminder.time,
                        day: Weekday::of(now.date()),
                        at: self.clock.now_utc(),
                    });
                }
                Err(e) => {
                    tracing::warn!(habit_id = %reminder.habit_id, error = %e, "failed to display reminder");
                }
            }
        }
        fired
    }
}

/// Owns the reminder table and the background ticker.
///
/// Construct one per session and pass it to whoever schedules reminders.
/// The ticker is spawned on the current tokio runtime the first time a
/// reminder is scheduled; without a runtime, call [`tick`](Self::tick)
/// yourself.
pub struct ReminderScheduler {
    shared: Arc<Shared>,
    check_interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(notifier, clock, SchedulerConfig::default())
    }

    pub fn with_config(
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(HashMap::new()),
                notifier,
                clock,
                title: config.title,
            }),
            check_interval: config.check_interval.max(MIN_CHECK_INTERVAL),
            ticker: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.shared.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries().is_empty()
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn get(&self, habit_id: &str) -> Option<ScheduledNotification> {
        self.shared.entries().get(habit_id).cloned()
    }

    /// All reminders, ordered by time then habit name.
    pub fn scheduled_notifications(&self) -> Vec<ScheduledNotification> {
        let mut all: Vec<_> = self.shared.entries().values().cloned().collect();
        all.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.habit_name.cmp(&b.habit_name))
        });
        all
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Returns whether reminders may be shown, prompting if not yet decided.
    pub fn request_permission(&self) -> bool {
        match self.shared.notifier.permission() {
            Permission::Granted => true,
            Permission::Denied => false,
            Permission::Unsupported => {
                tracing::warn!("notifications are not supported here; reminders will not be shown");
                false
            }
            Permission::Undetermined => {
                self.shared.notifier.request_permission() == Permission::Granted
            }
        }
    }

    /// Upsert the reminder for a habit, or remove it if the rule is disabled.
    /// Returns `None` when nothing changed.
    pub fn schedule_notification(
        &mut self,
        habit_id: &str,
        habit_name: &str,
        frequency: Frequency,
        rule: &NotificationRule,
    ) -> Option<Event> {
        if !rule.enabled {
            return self.remove_notification(habit_id);
        }

        let days = rule.reminder_days(frequency);
        let never_fires = matches!(&days, ReminderDays::On(d) if d.is_empty());
        let entry = ScheduledNotification {
            tag: reminder_tag(habit_id),
            habit_id: habit_id.to_string(),
            habit_name: habit_name.to_string(),
            time: rule.time,
            days,
            enabled: true,
        };
        let schedule = entry.describe();
        let unchanged = {
            let mut entries = self.shared.entries();
            let unchanged = entries.get(habit_id) == Some(&entry);
            if !unchanged {
                entries.insert(habit_id.to_string(), entry);
            }
            unchanged
        };
        if unchanged {
            self.start_ticking();
            return None;
        }
        if never_fires {
            tracing::warn!(habit_id, "weekly reminder has no days selected; it will never fire");
        }
        tracing::info!(habit_id, %schedule, "reminder scheduled");
        self.start_ticking();

        Some(Event::ReminderScheduled {
            habit_id: habit_id.to_string(),
            time: rule.time,
            schedule,
            at: self.shared.clock.now_utc(),
        })
    }

    /// Returns `Some` if a reminder was removed.
    pub fn remove_notification(&mut self, habit_id: &str) -> Option<Event> {
        let (removed, now_empty) = {
            let mut entries = self.shared.entries();
            let removed = entries.remove(habit_id).is_some();
            (removed, entries.is_empty())
        };
        if now_empty {
            self.stop_ticking();
        }
        removed.then(|| {
            tracing::info!(habit_id, "reminder removed");
            Event::ReminderRemoved {
                habit_id: habit_id.to_string(),
                at: self.shared.clock.now_utc(),
            }
        })
    }

    /// Drop every reminder and stop the ticker. Called on sign-out.
    pub fn clear_all(&mut self) -> Event {
        let removed = {
            let mut entries = self.shared.entries();
            let n = entries.len();
            entries.clear();
            n
        };
        self.stop_ticking();
        tracing::info!(removed, "all reminders cleared");
        Event::RemindersCleared {
            removed,
            at: self.shared.clock.now_utc(),
        }
    }

    /// Evaluate all reminders against the scheduler's clock.
    pub fn tick(&self) -> Vec<Event> {
        self.shared.tick_at(self.shared.clock.now_local())
    }

    /// Evaluate all reminders against an explicit local time.
    pub fn tick_at(&self, now: NaiveDateTime) -> Vec<Event> {
        self.shared.tick_at(now)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_ticking(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no tokio runtime; reminder ticks must be driven by the caller");
            return;
        };

        let shared = Arc::clone(&self.shared);
        let period = self.check_interval;
        self.ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                shared.tick_at(shared.clock.now_local());
            }
        }));
        tracing::debug!(period_secs = period.as_secs(), "reminder ticker started");
    }

    fn stop_ticking(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            tracing::debug!("reminder ticker stopped");
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop_ticking();
    }
}
