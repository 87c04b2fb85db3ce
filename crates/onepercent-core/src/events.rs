use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::{ReminderTime, Weekday};

/// Every state change in the system produces an Event.
/// The CLI prints them as JSON; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    HabitCreated {
        habit_id: String,
        name: String,
        at: DateTime<Utc>,
    },
    HabitUpdated {
        habit_id: String,
        at: DateTime<Utc>,
    },
    HabitDeleted {
        habit_id: String,
        at: DateTime<Utc>,
    },
    CompletionToggled {
        habit_id: String,
        date: NaiveDate,
        completed: bool,
        streak: u32,
        at: DateTime<Utc>,
    },
    ReminderScheduled {
        habit_id: String,
        time: ReminderTime,
        schedule: String,
        at: DateTime<Utc>,
    },
    ReminderRemoved {
        habit_id: String,
        at: DateTime<Utc>,
    },
    RemindersCleared {
        removed: usize,
        at: DateTime<Utc>,
    },
    ReminderFired {
        habit_id: String,
        habit_name: String,
        tag: String,
        time: ReminderTime,
        day: Weekday,
        at: DateTime<Utc>,
    },
    SignedIn {
        user_id: String,
        email: String,
        at: DateTime<Utc>,
    },
    SignedOut {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn habit_id(&self) -> Option<&str> {
        match self {
            Event::HabitCreated { habit_id, .. }
            | Event::HabitUpdated { habit_id, .. }
            | Event::HabitDeleted { habit_id, .. }
            | Event::CompletionToggled { habit_id, .. }
            | Event::ReminderScheduled { habit_id, .. }
            | Event::ReminderRemoved { habit_id, .. }
            | Event::ReminderFired { habit_id, .. } => Some(habit_id),
            Event::RemindersCleared { .. } | Event::SignedIn { .. } | Event::SignedOut { .. } => {
                None
            }
        }
    }
}
