//! Habit records and the inputs used to create and edit them.

mod rule;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::streak::{self, CompletionSet};

pub use rule::{parse_weekdays, NotificationRule, ReminderDays, ReminderTime, Weekday};

/// Colors a new habit is tagged with, picked at random.
pub const HABIT_COLORS: [&str; 8] = [
    "blue", "green", "purple", "orange", "pink", "indigo", "teal", "red",
];

/// How often a habit is meant to be done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(ValidationError::InvalidFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked habit as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub frequency: Frequency,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completions: CompletionSet,
    /// Cached; only written together with `completions`.
    #[serde(default)]
    pub streak: u32,
    pub color: String,
    pub owner: String,
    #[serde(default)]
    pub notification: NotificationRule,
}

impl Habit {
    /// Toggle `today` and refresh the cached streak. Returns whether `today`
    /// is now completed.
    pub fn toggle_completion(&mut self, today: NaiveDate) -> bool {
        let done = streak::toggle_completion(&mut self.completions, today);
        self.streak = streak::compute_streak(&self.completions, today);
        done
    }

    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        streak::compute_streak(&self.completions, today)
    }

    pub fn is_completed_today(&self, today: NaiveDate) -> bool {
        streak::is_completed_today(&self.completions, today)
    }

    pub fn completion_rate(&self, now: DateTime<Utc>) -> u32 {
        streak::completion_rate(self.completions.len(), self.created_at, now)
    }

    pub fn reminder_days(&self) -> ReminderDays {
        self.notification.reminder_days(self.frequency)
    }
}

/// Fields supplied when creating a habit. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HabitDraft {
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub color: Option<String>,
    pub notification: NotificationRule,
}

impl HabitDraft {
    pub fn new(name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            frequency,
            ..Self::default()
        }
    }

    /// Trim the name and drop a blank description.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.name = validate_name(&self.name)?;
        self.description = normalize_description(self.description);
        if let Some(color) = self.color.as_deref() {
            validate_color(color)?;
        }
        Ok(self)
    }

    /// The draft's color, or a random palette entry.
    pub fn color_or_random(&self) -> String {
        self.color.clone().unwrap_or_else(random_color)
    }
}

/// Named fields to change on an existing habit. `None` leaves a field alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HabitPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub color: Option<String>,
    pub completions: Option<CompletionSet>,
    pub streak: Option<u32>,
    pub notification: Option<NotificationRule>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if let Some(name) = self.name.as_deref() {
            self.name = Some(validate_name(name)?);
        }
        if let Some(description) = self.description.take() {
            self.description = Some(normalize_description(description));
        }
        if let Some(color) = self.color.as_deref() {
            validate_color(color)?;
        }
        if self.completions.is_some() != self.streak.is_some() {
            return Err(ValidationError::InvalidValue {
                field: "streak".into(),
                message: "streak and completions must be written together".into(),
            });
        }
        Ok(self)
    }

    /// Apply onto an in-memory habit.
    pub fn apply(self, habit: &mut Habit) {
        if let Some(name) = self.name {
            habit.name = name;
        }
        if let Some(description) = self.description {
            habit.description = description;
        }
        if let Some(frequency) = self.frequency {
            habit.frequency = frequency;
        }
        if let Some(color) = self.color {
            habit.color = color;
        }
        if let Some(completions) = self.completions {
            habit.completions = completions;
        }
        if let Some(streak) = self.streak {
            habit.streak = streak;
        }
        if let Some(notification) = self.notification {
            habit.notification = notification;
        }
    }
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn validate_color(color: &str) -> Result<(), ValidationError> {
    if HABIT_COLORS.contains(&color) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "color".into(),
            message: format!("expected one of {}", HABIT_COLORS.join(", ")),
        })
    }
}

fn random_color() -> String {
    HABIT_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(HABIT_COLORS[0])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn habit() -> Habit {
        Habit {
            id: "h1".into(),
            name: "Read".into(),
            description: None,
            frequency: Frequency::Daily,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            completions: CompletionSet::new(),
            streak: 0,
            color: "blue".into(),
            owner: "u1".into(),
            notification: NotificationRule::disabled(),
        }
    }

    #[test]
    fn frequency_round_trips_names() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::Monthly.to_string(), "monthly");
        assert!("yearly".parse::<Frequency>().is_err());
    }

    #[test]
    fn draft_rejects_blank_name() {
        let err = HabitDraft::new("   ", Frequency::Daily).validate().unwrap_err();
        assert_eq!(err, ValidationError::EmptyName);
    }

    #[test]
    fn draft_trims_fields() {
        let mut draft = HabitDraft::new("  Drink water ", Frequency::Daily);
        draft.description = Some("   ".into());
        let draft = draft.validate().unwrap();
        assert_eq!(draft.name, "Drink water");
        assert_eq!(draft.description, None);
    }

    #[test]
    fn random_color_comes_from_palette() {
        let draft = HabitDraft::new("x", Frequency::Daily);
        for _ in 0..20 {
            assert!(HABIT_COLORS.contains(&draft.color_or_random().as_str()));
        }
    }

    #[test]
    fn toggle_updates_streak_together() {
        let mut h = habit();
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        h.completions.insert(today.pred_opt().unwrap());

        assert!(h.toggle_completion(today));
        assert_eq!(h.streak, 2);
        assert!(h.is_completed_today(today));

        assert!(!h.toggle_completion(today));
        assert_eq!(h.streak, 0);
    }

    #[test]
    fn patch_requires_streak_with_completions() {
        let patch = HabitPatch {
            completions: Some(CompletionSet::new()),
            ..HabitPatch::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_applies_named_fields_only() {
        let mut h = habit();
        HabitPatch {
            name: Some("Read more".into()),
            description: Some(Some("20 pages".into())),
            ..HabitPatch::default()
        }
        .apply(&mut h);
        assert_eq!(h.name, "Read more");
        assert_eq!(h.description.as_deref(), Some("20 pages"));
        assert_eq!(h.frequency, Frequency::Daily);
    }
}
