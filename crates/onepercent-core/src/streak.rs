//! Streak and completion-rate calculation.
//!
//! Pure functions over a habit's completion-date set. A streak is the run of
//! consecutive completed days ending *today*: a day not yet completed today
//! means a streak of zero, even if yesterday was completed.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const ISO_DATE: &str = "%Y-%m-%d";

/// Deduplicated, ascending set of completion dates.
///
/// Serialized as a sequence of `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CompletionSet(BTreeSet<NaiveDate>);

impl CompletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse ISO date strings; duplicates collapse.
    pub fn parse<I, S>(dates: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        dates
            .into_iter()
            .map(|s| parse_date(s.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.0.remove(&date)
    }

    /// Ascending.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &NaiveDate> {
        self.0.iter()
    }

    pub fn to_iso_strings(&self) -> Vec<String> {
        self.0.iter().map(|d| d.format(ISO_DATE).to_string()).collect()
    }
}

impl FromIterator<NaiveDate> for CompletionSet {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Vec<String>> for CompletionSet {
    type Error = ValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CompletionSet> for Vec<String> {
    fn from(value: CompletionSet) -> Self {
        value.to_iso_strings()
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), ISO_DATE)
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

/// Length of the unbroken run of completed days ending on `today`.
pub fn compute_streak(completions: &CompletionSet, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while completions.contains(day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

pub fn is_completed_today(completions: &CompletionSet, today: NaiveDate) -> bool {
    completions.contains(today)
}

/// Percentage of days since creation on which the habit was completed.
///
/// `days = floor(now - created_at) + 1`, never below 1. The result is not
/// clamped: back-filled completions can push it past 100.
pub fn completion_rate(completion_count: usize, created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = (now - created_at).num_days().max(0) + 1;
    let rate = 100.0 * completion_count as f64 / days as f64;
    rate.round() as u32
}

/// Flip `today` in the set. Returns whether `today` is now completed.
pub fn toggle_completion(completions: &mut CompletionSet, today: NaiveDate) -> bool {
    if completions.remove(today) {
        false
    } else {
        completions.insert(today);
        true
    }
}

/// Dashboard totals across a user's habits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitSummary {
    pub total_habits: usize,
    pub completed_today: usize,
    pub best_streak: u32,
    pub average_completion_rate: u32,
}

impl HabitSummary {
    /// Fold `(streak, completed_today, completion_rate)` triples.
    pub fn from_parts(parts: impl IntoIterator<Item = (u32, bool, u32)>) -> Self {
        let mut summary = Self::default();
        let mut rate_total: u64 = 0;
        for (streak, done_today, rate) in parts {
            summary.total_habits += 1;
            if done_today {
                summary.completed_today += 1;
            }
            summary.best_streak = summary.best_streak.max(streak);
            rate_total += u64::from(rate);
        }
        if summary.total_habits > 0 {
            summary.average_completion_rate =
                (rate_total as f64 / summary.total_habits as f64).round() as u32;
        }
        summary
    }
}
