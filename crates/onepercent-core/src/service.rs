//! Habit operations for one signed-in owner.
//!
//! Every mutation validates first, then calls the store, and only then
//! touches derived state (streak, reminders). A failed store call leaves the
//! scheduler exactly as it was.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::habit::{Habit, HabitDraft, HabitPatch, NotificationRule};
use crate::reminder::ReminderScheduler;
use crate::storage::HabitStore;
use crate::streak::{self, HabitSummary};

/// A habit with values derived for today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    pub completed_today: bool,
    pub completion_rate: u32,
    /// Reminder schedule in words, if enabled.
    pub reminder: Option<String>,
}

pub struct HabitService<S> {
    store: S,
    owner: String,
    clock: Arc<dyn Clock>,
}

fn log_store_failure<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if !matches!(e, CoreError::NotFound(_)) {
            tracing::error!(op, error = %e, "habit store call failed");
        }
    }
    result
}

impl<S: HabitStore> HabitService<S> {
    pub fn new(store: S, owner: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            owner: owner.into(),
            clock,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Recompute the streak for today and attach derived fields.
    pub fn view(&self, mut habit: Habit) -> HabitView {
        let today = self.today();
        habit.streak = habit.current_streak(today);
        let reminder = habit
            .notification
            .enabled
            .then(|| habit.reminder_days().describe(habit.notification.time));
        HabitView {
            completed_today: habit.is_completed_today(today),
            completion_rate: habit.completion_rate(self.clock.now_utc()),
            reminder,
            habit,
        }
    }

    /// The owner's habits, newest first.
    pub fn list(&self) -> Result<Vec<HabitView>> {
        let habits = log_store_failure("list", self.store.list_habits(&self.owner))?;
        Ok(habits.into_iter().map(|h| self.view(h)).collect())
    }

    pub fn get(&self, id: &str) -> Result<HabitView> {
        self.fetch(id).map(|h| self.view(h))
    }

    fn fetch(&self, id: &str) -> Result<Habit> {
        log_store_failure("get", self.store.get_habit(id, &self.owner))?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    pub fn create(&self, draft: HabitDraft) -> Result<(Habit, Event)> {
        let draft = draft.validate()?;
        let habit = log_store_failure("insert", self.store.insert_habit(&self.owner, &draft))?;
        tracing::info!(habit_id = %habit.id, "habit created");
        let event = Event::HabitCreated {
            habit_id: habit.id.clone(),
            name: habit.name.clone(),
            at: self.clock.now_utc(),
        };
        Ok((habit, event))
    }

    /// Apply `patch`. A streak is always recomputed from the patched
    /// completions; a caller-supplied value is ignored.
    pub fn update(&self, id: &str, mut patch: HabitPatch) -> Result<(Habit, Event)> {
        if let Some(completions) = &patch.completions {
            patch.streak = Some(streak::compute_streak(completions, self.today()));
        }
        let patch = patch.validate()?;
        let habit = log_store_failure("update", self.store.update_habit(id, &self.owner, &patch))?;
        let event = Event::HabitUpdated {
            habit_id: habit.id.clone(),
            at: self.clock.now_utc(),
        };
        Ok((habit, event))
    }

    pub fn delete(&self, id: &str) -> Result<Event> {
        if !log_store_failure("delete", self.store.delete_habit(id, &self.owner))? {
            return Err(CoreError::NotFound(id.to_string()));
        }
        tracing::info!(habit_id = id, "habit deleted");
        Ok(Event::HabitDeleted {
            habit_id: id.to_string(),
            at: self.clock.now_utc(),
        })
    }

    /// Mark or unmark today. Completions and streak are written together.
    pub fn toggle_today(&self, id: &str) -> Result<(Habit, Event)> {
        let today = self.today();
        let mut habit = self.fetch(id)?;
        let completed = habit.toggle_completion(today);

        let patch = HabitPatch {
            completions: Some(habit.completions.clone()),
            streak: Some(habit.streak),
            ..HabitPatch::default()
        };
        let habit = log_store_failure("toggle", self.store.update_habit(id, &self.owner, &patch))?;
        let event = Event::CompletionToggled {
            habit_id: habit.id.clone(),
            date: today,
            completed,
            streak: habit.streak,
            at: self.clock.now_utc(),
        };
        Ok((habit, event))
    }

    /// Persist a reminder rule for a habit.
    pub fn set_reminder(&self, id: &str, rule: NotificationRule) -> Result<(Habit, Event)> {
        self.update(
            id,
            HabitPatch {
                notification: Some(rule),
                ..HabitPatch::default()
            },
        )
    }

    pub fn summary(&self) -> Result<HabitSummary> {
        let views = self.list()?;
        Ok(HabitSummary::from_parts(views.iter().map(|v| {
            (v.habit.streak, v.completed_today, v.completion_rate)
        })))
    }

    /// Make `scheduler` match the store: push every habit's rule, then drop
    /// reminders for habits that no longer exist. Returns the resulting events.
    pub fn sync_reminders(&self, scheduler: &mut ReminderScheduler) -> Result<Vec<Event>> {
        let habits = log_store_failure("list", self.store.list_habits(&self.owner))?;
        let mut events: Vec<Event> = habits
            .iter()
            .filter_map(|h| push_reminder(scheduler, h))
            .collect();

        let live: HashSet<&str> = habits.iter().map(|h| h.id.as_str()).collect();
        let stale: Vec<String> = scheduler
            .scheduled_notifications()
            .into_iter()
            .map(|n| n.habit_id)
            .filter(|id| !live.contains(id.as_str()))
            .collect();
        for id in stale {
            tracing::debug!(habit_id = %id, "dropping reminder for missing habit");
            events.extend(scheduler.remove_notification(&id));
        }
        Ok(events)
    }
}

/// Mirror one habit's rule into the scheduler.
pub fn push_reminder(scheduler: &mut ReminderScheduler, habit: &Habit) -> Option<Event> {
    scheduler.schedule_notification(&habit.id, &habit.name, habit.frequency, &habit.notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::{DatabaseError, ValidationError};
    use crate::habit::{Frequency, ReminderTime};
    use crate::reminder::{Permission, RecordingNotifier};
    use crate::storage::HabitDb;
    use crate::streak::CompletionSet;
    use std::cell::Cell;

    fn clock(d: u32) -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        ))
    }

    fn service_on(day: u32, db: HabitDb) -> HabitService<HabitDb> {
        HabitService::new(db.with_clock(clock(day)), "u1", clock(day))
    }

    #[test]
    fn create_rejects_empty_name_before_store() {
        let svc = service_on(1, HabitDb::open_in_memory().unwrap());
        let err = svc.create(HabitDraft::new("  ", Frequency::Daily)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyName)));
        assert!(svc.list().unwrap().is_empty());
    }

    #[test]
    fn toggle_writes_streak_with_completions() {
        let svc = service_on(1, HabitDb::open_in_memory().unwrap());
        let (habit, _) = svc.create(HabitDraft::new("Read", Frequency::Daily)).unwrap();

        let (toggled, event) = svc.toggle_today(&habit.id).unwrap();
        assert_eq!(toggled.streak, 1);
        assert!(matches!(event, Event::CompletionToggled { completed: true, streak: 1, .. }));

        let (untoggled, _) = svc.toggle_today(&habit.id).unwrap();
        assert_eq!(untoggled.streak, 0);
        assert!(untoggled.completions.is_empty());
    }

    #[test]
    fn list_recomputes_stale_streaks() {
        let db = HabitDb::open_in_memory().unwrap();
        let day1 = service_on(1, db);
        let (habit, _) = day1.create(HabitDraft::new("Read", Frequency::Daily)).unwrap();
        day1.toggle_today(&habit.id).unwrap();

        // Two days later without completing: cached streak 1, real streak 0.
        let day3 = HabitService::new(day1.store, "u1", clock(3));
        let views = day3.list().unwrap();
        assert_eq!(views[0].habit.streak, 0);
        assert!(!views[0].completed_today);
        assert_eq!(views[0].completion_rate, 33);
    }

    #[test]
    fn missing_habit_is_not_found() {
        let svc = service_on(1, HabitDb::open_in_memory().unwrap());
        assert!(matches!(svc.toggle_today("nope"), Err(CoreError::NotFound(_))));
        assert!(matches!(svc.delete("nope"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn summary_over_habits() {
        let svc = service_on(1, HabitDb::open_in_memory().unwrap());
        let (a, _) = svc.create(HabitDraft::new("A", Frequency::Daily)).unwrap();
        svc.create(HabitDraft::new("B", Frequency::Weekly)).unwrap();
        svc.toggle_today(&a.id).unwrap();

        let summary = svc.summary().unwrap();
        assert_eq!(summary.total_habits, 2);
        assert_eq!(summary.completed_today, 1);
        assert_eq!(summary.best_streak, 1);
        assert_eq!(summary.average_completion_rate, 50);
    }

    #[test]
    fn sync_reminders_schedules_enabled_rules() {
        let svc = service_on(1, HabitDb::open_in_memory().unwrap());
        let mut draft = HabitDraft::new("Read", Frequency::Daily);
        draft.notification = NotificationRule::at(ReminderTime::new(9, 0).unwrap());
        let (read, _) = svc.create(draft).unwrap();
        svc.create(HabitDraft::new("Walk", Frequency::Daily)).unwrap();

        let notifier = Arc::new(RecordingNotifier::new(Permission::Granted));
        let mut scheduler = ReminderScheduler::new(notifier, clock(1));
        let events = svc.sync_reminders(&mut scheduler).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.get(&read.id).is_some());

        let view = svc.get(&read.id).unwrap();
        assert_eq!(view.reminder.as_deref(), Some("every day at 9:00 AM"));
    }

    #[test]
    fn resync_follows_store_changes() {
        let svc = service_on(1, HabitDb::open_in_memory().unwrap());
        let mut draft = HabitDraft::new("Read", Frequency::Daily);
        draft.notification = NotificationRule::at(ReminderTime::new(9, 0).unwrap());
        let (read, _) = svc.create(draft.clone()).unwrap();
        draft.name = "Walk".into();
        let (walk, _) = svc.create(draft).unwrap();

        let notifier = Arc::new(RecordingNotifier::new(Permission::Granted));
        let mut scheduler = ReminderScheduler::new(notifier, clock(1));
        assert_eq!(svc.sync_reminders(&mut scheduler).unwrap().len(), 2);

        // Nothing changed: no events.
        assert!(svc.sync_reminders(&mut scheduler).unwrap().is_empty());

        svc.set_reminder(&read.id, NotificationRule::at(ReminderTime::new(18, 30).unwrap()))
            .unwrap();
        svc.delete(&walk.id).unwrap();

        let events = svc.sync_reminders(&mut scheduler).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::ReminderRemoved { habit_id, .. } if habit_id == &walk.id)));
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.get(&walk.id).is_none());
        assert_eq!(
            scheduler.get(&read.id).unwrap().time,
            ReminderTime::new(18, 30).unwrap()
        );
    }

    #[test]
    fn update_recomputes_streak_from_completions() {
        let svc = service_on(3, HabitDb::open_in_memory().unwrap());
        let (habit, _) = svc.create(HabitDraft::new("Read", Frequency::Daily)).unwrap();

        let (cleared, _) = svc
            .update(
                &habit.id,
                HabitPatch {
                    completions: Some(CompletionSet::default()),
                    streak: Some(99),
                    ..HabitPatch::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.streak, 0);
        assert_eq!(svc.fetch(&habit.id).unwrap().streak, 0);

        let days: CompletionSet = [2, 3]
            .into_iter()
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
            .collect();
        let (updated, _) = svc
            .update(
                &habit.id,
                HabitPatch {
                    completions: Some(days),
                    ..HabitPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.streak, 2);

        // A streak alone is still rejected.
        let err = svc
            .update(
                &habit.id,
                HabitPatch {
                    streak: Some(5),
                    ..HabitPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidValue { .. })));
    }

    /// A store whose writes always fail.
    struct BrokenStore {
        calls: Cell<u32>,
    }

    impl HabitStore for BrokenStore {
        fn list_habits(&self, _owner: &str) -> Result<Vec<Habit>> {
            self.calls.set(self.calls.get() + 1);
            Err(DatabaseError::Locked.into())
        }
        fn get_habit(&self, _id: &str, _owner: &str) -> Result<Option<Habit>> {
            Err(DatabaseError::Locked.into())
        }
        fn insert_habit(&self, _owner: &str, _draft: &HabitDraft) -> Result<Habit> {
            self.calls.set(self.calls.get() + 1);
            Err(DatabaseError::QueryFailed("constraint".into()).into())
        }
        fn update_habit(&self, _id: &str, _owner: &str, _patch: &HabitPatch) -> Result<Habit> {
            Err(DatabaseError::Locked.into())
        }
        fn delete_habit(&self, _id: &str, _owner: &str) -> Result<bool> {
            Err(DatabaseError::Locked.into())
        }
    }

    #[test]
    fn store_failures_are_returned_once_without_retry() {
        let svc = HabitService::new(BrokenStore { calls: Cell::new(0) }, "u1", clock(1));
        assert!(matches!(
            svc.create(HabitDraft::new("Read", Frequency::Daily)),
            Err(CoreError::Database(DatabaseError::QueryFailed(_)))
        ));
        assert_eq!(svc.store().calls.get(), 1);

        let notifier = Arc::new(RecordingNotifier::new(Permission::Granted));
        let mut scheduler = ReminderScheduler::new(notifier, clock(1));
        assert!(svc.sync_reminders(&mut scheduler).is_err());
        assert!(scheduler.is_empty());
        assert_eq!(svc.store().calls.get(), 2);
    }
}
