use crate::error::Result;
use crate::habit::{Habit, HabitDraft, HabitPatch};

/// Where habits live. Every call is scoped by owner.
///
/// Implementations assign `id` and `created_at` on insert. Failures are
/// returned as-is; callers do not retry.
pub trait HabitStore {
    /// The owner's habits, newest first.
    fn list_habits(&self, owner: &str) -> Result<Vec<Habit>>;

    fn get_habit(&self, id: &str, owner: &str) -> Result<Option<Habit>>;

    /// Insert and return the stored row.
    fn insert_habit(&self, owner: &str, draft: &HabitDraft) -> Result<Habit>;

    /// Write the patch's named fields. Returns the updated row, or
    /// `CoreError::NotFound` if no habit matches `id` and `owner`.
    fn update_habit(&self, id: &str, owner: &str, patch: &HabitPatch) -> Result<Habit>;

    /// Returns whether a row was deleted.
    fn delete_habit(&self, id: &str, owner: &str) -> Result<bool>;
}
