//! SQLite-backed habit store.
//!
//! Provides persistent storage for:
//! - Habits with their completion history and reminder rule
//! - Local user accounts
//! - Key-value store for session and preference state

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{data_dir, migrations, HabitStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, DatabaseError, Result};
use crate::habit::{Frequency, Habit, HabitDraft, HabitPatch, NotificationRule};
use crate::streak::CompletionSet;

const HABIT_COLUMNS: &str = "id, owner, name, description, frequency, created_at, \
                             completions, streak, color, notification";

/// A local account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

/// Raw column values, decoded outside the rusqlite row closure.
struct HabitRow {
    id: String,
    owner: String,
    name: String,
    description: Option<String>,
    frequency: String,
    created_at: String,
    completions: String,
    streak: u32,
    color: String,
    notification: String,
}

impl HabitRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            frequency: row.get(4)?,
            created_at: row.get(5)?,
            completions: row.get(6)?,
            streak: row.get(7)?,
            color: row.get(8)?,
            notification: row.get(9)?,
        })
    }

    fn decode(self) -> Result<Habit> {
        let corrupt = |message: String| DatabaseError::CorruptRow {
            table: "habits".into(),
            message,
        };
        let frequency: Frequency = self
            .frequency
            .parse()
            .map_err(|e| corrupt(format!("habit {}: {e}", self.id)))?;
        let created_at = parse_datetime(&self.created_at)
            .map_err(|e| corrupt(format!("habit {}: created_at: {e}", self.id)))?;
        let completions: CompletionSet = serde_json::from_str(&self.completions)
            .map_err(|e| corrupt(format!("habit {}: completions: {e}", self.id)))?;
        let notification: NotificationRule = serde_json::from_str(&self.notification)
            .map_err(|e| corrupt(format!("habit {}: notification: {e}", self.id)))?;

        Ok(Habit {
            id: self.id,
            name: self.name,
            description: self.description,
            frequency,
            created_at,
            completions,
            streak: self.streak,
            color: self.color,
            owner: self.owner,
            notification,
        })
    }
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// SQLite database for habits, accounts and the kv store.
pub struct HabitDb {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl HabitDb {
    /// Open the database at `<data_dir>/onepercent.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("onepercent.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` for store-assigned timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_habits(&self, owner: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM habits WHERE owner = ?1",
            params![owner],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    // ── Accounts ─────────────────────────────────────────────────────

    pub fn insert_user(&self, user: &UserRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.salt,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.query_user("WHERE email = ?1", email)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        self.query_user("WHERE id = ?1", id)
    }

    fn query_user(&self, filter: &str, arg: &str) -> Result<Option<UserRecord>> {
        let sql = format!("SELECT id, email, password_hash, salt, created_at FROM users {filter}");
        let raw = self
            .conn
            .query_row(&sql, params![arg], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .optional()?;

        raw.map(|(id, email, password_hash, salt, created_at)| -> Result<UserRecord> {
            let created_at = parse_datetime(&created_at).map_err(|e| DatabaseError::CorruptRow {
                table: "users".into(),
                message: format!("user {id}: created_at: {e}"),
            })?;
            Ok(UserRecord {
                id,
                email,
                password_hash,
                salt,
                created_at,
            })
        })
        .transpose()
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl HabitStore for HabitDb {
    fn list_habits(&self, owner: &str) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE owner = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map(params![owner], HabitRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(HabitRow::decode).collect()
    }

    fn get_habit(&self, id: &str, owner: &str) -> Result<Option<Habit>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND owner = ?2"),
                params![id, owner],
                HabitRow::read,
            )
            .optional()?;
        row.map(HabitRow::decode).transpose()
    }

    fn insert_habit(&self, owner: &str, draft: &HabitDraft) -> Result<Habit> {
        let habit = Habit {
            id: Uuid::new_v4().to_string(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            frequency: draft.frequency,
            created_at: self.clock.now_utc(),
            completions: CompletionSet::new(),
            streak: 0,
            color: draft.color_or_random(),
            owner: owner.to_string(),
            notification: draft.notification.clone(),
        };

        self.conn.execute(
            &format!(
                "INSERT INTO habits ({HABIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                habit.id,
                habit.owner,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.created_at.to_rfc3339(),
                serde_json::to_string(&habit.completions).map_err(CoreError::Json)?,
                habit.streak,
                habit.color,
                serde_json::to_string(&habit.notification).map_err(CoreError::Json)?,
            ],
        )?;
        Ok(habit)
    }

    fn update_habit(&self, id: &str, owner: &str, patch: &HabitPatch) -> Result<Habit> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            sets.push("name");
            values.push(Value::Text(name.clone()));
        }
        if let Some(description) = &patch.description {
            sets.push("description");
            values.push(description.clone().map_or(Value::Null, Value::Text));
        }
        if let Some(frequency) = patch.frequency {
            sets.push("frequency");
            values.push(Value::Text(frequency.as_str().to_string()));
        }
        if let Some(color) = &patch.color {
            sets.push("color");
            values.push(Value::Text(color.clone()));
        }
        if let Some(completions) = &patch.completions {
            sets.push("completions");
            values.push(Value::Text(serde_json::to_string(completions)?));
        }
        if let Some(streak) = patch.streak {
            sets.push("streak");
            values.push(Value::Integer(i64::from(streak)));
        }
        if let Some(notification) = &patch.notification {
            sets.push("notification");
            values.push(Value::Text(serde_json::to_string(notification)?));
        }

        if !sets.is_empty() {
            let assignments: Vec<String> = sets
                .iter()
                .enumerate()
                .map(|(i, col)| format!("{col} = ?{}", i + 1))
                .collect();
            let n = values.len();
            values.push(Value::Text(id.to_string()));
            values.push(Value::Text(owner.to_string()));
            let sql = format!(
                "UPDATE habits SET {} WHERE id = ?{} AND owner = ?{}",
                assignments.join(", "),
                n + 1,
                n + 2
            );
            let changed = self.conn.execute(&sql, params_from_iter(values))?;
            if changed == 0 {
                return Err(CoreError::NotFound(id.to_string()));
            }
        }

        self.get_habit(id, owner)?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    fn delete_habit(&self, id: &str, owner: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM habits WHERE id = ?1 AND owner = ?2",
            params![id, owner],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::habit::{ReminderTime, Weekday};
    use chrono::NaiveDate;

    fn db() -> HabitDb {
        HabitDb::open_in_memory().unwrap()
    }

    #[test]
    fn insert_assigns_id_and_timestamp() {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        let db = db().with_clock(clock);
        let habit = db
            .insert_habit("u1", &HabitDraft::new("Read", Frequency::Daily))
            .unwrap();
        assert!(!habit.id.is_empty());
        assert_eq!(habit.created_at.date_naive(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(db.get_habit(&habit.id, "u1").unwrap(), Some(habit));
    }

    #[test]
    fn list_is_scoped_and_newest_first() {
        let db = db();
        let first = db.insert_habit("u1", &HabitDraft::new("First", Frequency::Daily)).unwrap();
        let second = db.insert_habit("u1", &HabitDraft::new("Second", Frequency::Weekly)).unwrap();
        db.insert_habit("u2", &HabitDraft::new("Other", Frequency::Daily)).unwrap();

        let ids: Vec<_> = db.list_habits("u1").unwrap().into_iter().map(|h| h.id).collect();
        assert_eq!(ids, [second.id, first.id]);
        assert_eq!(db.count_habits("u2").unwrap(), 1);
    }

    #[test]
    fn update_writes_named_fields_only() {
        let db = db();
        let mut draft = HabitDraft::new("Read", Frequency::Daily);
        draft.description = Some("20 pages".into());
        let habit = db.insert_habit("u1", &draft).unwrap();

        let rule = NotificationRule::at(ReminderTime::new(7, 30).unwrap()).on_days([Weekday::Friday]);
        let updated = db
            .update_habit(
                &habit.id,
                "u1",
                &HabitPatch {
                    frequency: Some(Frequency::Weekly),
                    notification: Some(rule.clone()),
                    ..HabitPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Read");
        assert_eq!(updated.description.as_deref(), Some("20 pages"));
        assert_eq!(updated.frequency, Frequency::Weekly);
        assert_eq!(updated.notification, rule);
    }

    #[test]
    fn update_can_clear_description() {
        let db = db();
        let mut draft = HabitDraft::new("Read", Frequency::Daily);
        draft.description = Some("x".into());
        let habit = db.insert_habit("u1", &draft).unwrap();
        let updated = db
            .update_habit(
                &habit.id,
                "u1",
                &HabitPatch {
                    description: Some(None),
                    ..HabitPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.description, None);
    }

    #[test]
    fn completions_round_trip_through_storage() {
        let db = db();
        let habit = db.insert_habit("u1", &HabitDraft::new("Read", Frequency::Daily)).unwrap();
        let completions = CompletionSet::parse(["2024-01-02", "2024-01-01"]).unwrap();
        let updated = db
            .update_habit(
                &habit.id,
                "u1",
                &HabitPatch {
                    completions: Some(completions.clone()),
                    streak: Some(2),
                    ..HabitPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.completions, completions);
        assert_eq!(updated.streak, 2);

        let raw: String = db
            .conn()
            .query_row("SELECT completions FROM habits WHERE id = ?1", params![habit.id], |r| r.get(0))
            .unwrap();
        assert_eq!(raw, r#"["2024-01-01","2024-01-02"]"#);
    }

    #[test]
    fn other_owner_cannot_touch_habit() {
        let db = db();
        let habit = db.insert_habit("u1", &HabitDraft::new("Read", Frequency::Daily)).unwrap();

        let patch = HabitPatch {
            name: Some("Hijacked".into()),
            ..HabitPatch::default()
        };
        assert!(matches!(
            db.update_habit(&habit.id, "u2", &patch),
            Err(CoreError::NotFound(_))
        ));
        assert!(!db.delete_habit(&habit.id, "u2").unwrap());
        assert!(db.get_habit(&habit.id, "u2").unwrap().is_none());
        assert!(db.delete_habit(&habit.id, "u1").unwrap());
        assert!(db.list_habits("u1").unwrap().is_empty());
    }

    #[test]
    fn corrupt_rows_surface_as_errors() {
        let db = db();
        let habit = db.insert_habit("u1", &HabitDraft::new("Read", Frequency::Daily)).unwrap();
        db.conn()
            .execute("UPDATE habits SET completions = 'nope' WHERE id = ?1", params![habit.id])
            .unwrap();
        assert!(matches!(
            db.list_habits("u1"),
            Err(CoreError::Database(DatabaseError::CorruptRow { .. }))
        ));
    }

    #[test]
    fn kv_store() {
        let db = db();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().as_deref(), Some("hello"));
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn users_by_email_and_id() {
        let db = db();
        let user = UserRecord {
            id: "u1".into(),
            email: "a@example.com".into(),
            password_hash: "h".into(),
            salt: "s".into(),
            created_at: Utc::now(),
        };
        db.insert_user(&user).unwrap();
        assert_eq!(db.find_user_by_email("a@example.com").unwrap().unwrap().id, "u1");
        assert_eq!(db.get_user("u1").unwrap().unwrap().email, "a@example.com");
        assert!(db.insert_user(&user).is_err());
        assert!(db.table_exists("habits").unwrap());
    }
}
