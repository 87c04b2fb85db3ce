//! Environment check: data directory, config, database schema and session.

use onepercent_core::storage::{data_dir, migrations};
use onepercent_core::{Accounts, Config, HabitDb};
use serde::Serialize;

use super::notifier::stored_permission;

const REQUIRED_TABLES: [&str; 3] = ["habits", "users", "kv"];

#[derive(Serialize)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl ToString) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.to_string(),
        }
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let checks = collect_checks();
    let ok = checks.iter().all(|c| c.ok);
    let report = serde_json::json!({ "ok": ok, "checks": checks });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if ok {
        Ok(())
    } else {
        Err("one or more checks failed".into())
    }
}

fn collect_checks() -> Vec<Check> {
    let mut checks = Vec::new();

    match data_dir() {
        Ok(dir) => checks.push(Check::pass("data_dir", dir.display().to_string())),
        Err(e) => {
            checks.push(Check::fail("data_dir", e));
            return checks;
        }
    }

    checks.push(match Config::load() {
        Ok(_) => Check::pass("config", "loaded"),
        Err(e) => Check::fail("config", e),
    });

    let db = match HabitDb::open() {
        Ok(db) => db,
        Err(e) => {
            checks.push(Check::fail("database", e));
            return checks;
        }
    };

    let version = migrations::get_schema_version(db.conn());
    checks.push(if version == migrations::SCHEMA_VERSION {
        Check::pass("schema", format!("version {version}"))
    } else {
        Check::fail(
            "schema",
            format!("version {version}, expected {}", migrations::SCHEMA_VERSION),
        )
    });

    let missing: Vec<&str> = REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|t| !matches!(db.table_exists(t), Ok(true)))
        .collect();
    checks.push(if missing.is_empty() {
        Check::pass("tables", REQUIRED_TABLES.join(", "))
    } else {
        Check::fail("tables", format!("missing: {}", missing.join(", ")))
    });

    // Not being signed in is a normal state, not a failure.
    match Accounts::new(&db).current_user() {
        Ok(Some(user)) => {
            checks.push(Check::pass("session", user.email.as_str()));
            checks.push(match db.count_habits(&user.id) {
                Ok(n) => Check::pass("habits", format!("{n} habit(s)")),
                Err(e) => Check::fail("habits", e),
            });
        }
        Ok(None) => checks.push(Check::pass("session", "not signed in")),
        Err(e) => checks.push(Check::fail("session", e)),
    }

    checks.push(match stored_permission(&db) {
        Ok(p) => Check::pass("notification_permission", p.as_str()),
        Err(e) => Check::fail("notification_permission", e),
    });

    checks
}
