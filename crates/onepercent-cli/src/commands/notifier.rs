//! Terminal-backed notifier for `remind watch`.

use std::io::{BufRead, IsTerminal, Write};
use std::sync::{Mutex, PoisonError};

use onepercent_core::{HabitDb, Notifier, Permission, ReminderNotification};

const PERMISSION_KEY: &str = "notifications.permission";

/// Last permission answer, `Undetermined` if never asked.
pub fn stored_permission(db: &HabitDb) -> onepercent_core::error::Result<Permission> {
    Ok(db
        .kv_get(PERMISSION_KEY)?
        .and_then(|s| Permission::parse(&s))
        .unwrap_or(Permission::Undetermined))
}

pub fn store_permission(db: &HabitDb, permission: Permission) -> onepercent_core::error::Result<()> {
    db.kv_set(PERMISSION_KEY, permission.as_str())
}

/// Prints reminders to stdout with a bell.
pub struct TerminalNotifier {
    permission: Mutex<Permission>,
}

impl TerminalNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
        }
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_permission(&self) -> Permission {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return self.permission();
        }

        eprint!("Show habit reminders in this terminal? [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        let granted = stdin.lock().read_line(&mut answer).is_ok()
            && matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");

        let permission = if granted {
            Permission::Granted
        } else {
            Permission::Denied
        };
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner) = permission;
        permission
    }

    fn display(
        &self,
        notification: &ReminderNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "\x07[{}] {}", notification.title, notification.body)?;
        out.flush()?;
        Ok(())
    }
}
