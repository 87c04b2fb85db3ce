//! The display port the scheduler fires through.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Whether reminders may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Not asked yet.
    Undetermined,
    /// The backend cannot show notifications at all.
    Unsupported,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Undetermined => "undetermined",
            Permission::Unsupported => "unsupported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "granted" => Some(Permission::Granted),
            "denied" => Some(Permission::Denied),
            "undetermined" => Some(Permission::Undetermined),
            "unsupported" => Some(Permission::Unsupported),
            _ => None,
        }
    }
}

/// A titled message. Notifications sharing a `tag` replace each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderNotification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

pub trait Notifier: Send + Sync {
    /// Current permission, without prompting.
    fn permission(&self) -> Permission;

    /// Ask the user. Only called while permission is `Undetermined`.
    fn request_permission(&self) -> Permission;

    fn display(
        &self,
        notification: &ReminderNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Keeps displayed notifications in memory. One entry per tag, newest wins.
#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Mutex<Permission>,
    answer: Permission,
    shown: Mutex<Vec<ReminderNotification>>,
    fired: Mutex<usize>,
}

impl RecordingNotifier {
    pub fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer: Permission::Granted,
            shown: Mutex::new(Vec::new()),
            fired: Mutex::new(0),
        }
    }

    /// What `request_permission` resolves to when asked.
    pub fn answering(mut self, answer: Permission) -> Self {
        self.answer = answer;
        self
    }

    pub fn set_permission(&self, permission: Permission) {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner) = permission;
    }

    /// Visible notifications, deduplicated by tag.
    pub fn shown(&self) -> Vec<ReminderNotification> {
        self.shown.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Total `display` calls, including ones that replaced an earlier tag.
    pub fn display_count(&self) -> usize {
        *self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_permission(&self) -> Permission {
        let mut current = self.permission.lock().unwrap_or_else(PoisonError::into_inner);
        *current = self.answer;
        *current
    }

    fn display(
        &self,
        notification: &ReminderNotification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
        shown.retain(|n| n.tag != notification.tag);
        shown.push(notification.clone());
        *self.fired.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(tag: &str, body: &str) -> ReminderNotification {
        ReminderNotification {
            title: "t".into(),
            body: body.into(),
            tag: tag.into(),
        }
    }

    #[test]
    fn same_tag_replaces() {
        let n = RecordingNotifier::new(Permission::Granted);
        n.display(&note("habit-1", "a")).unwrap();
        n.display(&note("habit-1", "b")).unwrap();
        n.display(&note("habit-2", "c")).unwrap();
        let shown = n.shown();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].body, "b");
        assert_eq!(n.display_count(), 3);
    }

    #[test]
    fn permission_strings() {
        for p in [
            Permission::Granted,
            Permission::Denied,
            Permission::Undetermined,
            Permission::Unsupported,
        ] {
            assert_eq!(Permission::parse(p.as_str()), Some(p));
        }
        assert_eq!(Permission::parse("default"), None);
    }
}
