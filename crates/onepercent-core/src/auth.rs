//! Local accounts and the signed-in session.
//!
//! Passwords are checked against the sign-up policy before anything touches
//! the database. Hashes are salted SHA-256; the session is the signed-in user
//! id kept in the `kv` table.

use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AuthError, Result, ValidationError};
use crate::storage::{HabitDb, UserRecord};

const SESSION_KEY: &str = "session.user_id";
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

pub struct PasswordRequirement {
    pub id: &'static str,
    pub label: &'static str,
    test: fn(&str) -> bool,
}

impl PasswordRequirement {
    pub fn is_met(&self, password: &str) -> bool {
        (self.test)(password)
    }
}

pub const PASSWORD_REQUIREMENTS: [PasswordRequirement; 5] = [
    PasswordRequirement {
        id: "length",
        label: "At least 8 characters",
        test: |p| p.chars().count() >= 8,
    },
    PasswordRequirement {
        id: "uppercase",
        label: "At least one uppercase letter",
        test: |p| p.chars().any(|c| c.is_ascii_uppercase()),
    },
    PasswordRequirement {
        id: "lowercase",
        label: "At least one lowercase letter",
        test: |p| p.chars().any(|c| c.is_ascii_lowercase()),
    },
    PasswordRequirement {
        id: "number",
        label: "At least one number",
        test: |p| p.chars().any(|c| c.is_ascii_digit()),
    },
    PasswordRequirement {
        id: "special",
        label: "At least one special character",
        test: |p| p.chars().any(|c| SPECIAL_CHARS.contains(c)),
    },
];

/// Number of requirements met, 0..=5.
pub fn password_strength(password: &str) -> usize {
    PASSWORD_REQUIREMENTS
        .iter()
        .filter(|r| r.is_met(password))
        .count()
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let unmet: Vec<String> = PASSWORD_REQUIREMENTS
        .iter()
        .filter(|r| !r.is_met(password))
        .map(|r| r.label.to_string())
        .collect();
    if unmet.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword { unmet })
    }
}

/// Trim and lowercase; require `local@domain`.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(ValidationError::InvalidEmail(email)),
    }
}

/// All sign-up checks; returns the normalized email.
pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<String, ValidationError> {
    let email = normalize_email(email)?;
    validate_password(password)?;
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(email)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Account operations over the habit database.
pub struct Accounts<'a> {
    db: &'a HabitDb,
}

impl<'a> Accounts<'a> {
    pub fn new(db: &'a HabitDb) -> Self {
        Self { db }
    }

    pub fn sign_up(&self, email: &str, password: &str, confirm: &str) -> Result<UserRecord> {
        let email = validate_signup(email, password, confirm)?;
        if self.db.find_user_by_email(&email)?.is_some() {
            return Err(AuthError::AlreadyRegistered(email).into());
        }

        let salt = new_salt();
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            password_hash: hash_password(&salt, password),
            email,
            salt,
            created_at: Utc::now(),
        };
        self.db.insert_user(&user)?;
        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// Verify credentials and start a session.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<UserRecord> {
        let email = normalize_email(email)?;
        let user = self
            .db
            .find_user_by_email(&email)?
            .filter(|u| hash_password(&u.salt, password) == u.password_hash)
            .ok_or(AuthError::InvalidCredentials)?;
        self.db.kv_set(SESSION_KEY, &user.id)?;
        tracing::info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    /// End the session. Returns whether one was active.
    pub fn sign_out(&self) -> Result<bool> {
        let active = self.db.kv_get(SESSION_KEY)?.is_some();
        self.db.kv_delete(SESSION_KEY)?;
        if active {
            tracing::info!("signed out");
        }
        Ok(active)
    }

    pub fn current_user(&self) -> Result<Option<UserRecord>> {
        match self.db.kv_get(SESSION_KEY)? {
            Some(id) => self.db.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn require_user(&self) -> Result<UserRecord> {
        self.current_user()?
            .ok_or_else(|| AuthError::NotSignedIn.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    const GOOD: &str = "Sup3r$ecret";

    #[test]
    fn strength_counts_met_rules() {
        assert_eq!(password_strength(""), 0);
        assert_eq!(password_strength("abc"), 1);
        assert_eq!(password_strength("abcdefgh"), 2);
        assert_eq!(password_strength("Abcdefg1"), 4);
        assert_eq!(password_strength(GOOD), 5);
    }

    #[test]
    fn weak_password_reports_missing_rules() {
        match validate_password("abcdefgh") {
            Err(ValidationError::WeakPassword { unmet }) => {
                assert_eq!(unmet.len(), 3);
                assert!(unmet.contains(&"At least one number".to_string()));
            }
            other => panic!("expected WeakPassword, got {other:?}"),
        }
    }

    #[test]
    fn signup_checks_confirmation_and_email() {
        assert_eq!(
            validate_signup("a@b.c", GOOD, "different"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(matches!(
            validate_signup("nope", GOOD, GOOD),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert_eq!(validate_signup(" A@B.c ", GOOD, GOOD).unwrap(), "a@b.c");
    }

    #[test]
    fn sign_up_then_in_and_out() {
        let db = HabitDb::open_in_memory().unwrap();
        let accounts = Accounts::new(&db);

        let user = accounts.sign_up("me@example.com", GOOD, GOOD).unwrap();
        assert_ne!(user.password_hash, GOOD);
        assert!(accounts.current_user().unwrap().is_none());

        let signed_in = accounts.sign_in("ME@example.com", GOOD).unwrap();
        assert_eq!(signed_in.id, user.id);
        assert_eq!(accounts.require_user().unwrap().id, user.id);

        assert!(accounts.sign_out().unwrap());
        assert!(!accounts.sign_out().unwrap());
        assert!(matches!(
            accounts.require_user(),
            Err(CoreError::Auth(AuthError::NotSignedIn))
        ));
    }

    #[test]
    fn rejects_duplicate_and_wrong_password() {
        let db = HabitDb::open_in_memory().unwrap();
        let accounts = Accounts::new(&db);
        accounts.sign_up("me@example.com", GOOD, GOOD).unwrap();

        assert!(matches!(
            accounts.sign_up("me@example.com", GOOD, GOOD),
            Err(CoreError::Auth(AuthError::AlreadyRegistered(_)))
        ));
        assert!(matches!(
            accounts.sign_in("me@example.com", "Wr0ng!pass"),
            Err(CoreError::Auth(AuthError::InvalidCredentials))
        ));
        assert!(matches!(
            accounts.sign_in("nobody@example.com", GOOD),
            Err(CoreError::Auth(AuthError::InvalidCredentials))
        ));
    }
}
