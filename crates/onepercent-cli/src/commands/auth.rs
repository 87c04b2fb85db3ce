//! Account commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use onepercent_core::auth::{password_strength, PASSWORD_REQUIREMENTS};
use onepercent_core::{Accounts, Event, HabitDb};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an account
    Signup {
        /// Email address
        email: String,
        /// Password
        #[arg(long)]
        password: String,
        /// Password again
        #[arg(long)]
        confirm: String,
    },
    /// Sign in and start a session
    Signin {
        /// Email address
        email: String,
        /// Password
        #[arg(long)]
        password: String,
    },
    /// End the session
    Signout,
    /// Show the signed-in account
    Whoami,
    /// Check a password against the sign-up rules
    CheckPassword {
        /// Password to check
        password: String,
    },
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Signup {
            email,
            password,
            confirm,
        } => {
            let db = HabitDb::open()?;
            let user = Accounts::new(&db).sign_up(&email, &password, &confirm)?;
            println!("Account created: {}", user.email);
            println!("Sign in with: onepercent auth signin {}", user.email);
        }
        AuthAction::Signin { email, password } => {
            let db = HabitDb::open()?;
            let user = Accounts::new(&db).sign_in(&email, &password)?;
            let event = Event::SignedIn {
                user_id: user.id,
                email: user.email,
                at: Utc::now(),
            };
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        AuthAction::Signout => {
            let db = HabitDb::open()?;
            if Accounts::new(&db).sign_out()? {
                let event = Event::SignedOut { at: Utc::now() };
                println!("{}", serde_json::to_string_pretty(&event)?);
            } else {
                println!("not signed in");
            }
        }
        AuthAction::Whoami => {
            let db = HabitDb::open()?;
            let user = Accounts::new(&db).require_user()?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        AuthAction::CheckPassword { password } => {
            let rules: Vec<_> = PASSWORD_REQUIREMENTS
                .iter()
                .map(|r| serde_json::json!({ "id": r.id, "label": r.label, "met": r.is_met(&password) }))
                .collect();
            let report = serde_json::json!({
                "strength": password_strength(&password),
                "max": PASSWORD_REQUIREMENTS.len(),
                "requirements": rules,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
