pub mod auth;
pub mod config;
pub mod doctor;
pub mod habit;
pub mod notifier;
pub mod remind;
pub mod stats;

use std::sync::Arc;

use onepercent_core::{Accounts, HabitDb, HabitService, SystemClock};

/// Open the database and scope habit operations to the signed-in user.
pub fn habit_service() -> Result<HabitService<HabitDb>, Box<dyn std::error::Error>> {
    let db = HabitDb::open()?;
    let user = Accounts::new(&db).require_user()?;
    Ok(HabitService::new(db, user.id, Arc::new(SystemClock)))
}
