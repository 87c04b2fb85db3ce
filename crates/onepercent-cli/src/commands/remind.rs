//! Reminder commands for CLI.

use std::sync::Arc;

use clap::Subcommand;
use onepercent_core::habit::parse_weekdays;
use onepercent_core::{
    Accounts, Config, Frequency, HabitDb, HabitService, NotificationRule, Notifier,
    ReminderScheduler, ReminderTime, SystemClock,
};
use tokio::time::MissedTickBehavior;

use super::habit_service;
use super::notifier::{store_permission, stored_permission, TerminalNotifier};

#[derive(Subcommand)]
pub enum RemindAction {
    /// Set or change a habit's reminder
    Set {
        /// Habit ID
        id: String,
        /// Local time, HH:MM (24-hour)
        time: ReminderTime,
        /// Comma-separated weekdays for weekly habits (e.g. "monday,thursday")
        #[arg(long)]
        days: Option<String>,
    },
    /// Turn a habit's reminder off
    Off {
        /// Habit ID
        id: String,
    },
    /// List scheduled reminders
    List,
    /// Show notification permission
    Permission {
        /// Ask for permission if not yet decided
        #[arg(long)]
        request: bool,
    },
    /// Fire reminders in this terminal until interrupted
    Watch,
}

pub fn run(action: RemindAction) -> Result<(), Box<dyn std::error::Error>> {
    let svc = habit_service()?;

    match action {
        RemindAction::Set { id, time, days } => {
            let current = svc.get(&id)?.habit;
            let mut rule = NotificationRule::at(time);
            match days {
                Some(list) => {
                    if current.frequency != Frequency::Weekly {
                        tracing::warn!(habit_id = %id, "reminder days only apply to weekly habits");
                    }
                    rule.days = Some(parse_weekdays(&list)?);
                }
                None => rule.days = current.notification.days,
            }
            let (habit, _) = svc.set_reminder(&id, rule)?;
            println!("{}", serde_json::to_string_pretty(&svc.view(habit))?);
        }
        RemindAction::Off { id } => {
            let current = svc.get(&id)?.habit;
            let rule = NotificationRule {
                enabled: false,
                ..current.notification
            };
            let (habit, _) = svc.set_reminder(&id, rule)?;
            println!("{}", serde_json::to_string_pretty(&svc.view(habit))?);
        }
        RemindAction::List => {
            let notifier = Arc::new(TerminalNotifier::new(stored_permission(svc.store())?));
            let scheduler = load_scheduler(&svc, notifier, &Config::load_or_default())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&scheduler.scheduled_notifications())?
            );
        }
        RemindAction::Permission { request } => {
            let db = svc.store();
            let notifier = Arc::new(TerminalNotifier::new(stored_permission(db)?));
            if request {
                let scheduler = ReminderScheduler::new(notifier.clone(), Arc::new(SystemClock));
                scheduler.request_permission();
                store_permission(db, notifier.permission())?;
            }
            let permission = notifier.permission();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "permission": permission }))?
            );
        }
        RemindAction::Watch => watch(&svc)?,
    }
    Ok(())
}

/// Scheduler with every enabled reminder of the signed-in user.
fn load_scheduler(
    svc: &HabitService<HabitDb>,
    notifier: Arc<TerminalNotifier>,
    config: &Config,
) -> Result<ReminderScheduler, Box<dyn std::error::Error>> {
    let mut scheduler =
        ReminderScheduler::with_config(notifier, Arc::new(SystemClock), config.scheduler());
    svc.sync_reminders(&mut scheduler)?;
    Ok(scheduler)
}

fn watch(svc: &HabitService<HabitDb>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    if !config.notifications.enabled {
        eprintln!("notifications are disabled (notifications.enabled = false)");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // The ticker spawns on the runtime entered here.
        let notifier = Arc::new(TerminalNotifier::new(stored_permission(svc.store())?));
        let mut scheduler = load_scheduler(svc, notifier.clone(), &config)?;
        if scheduler.is_empty() {
            eprintln!("no reminders scheduled");
            return Ok(());
        }

        let granted = scheduler.request_permission();
        store_permission(svc.store(), notifier.permission())?;
        if !granted {
            eprintln!("reminders are not permitted; run `onepercent remind permission --request`");
            return Ok(());
        }

        for entry in scheduler.scheduled_notifications() {
            eprintln!("watching: {} {}", entry.habit_name, entry.describe());
        }

        // Stop on Ctrl-C, or once the owner is no longer signed in. Each
        // check also picks up habits changed by other commands.
        let mut session_check = tokio::time::interval(scheduler.check_interval());
        session_check.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    break;
                }
                _ = session_check.tick() => {
                    let current = Accounts::new(svc.store()).current_user()?;
                    if current.as_ref().map(|u| u.id.as_str()) != Some(svc.owner()) {
                        eprintln!("signed out; stopping reminders");
                        break;
                    }
                    match svc.sync_reminders(&mut scheduler) {
                        Ok(events) => {
                            for event in events {
                                tracing::info!(?event, "reminders refreshed");
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "reminder refresh failed"),
                    }
                }
            }
        }

        let event = scheduler.clear_all();
        println!("{}", serde_json::to_string_pretty(&event)?);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
