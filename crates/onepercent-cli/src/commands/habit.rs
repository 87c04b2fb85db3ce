//! Habit management commands for CLI.

use clap::Subcommand;
use onepercent_core::{Config, Frequency, HabitDraft, HabitPatch};

use super::habit_service;

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Create {
        /// Habit name
        name: String,
        /// Habit description
        #[arg(long)]
        description: Option<String>,
        /// daily, weekly or monthly (default: habits.default_frequency)
        #[arg(long)]
        frequency: Option<Frequency>,
        /// Palette color (default: random)
        #[arg(long)]
        color: Option<String>,
    },
    /// List habits, newest first
    List,
    /// Get habit details
    Get {
        /// Habit ID
        id: String,
    },
    /// Update a habit
    Update {
        /// Habit ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
        /// New frequency
        #[arg(long)]
        frequency: Option<Frequency>,
        /// New color
        #[arg(long)]
        color: Option<String>,
    },
    /// Delete a habit
    Delete {
        /// Habit ID
        id: String,
    },
    /// Mark today done, or undo it
    Toggle {
        /// Habit ID
        id: String,
    },
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let svc = habit_service()?;

    match action {
        HabitAction::Create {
            name,
            description,
            frequency,
            color,
        } => {
            let frequency =
                frequency.unwrap_or_else(|| Config::load_or_default().habits.default_frequency);
            let draft = HabitDraft {
                description,
                color,
                ..HabitDraft::new(name, frequency)
            };
            let (habit, _) = svc.create(draft)?;
            println!("{}", serde_json::to_string_pretty(&svc.view(habit))?);
        }
        HabitAction::List => {
            let habits = svc.list()?;
            println!("{}", serde_json::to_string_pretty(&habits)?);
        }
        HabitAction::Get { id } => {
            let habit = svc.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&habit)?);
        }
        HabitAction::Update {
            id,
            name,
            description,
            clear_description,
            frequency,
            color,
        } => {
            let patch = HabitPatch {
                name,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                frequency,
                color,
                ..HabitPatch::default()
            };
            if patch.is_empty() {
                return Err("nothing to update; pass at least one field".into());
            }
            let (habit, _) = svc.update(&id, patch)?;
            println!("{}", serde_json::to_string_pretty(&svc.view(habit))?);
        }
        HabitAction::Delete { id } => {
            let event = svc.delete(&id)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        HabitAction::Toggle { id } => {
            let (_, event) = svc.toggle_today(&id)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }
    Ok(())
}
