use clap::Subcommand;

use super::habit_service;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals, today's completions, best streak and average rate
    Summary,
    /// Per-habit streak and completion rate
    Habits,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let svc = habit_service()?;

    match action {
        StatsAction::Summary => {
            let summary = svc.summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Habits => {
            let rows: Vec<_> = svc
                .list()?
                .into_iter()
                .map(|v| {
                    serde_json::json!({
                        "id": v.habit.id,
                        "name": v.habit.name,
                        "streak": v.habit.streak,
                        "completed_today": v.completed_today,
                        "completion_rate": v.completion_rate,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
