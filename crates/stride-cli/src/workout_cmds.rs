//! CLI handlers for `stride workout` subcommands, run as an athlete.

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::workouts::{complete_workout, list_assigned_workouts};

use crate::{WorkoutCommands, acting_user};

/// Default listing window: today and the six days after it.
pub fn default_range(
    today: NaiveDate,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> (NaiveDate, NaiveDate) {
    let from = from.unwrap_or(today);
    let to = to.unwrap_or(from + Duration::days(6));
    (from, to)
}

pub async fn run_workout_command(
    command: WorkoutCommands,
    pool: &PgPool,
    actor_id: Option<Uuid>,
) -> Result<()> {
    let actor = acting_user(pool, actor_id).await?;
    match command {
        WorkoutCommands::List { from, to } => {
            let (from, to) = default_range(chrono::Local::now().date_naive(), from, to);
            let rows = list_assigned_workouts(pool, &actor, from, to).await?;

            if rows.is_empty() {
                println!("No workouts assigned between {from} and {to}.");
                return Ok(());
            }

            println!(
                "{:<36}  {:<10}  {:<12}  {:<4}  PLAN",
                "ID", "DATE", "TYPE", "DONE"
            );
            for w in &rows {
                let done = if w.completed { "yes" } else { "" };
                let label = match &w.title {
                    Some(t) => format!("{} / {t}", w.plan_name),
                    None => w.plan_name.clone(),
                };
                println!(
                    "{:<36}  {:<10}  {:<12}  {:<4}  {label}",
                    w.id,
                    w.workout_date.to_string(),
                    w.session_type.to_string(),
                    done,
                );
            }
            Ok(())
        }
        WorkoutCommands::Complete {
            assignment_id,
            notes,
            effort,
        } => {
            let row = complete_workout(pool, &actor, assignment_id, notes.as_deref(), effort).await?;
            println!("Workout {} on {} marked completed.", row.id, row.workout_date);
            if let Some(e) = row.perceived_effort {
                println!("  Perceived effort:  {e}/10");
            }
            Ok(())
        }
    }
}
