//! The athlete's side of assigned workouts: listing and completion.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use stride_db::models::AssignedWorkout;
use stride_db::queries::assignments::{self, AssignmentWithSession};

use crate::actor::Actor;
use crate::error::{EngineError, EngineResult};

/// The actor's assignments with `from <= workout_date <= to`.
pub async fn list_assigned_workouts(
    pool: &PgPool,
    actor: &Actor,
    from: NaiveDate,
    to: NaiveDate,
) -> EngineResult<Vec<AssignmentWithSession>> {
    if from > to {
        return Err(EngineError::validation(format!(
            "range start {from} is after range end {to}"
        )));
    }
    Ok(assignments::list_for_athlete(pool, actor.id, from, to).await?)
}

/// Mark one of the actor's assignments completed.
///
/// `perceived_effort` must be 1 to 10. Assignments of other athletes are
/// reported as not found.
pub async fn complete_workout(
    pool: &PgPool,
    actor: &Actor,
    assignment_id: Uuid,
    notes: Option<&str>,
    perceived_effort: Option<i16>,
) -> EngineResult<AssignedWorkout> {
    if let Some(effort) = perceived_effort.filter(|e| !(1..=10).contains(e)) {
        return Err(EngineError::validation(format!(
            "perceived effort must be between 1 and 10, got {effort}"
        )));
    }
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    let row = assignments::record_completion(pool, assignment_id, actor.id, notes, perceived_effort)
        .await?
        .ok_or_else(|| EngineError::not_found("assignment", assignment_id))?;

    info!(
        assignment_id = %assignment_id,
        athlete_id = %actor.id,
        effort = ?perceived_effort,
        "workout completed"
    );
    Ok(row)
}
