//! Database query functions for the `assigned_workouts` table.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{AssignedWorkout, SessionType};

/// An assignment joined with the plan session it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentWithSession {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub plan_session_id: Uuid,
    pub workout_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub athlete_notes: Option<String>,
    pub perceived_effort: Option<i16>,
    pub session_type: SessionType,
    pub title: Option<String>,
    pub location: Option<String>,
    pub plan_name: String,
}

/// Insert an assignment unless one already exists for
/// `(athlete_id, plan_session_id)`.
///
/// Returns `true` when a new row was written. An existing row is left
/// untouched, so re-running a publish never overwrites athlete progress.
pub async fn insert_if_absent(
    pool: &PgPool,
    athlete_id: Uuid,
    plan_session_id: Uuid,
    workout_date: NaiveDate,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO assigned_workouts (athlete_id, plan_session_id, workout_date) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (athlete_id, plan_session_id) DO NOTHING",
    )
    .bind(athlete_id)
    .bind(plan_session_id)
    .bind(workout_date)
    .execute(pool)
    .await
    .with_context(|| {
        format!("failed to insert assignment for athlete {athlete_id} session {plan_session_id}")
    })?;

    Ok(result.rows_affected() == 1)
}

/// Fetch an assignment by ID.
pub async fn get_assignment(pool: &PgPool, id: Uuid) -> Result<Option<AssignedWorkout>> {
    let row = sqlx::query_as::<_, AssignedWorkout>("SELECT * FROM assigned_workouts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch assignment")?;

    Ok(row)
}

/// All assignments derived from one plan session.
pub async fn list_for_session(pool: &PgPool, plan_session_id: Uuid) -> Result<Vec<AssignedWorkout>> {
    let rows = sqlx::query_as::<_, AssignedWorkout>(
        "SELECT * FROM assigned_workouts WHERE plan_session_id = $1 ORDER BY athlete_id",
    )
    .bind(plan_session_id)
    .fetch_all(pool)
    .await
    .context("failed to list assignments for session")?;

    Ok(rows)
}

/// An athlete's assignments with `from <= workout_date <= to`.
pub async fn list_for_athlete(
    pool: &PgPool,
    athlete_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AssignmentWithSession>> {
    let rows = sqlx::query_as::<_, AssignmentWithSession>(
        "SELECT a.id, a.athlete_id, a.plan_session_id, a.workout_date, a.completed, \
                a.completed_at, a.athlete_notes, a.perceived_effort, \
                s.session_type, s.title, s.location, p.name AS plan_name \
         FROM assigned_workouts a \
         JOIN plan_sessions s ON s.id = a.plan_session_id \
         JOIN plan_days d ON d.id = s.day_id \
         JOIN weekly_plans p ON p.id = d.plan_id \
         WHERE a.athlete_id = $1 AND a.workout_date BETWEEN $2 AND $3 \
         ORDER BY a.workout_date ASC, s.sort_order ASC",
    )
    .bind(athlete_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list assignments for athlete")?;

    Ok(rows)
}

/// Count assignments across every session of a plan.
pub async fn count_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assigned_workouts a \
         JOIN plan_sessions s ON s.id = a.plan_session_id \
         JOIN plan_days d ON d.id = s.day_id \
         WHERE d.plan_id = $1",
    )
    .bind(plan_id)
    .fetch_one(pool)
    .await
    .context("failed to count plan assignments")?;

    Ok(count)
}

/// Mark an assignment completed on behalf of its athlete.
///
/// The `athlete_id` guard means another athlete's assignment is reported as
/// missing (`None`). Notes and effort are overwritten only when provided;
/// `completed_at` keeps the first completion time.
pub async fn record_completion(
    pool: &PgPool,
    id: Uuid,
    athlete_id: Uuid,
    athlete_notes: Option<&str>,
    perceived_effort: Option<i16>,
) -> Result<Option<AssignedWorkout>> {
    let row = sqlx::query_as::<_, AssignedWorkout>(
        "UPDATE assigned_workouts \
         SET completed = true, \
             completed_at = COALESCE(completed_at, now()), \
             athlete_notes = COALESCE($3, athlete_notes), \
             perceived_effort = COALESCE($4, perceived_effort) \
         WHERE id = $1 AND athlete_id = $2 \
         RETURNING *",
    )
    .bind(id)
    .bind(athlete_id)
    .bind(athlete_notes)
    .bind(perceived_effort)
    .fetch_optional(pool)
    .await
    .context("failed to record assignment completion")?;

    Ok(row)
}
