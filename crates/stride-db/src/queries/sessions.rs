//! Database query functions for the `sessions`, `session_exercises`, and
//! `session_sets` tables.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{Session, SessionExercise, SessionSet};

/// Parameters for inserting a session row.
///
/// `template_id` and `scheduled_date` are both set for sessions generated
/// from a recurring schedule and both unset for one-off copies.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub owner_id: Uuid,
    pub template_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub workout_type: &'a str,
    pub intensity: Option<&'a str>,
    pub focus: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// The subset of `[from, to]` for which a session generated from
/// `template_id` already exists.
pub async fn scheduled_dates_for_template(
    pool: &PgPool,
    template_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    let dates: Vec<NaiveDate> = sqlx::query_scalar(
        "SELECT scheduled_date FROM sessions \
         WHERE template_id = $1 AND scheduled_date BETWEEN $2 AND $3 \
         ORDER BY scheduled_date",
    )
    .bind(template_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list scheduled dates for template")?;

    Ok(dates)
}

/// Insert a session unless one already exists for
/// `(template_id, scheduled_date)`.
///
/// Returns `None` when the row was skipped. Rows with a NULL key never
/// conflict, so one-off copies always insert.
pub async fn insert_session(
    conn: &mut PgConnection,
    new: &NewSession<'_>,
) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        "INSERT INTO sessions (owner_id, template_id, scheduled_date, start_at, end_at, \
         workout_type, intensity, focus, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (template_id, scheduled_date) DO NOTHING \
         RETURNING *",
    )
    .bind(new.owner_id)
    .bind(new.template_id)
    .bind(new.scheduled_date)
    .bind(new.start_at)
    .bind(new.end_at)
    .bind(new.workout_type)
    .bind(new.intensity)
    .bind(new.focus)
    .bind(new.notes)
    .fetch_optional(conn)
    .await
    .with_context(|| format!("failed to insert session starting {}", new.start_at))?;

    Ok(session)
}

pub async fn insert_session_exercise(
    conn: &mut PgConnection,
    session_id: Uuid,
    name: &str,
    notes: Option<&str>,
    sort_order: i32,
) -> Result<SessionExercise> {
    let exercise = sqlx::query_as::<_, SessionExercise>(
        "INSERT INTO session_exercises (session_id, name, notes, sort_order) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(session_id)
    .bind(name)
    .bind(notes)
    .bind(sort_order)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert session exercise {name:?}"))?;

    Ok(exercise)
}

/// Insert a session set. `completed` always starts false.
pub async fn insert_session_set(
    conn: &mut PgConnection,
    session_exercise_id: Uuid,
    set_number: i32,
    reps: Option<i32>,
    weight: Option<f32>,
    rpe: Option<f32>,
) -> Result<SessionSet> {
    let set = sqlx::query_as::<_, SessionSet>(
        "INSERT INTO session_sets (session_exercise_id, set_number, reps, weight, rpe) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(session_exercise_id)
    .bind(set_number)
    .bind(reps)
    .bind(weight)
    .bind(rpe)
    .fetch_one(conn)
    .await
    .context("failed to insert session set")?;

    Ok(set)
}

/// Fetch a session by ID.
pub async fn get_session(pool: &PgPool, id: Uuid) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch session")?;

    Ok(session)
}

/// List an owner's sessions starting within `[from, to)`, earliest first.
pub async fn list_sessions_for_owner(
    pool: &PgPool,
    owner_id: Uuid,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions \
         WHERE owner_id = $1 AND start_at >= $2 AND start_at < $3 \
         ORDER BY start_at ASC",
    )
    .bind(owner_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
    .context("failed to list sessions")?;

    Ok(sessions)
}

/// Count the sessions generated from a template.
pub async fn count_for_template(pool: &PgPool, template_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE template_id = $1")
        .bind(template_id)
        .fetch_one(pool)
        .await
        .context("failed to count template sessions")?;

    Ok(count)
}

pub async fn list_session_exercises(
    pool: &PgPool,
    session_id: Uuid,
) -> Result<Vec<SessionExercise>> {
    let exercises = sqlx::query_as::<_, SessionExercise>(
        "SELECT * FROM session_exercises WHERE session_id = $1 ORDER BY sort_order ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
    .context("failed to list session exercises")?;

    Ok(exercises)
}

/// List every set of a session, in exercise then set order.
pub async fn list_session_sets(pool: &PgPool, session_id: Uuid) -> Result<Vec<SessionSet>> {
    let sets = sqlx::query_as::<_, SessionSet>(
        "SELECT ss.* FROM session_sets ss \
         JOIN session_exercises se ON se.id = ss.session_exercise_id \
         WHERE se.session_id = $1 \
         ORDER BY se.sort_order ASC, ss.set_number ASC",
    )
    .bind(session_id)
    .fetch_all(pool)
    .await
    .context("failed to list session sets")?;

    Ok(sets)
}
