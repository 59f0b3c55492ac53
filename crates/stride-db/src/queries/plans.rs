//! Database query functions for the `weekly_plans`, `plan_days`,
//! `plan_sessions`, and `plan_exercises` tables.
//!
//! The insert functions take a `&mut PgConnection` so the plan builder can
//! write a whole tree inside one transaction.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    PlanDay, PlanExercise, PlanSession, ScheduledPlanSession, SessionType, WeeklyPlan,
};

/// Parameters for inserting a plan row.
#[derive(Debug, Clone)]
pub struct NewPlan<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub week_start_date: NaiveDate,
    pub source_text: Option<&'a str>,
}

/// Parameters for inserting a plan session row.
#[derive(Debug, Clone)]
pub struct NewPlanSession<'a> {
    pub day_id: Uuid,
    pub session_type: SessionType,
    pub title: Option<&'a str>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<&'a str>,
    pub is_optional: bool,
    pub sort_order: i32,
    pub for_specific_groups: bool,
    pub target_group_ids: &'a [Uuid],
}

/// Parameters for inserting a plan exercise row.
#[derive(Debug, Clone)]
pub struct NewPlanExercise<'a> {
    pub session_id: Uuid,
    pub name: &'a str,
    pub details: Option<&'a str>,
    pub sort_order: i32,
    pub for_specific_groups: bool,
    pub target_group_ids: &'a [Uuid],
}

/// Insert a plan in `draft` status.
pub async fn insert_plan(conn: &mut PgConnection, new: &NewPlan<'_>) -> Result<WeeklyPlan> {
    let plan = sqlx::query_as::<_, WeeklyPlan>(
        "INSERT INTO weekly_plans (owner_id, name, week_start_date, source_text) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.owner_id)
    .bind(new.name)
    .bind(new.week_start_date)
    .bind(new.source_text)
    .fetch_one(conn)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Insert a day slot for a plan.
pub async fn insert_day(
    conn: &mut PgConnection,
    plan_id: Uuid,
    day_of_week: i16,
    is_off_day: bool,
) -> Result<PlanDay> {
    let day = sqlx::query_as::<_, PlanDay>(
        "INSERT INTO plan_days (plan_id, day_of_week, is_off_day) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(day_of_week)
    .bind(is_off_day)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert plan day {day_of_week}"))?;

    Ok(day)
}

pub async fn insert_session(
    conn: &mut PgConnection,
    new: &NewPlanSession<'_>,
) -> Result<PlanSession> {
    let session = sqlx::query_as::<_, PlanSession>(
        "INSERT INTO plan_sessions (day_id, session_type, title, start_time, end_time, location, \
         is_optional, sort_order, for_specific_groups, target_group_ids) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING *",
    )
    .bind(new.day_id)
    .bind(new.session_type)
    .bind(new.title)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.location)
    .bind(new.is_optional)
    .bind(new.sort_order)
    .bind(new.for_specific_groups)
    .bind(new.target_group_ids)
    .fetch_one(conn)
    .await
    .context("failed to insert plan session")?;

    Ok(session)
}

pub async fn insert_exercise(
    conn: &mut PgConnection,
    new: &NewPlanExercise<'_>,
) -> Result<PlanExercise> {
    let exercise = sqlx::query_as::<_, PlanExercise>(
        "INSERT INTO plan_exercises (session_id, name, details, sort_order, \
         for_specific_groups, target_group_ids) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.session_id)
    .bind(new.name)
    .bind(new.details)
    .bind(new.sort_order)
    .bind(new.for_specific_groups)
    .bind(new.target_group_ids)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert plan exercise {:?}", new.name))?;

    Ok(exercise)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<WeeklyPlan>> {
    let plan = sqlx::query_as::<_, WeeklyPlan>("SELECT * FROM weekly_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List an owner's plans, most recent week first.
pub async fn list_plans_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<WeeklyPlan>> {
    let plans = sqlx::query_as::<_, WeeklyPlan>(
        "SELECT * FROM weekly_plans WHERE owner_id = $1 \
         ORDER BY week_start_date DESC, created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("failed to list plans")?;

    Ok(plans)
}

/// List the day slots of a plan, in weekday order.
pub async fn list_days(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanDay>> {
    let days = sqlx::query_as::<_, PlanDay>(
        "SELECT * FROM plan_days WHERE plan_id = $1 ORDER BY day_of_week ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list plan days")?;

    Ok(days)
}

/// List every session of a plan, in day then authoring order.
pub async fn list_sessions(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanSession>> {
    let sessions = sqlx::query_as::<_, PlanSession>(
        "SELECT s.* FROM plan_sessions s \
         JOIN plan_days d ON d.id = s.day_id \
         WHERE d.plan_id = $1 \
         ORDER BY d.day_of_week ASC, s.sort_order ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list plan sessions")?;

    Ok(sessions)
}

/// List every session of a plan together with its day's weekday.
pub async fn list_scheduled_sessions(
    pool: &PgPool,
    plan_id: Uuid,
) -> Result<Vec<ScheduledPlanSession>> {
    let sessions = sqlx::query_as::<_, ScheduledPlanSession>(
        "SELECT s.id, d.day_of_week, s.session_type, s.title, \
                s.for_specific_groups, s.target_group_ids \
         FROM plan_sessions s \
         JOIN plan_days d ON d.id = s.day_id \
         WHERE d.plan_id = $1 \
         ORDER BY d.day_of_week ASC, s.sort_order ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list scheduled plan sessions")?;

    Ok(sessions)
}

/// List every exercise of a plan, in session then authoring order.
pub async fn list_exercises(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanExercise>> {
    let exercises = sqlx::query_as::<_, PlanExercise>(
        "SELECT e.* FROM plan_exercises e \
         JOIN plan_sessions s ON s.id = e.session_id \
         JOIN plan_days d ON d.id = s.day_id \
         WHERE d.plan_id = $1 \
         ORDER BY d.day_of_week ASC, s.sort_order ASC, e.sort_order ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list plan exercises")?;

    Ok(exercises)
}

/// Transition a plan from `draft` to `published`, setting `published_at`.
///
/// Returns `None` when the plan was not in `draft` (already flipped by a
/// concurrent publisher, or missing).
pub async fn mark_published(pool: &PgPool, id: Uuid) -> Result<Option<WeeklyPlan>> {
    let plan = sqlx::query_as::<_, WeeklyPlan>(
        "UPDATE weekly_plans \
         SET status = 'published', published_at = now() \
         WHERE id = $1 AND status = 'draft' \
         RETURNING *",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to publish plan")?;

    Ok(plan)
}
