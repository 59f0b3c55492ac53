//! Database query functions for the `training_templates`,
//! `template_exercises`, `template_sets`, and `template_schedules` tables.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{TemplateExercise, TemplateSchedule, TemplateSet, TrainingTemplate};

/// Parameters for inserting a template row.
#[derive(Debug, Clone)]
pub struct NewTemplate<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub workout_type: &'a str,
    pub duration_minutes: i32,
    pub intensity: Option<&'a str>,
    pub focus: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Parameters for inserting or replacing a template's schedule.
#[derive(Debug, Clone)]
pub struct NewSchedule<'a> {
    pub template_id: Uuid,
    pub enabled: bool,
    pub weekdays: &'a [i16],
    pub start_time: NaiveTime,
    pub end_date: Option<NaiveDate>,
}

pub async fn insert_template(
    conn: &mut PgConnection,
    new: &NewTemplate<'_>,
) -> Result<TrainingTemplate> {
    let template = sqlx::query_as::<_, TrainingTemplate>(
        "INSERT INTO training_templates (owner_id, name, workout_type, duration_minutes, \
         intensity, focus, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING *",
    )
    .bind(new.owner_id)
    .bind(new.name)
    .bind(new.workout_type)
    .bind(new.duration_minutes)
    .bind(new.intensity)
    .bind(new.focus)
    .bind(new.notes)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert template {:?}", new.name))?;

    Ok(template)
}

pub async fn insert_exercise(
    conn: &mut PgConnection,
    template_id: Uuid,
    name: &str,
    notes: Option<&str>,
    sort_order: i32,
) -> Result<TemplateExercise> {
    let exercise = sqlx::query_as::<_, TemplateExercise>(
        "INSERT INTO template_exercises (template_id, name, notes, sort_order) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(template_id)
    .bind(name)
    .bind(notes)
    .bind(sort_order)
    .fetch_one(conn)
    .await
    .with_context(|| format!("failed to insert template exercise {name:?}"))?;

    Ok(exercise)
}

pub async fn insert_set(
    conn: &mut PgConnection,
    template_exercise_id: Uuid,
    set_number: i32,
    reps: Option<i32>,
    weight: Option<f32>,
    rpe: Option<f32>,
) -> Result<TemplateSet> {
    let set = sqlx::query_as::<_, TemplateSet>(
        "INSERT INTO template_sets (template_exercise_id, set_number, reps, weight, rpe) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(template_exercise_id)
    .bind(set_number)
    .bind(reps)
    .bind(weight)
    .bind(rpe)
    .fetch_one(conn)
    .await
    .context("failed to insert template set")?;

    Ok(set)
}

/// Fetch a template by ID.
pub async fn get_template(pool: &PgPool, id: Uuid) -> Result<Option<TrainingTemplate>> {
    let template =
        sqlx::query_as::<_, TrainingTemplate>("SELECT * FROM training_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch template")?;

    Ok(template)
}

/// List an owner's templates by name.
pub async fn list_templates_for_owner(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<TrainingTemplate>> {
    let templates = sqlx::query_as::<_, TrainingTemplate>(
        "SELECT * FROM training_templates WHERE owner_id = $1 ORDER BY name ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("failed to list templates")?;

    Ok(templates)
}

/// List a template's exercises in authoring order.
pub async fn list_exercises(pool: &PgPool, template_id: Uuid) -> Result<Vec<TemplateExercise>> {
    let exercises = sqlx::query_as::<_, TemplateExercise>(
        "SELECT * FROM template_exercises WHERE template_id = $1 ORDER BY sort_order ASC",
    )
    .bind(template_id)
    .fetch_all(pool)
    .await
    .context("failed to list template exercises")?;

    Ok(exercises)
}

/// List every set of every exercise of a template, ordered by set number.
pub async fn list_sets(pool: &PgPool, template_id: Uuid) -> Result<Vec<TemplateSet>> {
    let sets = sqlx::query_as::<_, TemplateSet>(
        "SELECT ts.* FROM template_sets ts \
         JOIN template_exercises te ON te.id = ts.template_exercise_id \
         WHERE te.template_id = $1 \
         ORDER BY te.sort_order ASC, ts.set_number ASC",
    )
    .bind(template_id)
    .fetch_all(pool)
    .await
    .context("failed to list template sets")?;

    Ok(sets)
}

/// Fetch the schedule attached to a template, if any.
pub async fn get_schedule(pool: &PgPool, template_id: Uuid) -> Result<Option<TemplateSchedule>> {
    let schedule = sqlx::query_as::<_, TemplateSchedule>(
        "SELECT * FROM template_schedules WHERE template_id = $1",
    )
    .bind(template_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch template schedule")?;

    Ok(schedule)
}

/// Insert a template's schedule, replacing any existing one.
pub async fn upsert_schedule(pool: &PgPool, new: &NewSchedule<'_>) -> Result<TemplateSchedule> {
    let schedule = sqlx::query_as::<_, TemplateSchedule>(
        "INSERT INTO template_schedules (template_id, enabled, weekdays, start_time, end_date) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (template_id) DO UPDATE \
         SET enabled = EXCLUDED.enabled, \
             weekdays = EXCLUDED.weekdays, \
             start_time = EXCLUDED.start_time, \
             end_date = EXCLUDED.end_date \
         RETURNING *",
    )
    .bind(new.template_id)
    .bind(new.enabled)
    .bind(new.weekdays)
    .bind(new.start_time)
    .bind(new.end_date)
    .fetch_one(pool)
    .await
    .context("failed to upsert template schedule")?;

    Ok(schedule)
}
