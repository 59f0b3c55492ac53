//! Materializing dated sessions from training templates.
//!
//! Recurring generation walks the schedule's weekdays over a rolling
//! horizon and skips dates already generated. Each session is written with
//! its exercises and sets in its own small transaction, and sessions are
//! independent of each other: a failure leaves earlier sessions in place and
//! a rerun creates only what is missing.

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use stride_db::models::{
    Session, SessionExercise, SessionSet, TemplateExercise, TemplateSet, TrainingTemplate,
};
use stride_db::queries::{sessions, templates};

use crate::actor::Actor;
use crate::calendar::recurring_dates;
use crate::error::{EngineError, EngineResult};

use super::authoring::load_owned_template;

pub const DEFAULT_WEEKS_AHEAD: u32 = 4;
pub const MAX_WEEKS_AHEAD: u32 = 52;

/// Start time for one-off copies when neither the caller nor a schedule
/// provides one.
pub fn default_start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Everything copied from a template into each generated session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBlueprint {
    pub workout_type: String,
    pub duration_minutes: i32,
    pub intensity: Option<String>,
    pub focus: Option<String>,
    pub notes: Option<String>,
    pub exercises: Vec<BlueprintExercise>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintExercise {
    pub name: String,
    pub notes: Option<String>,
    pub sort_order: i32,
    pub sets: Vec<BlueprintSet>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlueprintSet {
    pub set_number: i32,
    pub reps: Option<i32>,
    pub weight: Option<f32>,
    pub rpe: Option<f32>,
}

impl SessionBlueprint {
    pub fn from_rows(
        template: &TrainingTemplate,
        exercises: &[TemplateExercise],
        sets: &[TemplateSet],
    ) -> Self {
        let exercises = exercises
            .iter()
            .map(|ex| BlueprintExercise {
                name: ex.name.clone(),
                notes: ex.notes.clone(),
                sort_order: ex.sort_order,
                sets: sets
                    .iter()
                    .filter(|s| s.template_exercise_id == ex.id)
                    .map(|s| BlueprintSet {
                        set_number: s.set_number,
                        reps: s.reps,
                        weight: s.weight,
                        rpe: s.rpe,
                    })
                    .collect(),
            })
            .collect();

        Self {
            workout_type: template.workout_type.clone(),
            duration_minutes: template.duration_minutes,
            intensity: template.intensity.clone(),
            focus: template.focus.clone(),
            notes: template.notes.clone(),
            exercises,
        }
    }

    /// `(start_at, end_at)` for a session on `date` starting at `start`.
    pub fn window(&self, date: NaiveDate, start: NaiveTime) -> (NaiveDateTime, NaiveDateTime) {
        let start_at = date.and_time(start);
        let end_at = start_at + Duration::minutes(i64::from(self.duration_minutes));
        (start_at, end_at)
    }
}

/// A session with its copied exercises and sets.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub exercises: Vec<SessionExerciseDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionExerciseDetail {
    pub exercise: SessionExercise,
    pub sets: Vec<SessionSet>,
}

async fn load_blueprint(pool: &PgPool, template: &TrainingTemplate) -> EngineResult<SessionBlueprint> {
    let exercises = templates::list_exercises(pool, template.id).await?;
    let sets = templates::list_sets(pool, template.id).await?;
    Ok(SessionBlueprint::from_rows(template, &exercises, &sets))
}

/// Write one session and its children atomically.
///
/// Returns `None` when a session for the same template and date already
/// exists; nothing is written in that case.
async fn materialize(
    pool: &PgPool,
    owner_id: Uuid,
    key: Option<(Uuid, NaiveDate)>,
    window: (NaiveDateTime, NaiveDateTime),
    blueprint: &SessionBlueprint,
) -> anyhow::Result<Option<Session>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let inserted = sessions::insert_session(
        &mut *tx,
        &sessions::NewSession {
            owner_id,
            template_id: key.map(|(id, _)| id),
            scheduled_date: key.map(|(_, date)| date),
            start_at: window.0,
            end_at: window.1,
            workout_type: &blueprint.workout_type,
            intensity: blueprint.intensity.as_deref(),
            focus: blueprint.focus.as_deref(),
            notes: blueprint.notes.as_deref(),
        },
    )
    .await?;

    let Some(session) = inserted else {
        return Ok(None);
    };

    for exercise in &blueprint.exercises {
        let row = sessions::insert_session_exercise(
            &mut *tx,
            session.id,
            &exercise.name,
            exercise.notes.as_deref(),
            exercise.sort_order,
        )
        .await?;
        for set in &exercise.sets {
            sessions::insert_session_set(
                &mut *tx,
                row.id,
                set.set_number,
                set.reps,
                set.weight,
                set.rpe,
            )
            .await?;
        }
    }

    tx.commit().await.context("failed to commit transaction")?;
    Ok(Some(session))
}

/// Generate sessions for every scheduled weekday in
/// `today..=today + weeks_ahead * 7`, skipping dates already generated.
///
/// `today` is the owner's local date. Returns only the sessions created by
/// this call; an empty list means there was nothing left to create.
pub async fn generate_from_template(
    pool: &PgPool,
    actor: &Actor,
    template_id: Uuid,
    weeks_ahead: u32,
    today: NaiveDate,
) -> EngineResult<Vec<Session>> {
    if !(1..=MAX_WEEKS_AHEAD).contains(&weeks_ahead) {
        return Err(EngineError::validation(format!(
            "weeks ahead must be between 1 and {MAX_WEEKS_AHEAD}, got {weeks_ahead}"
        )));
    }

    let template = load_owned_template(pool, actor, template_id).await?;
    let schedule = match templates::get_schedule(pool, template_id).await? {
        Some(s) if s.enabled && !s.weekdays.is_empty() => s,
        _ => return Err(EngineError::NoActiveSchedule(template_id)),
    };

    let weekdays: Vec<u8> = schedule
        .weekdays
        .iter()
        .filter_map(|d| u8::try_from(*d).ok())
        .collect();
    let candidates = recurring_dates(today, weeks_ahead, schedule.end_date, &weekdays);
    let (Some(first), Some(last)) = (candidates.first().copied(), candidates.last().copied())
    else {
        debug!(template_id = %template_id, "no dates in window");
        return Ok(Vec::new());
    };

    let existing = sessions::scheduled_dates_for_template(pool, template_id, first, last).await?;
    let remaining: Vec<NaiveDate> = candidates
        .into_iter()
        .filter(|d| !existing.contains(d))
        .collect();
    if remaining.is_empty() {
        debug!(template_id = %template_id, "all dates already generated");
        return Ok(Vec::new());
    }

    let blueprint = load_blueprint(pool, &template).await?;
    let mut created = Vec::with_capacity(remaining.len());
    for date in remaining {
        let window = blueprint.window(date, schedule.start_time);
        match materialize(pool, template.owner_id, Some((template_id, date)), window, &blueprint)
            .await
        {
            Ok(Some(session)) => created.push(session),
            Ok(None) => debug!(template_id = %template_id, %date, "generated concurrently"),
            Err(error) => {
                return Err(EngineError::Interrupted {
                    completed: created.len(),
                    error,
                });
            }
        }
    }

    info!(
        template_id = %template_id,
        weeks_ahead,
        created = created.len(),
        "sessions generated"
    );
    Ok(created)
}

/// Copy a template into a single session on `date`.
///
/// The copy is not linked to the template's schedule and never counts as a
/// generated date. `start_time` falls back to the schedule's start time,
/// then to 09:00.
pub async fn create_session_from_template(
    pool: &PgPool,
    actor: &Actor,
    template_id: Uuid,
    date: NaiveDate,
    start_time: Option<NaiveTime>,
) -> EngineResult<Session> {
    let template = load_owned_template(pool, actor, template_id).await?;

    let start = match start_time {
        Some(t) => t,
        None => templates::get_schedule(pool, template_id)
            .await?
            .map_or_else(default_start_time, |s| s.start_time),
    };

    let blueprint = load_blueprint(pool, &template).await?;
    let window = blueprint.window(date, start);
    let session = materialize(pool, template.owner_id, None, window, &blueprint)
        .await?
        .context("one-off session insert returned no row")?;

    info!(
        template_id = %template_id,
        session_id = %session.id,
        %date,
        "one-off session created"
    );
    Ok(session)
}

/// Load a session owned by the actor with its exercises and sets.
pub async fn session_detail(
    pool: &PgPool,
    actor: &Actor,
    session_id: Uuid,
) -> EngineResult<SessionDetail> {
    let session = match sessions::get_session(pool, session_id).await? {
        Some(s) if s.owner_id == actor.id => s,
        _ => return Err(EngineError::not_found("session", session_id)),
    };
    let exercises = sessions::list_session_exercises(pool, session_id).await?;
    let sets = sessions::list_session_sets(pool, session_id).await?;

    let exercises = exercises
        .into_iter()
        .map(|exercise| SessionExerciseDetail {
            sets: sets
                .iter()
                .filter(|s| s.session_exercise_id == exercise.id)
                .cloned()
                .collect(),
            exercise,
        })
        .collect();

    Ok(SessionDetail { session, exercises })
}
