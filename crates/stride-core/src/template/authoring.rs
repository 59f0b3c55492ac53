//! Creating training templates and attaching their recurring schedules.

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use stride_db::models::{TemplateExercise, TemplateSchedule, TemplateSet, TrainingTemplate};
use stride_db::queries::templates;

use crate::actor::Actor;
use crate::error::{EngineError, EngineResult};

use super::toml_format::{TemplateParseError, TemplateToml};

/// A template's weekly recurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub enabled: bool,
    /// Weekday indices, `0 = Sunday`.
    pub weekdays: Vec<u8>,
    pub start_time: NaiveTime,
    /// Inclusive.
    pub end_date: Option<NaiveDate>,
}

impl ScheduleSpec {
    /// Validate weekday indices and return them sorted with duplicates
    /// removed.
    pub fn normalized_weekdays(&self) -> EngineResult<Vec<u8>> {
        if let Some(bad) = self.weekdays.iter().find(|d| **d > 6) {
            return Err(EngineError::validation(format!(
                "weekday {bad} out of range (expected 0-6)"
            )));
        }
        let mut days = self.weekdays.clone();
        days.sort_unstable();
        days.dedup();
        if self.enabled && days.is_empty() {
            return Err(EngineError::validation(
                "an enabled schedule needs at least one weekday",
            ));
        }
        Ok(days)
    }
}

/// A template with its exercises, sets and schedule.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDetail {
    pub template: TrainingTemplate,
    pub exercises: Vec<TemplateExerciseDetail>,
    pub schedule: Option<TemplateSchedule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateExerciseDetail {
    pub exercise: TemplateExercise,
    pub sets: Vec<TemplateSet>,
}

/// Fetch a template owned by the actor, hiding other owners' templates.
pub(crate) async fn load_owned_template(
    pool: &PgPool,
    actor: &Actor,
    template_id: Uuid,
) -> EngineResult<TrainingTemplate> {
    match templates::get_template(pool, template_id).await? {
        Some(t) if t.owner_id == actor.id => Ok(t),
        _ => Err(EngineError::not_found("template", template_id)),
    }
}

/// Persist a template, its exercises and sets in one transaction, then
/// attach the schedule if the definition has one.
pub async fn create_template(
    pool: &PgPool,
    actor: &Actor,
    def: &TemplateToml,
) -> EngineResult<TemplateDetail> {

    let meta = &def.template;
    if meta.name.trim().is_empty() {
        return Err(TemplateParseError::BlankName.into());
    }
    if meta.duration_minutes <= 0 {
        return Err(TemplateParseError::InvalidDuration(meta.duration_minutes).into());
    }
    let schedule_spec = match &def.schedule {
        Some(s) => Some(ScheduleSpec {
            enabled: s.enabled,
            weekdays: s.weekday_indices()?,
            start_time: s.start_time()?,
            end_date: s.end_date,
        }),
        None => None,
    };

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let template = templates::insert_template(
        &mut *tx,
        &templates::NewTemplate {
            owner_id: actor.id,
            name: meta.name.trim(),
            workout_type: meta.workout_type.trim(),
            duration_minutes: meta.duration_minutes,
            intensity: meta.intensity.as_deref(),
            focus: meta.focus.as_deref(),
            notes: meta.notes.as_deref(),
        },
    )
    .await?;

    let mut exercises = Vec::with_capacity(def.exercises.len());
    for (idx, ex) in def.exercises.iter().enumerate() {
        let name = ex.name.trim();
        if name.is_empty() {
            return Err(TemplateParseError::BlankExerciseName(idx + 1).into());
        }
        let exercise = templates::insert_exercise(
            &mut *tx,
            template.id,
            name,
            ex.notes.as_deref(),
            idx as i32,
        )
        .await?;

        let mut sets = Vec::with_capacity(ex.sets.len());
        for (set_idx, set) in ex.sets.iter().enumerate() {
            let row = templates::insert_set(
                &mut *tx,
                exercise.id,
                set_idx as i32 + 1,
                set.reps,
                set.weight,
                set.rpe,
            )
            .await?;
            sets.push(row);
        }
        exercises.push(TemplateExerciseDetail { exercise, sets });
    }

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        template_id = %template.id,
        exercises = exercises.len(),
        "template created"
    );

    let schedule = match schedule_spec {
        Some(spec) => Some(set_schedule(pool, actor, template.id, &spec).await?),
        None => None,
    };

    Ok(TemplateDetail {
        template,
        exercises,
        schedule,
    })
}

/// Attach or replace the schedule of a template owned by the actor.
pub async fn set_schedule(
    pool: &PgPool,
    actor: &Actor,
    template_id: Uuid,
    spec: &ScheduleSpec,
) -> EngineResult<TemplateSchedule> {
    load_owned_template(pool, actor, template_id).await?;

    let weekdays: Vec<i16> = spec
        .normalized_weekdays()?
        .into_iter()
        .map(i16::from)
        .collect();

    let schedule = templates::upsert_schedule(
        pool,
        &templates::NewSchedule {
            template_id,
            enabled: spec.enabled,
            weekdays: &weekdays,
            start_time: spec.start_time,
            end_date: spec.end_date,
        },
    )
    .await?;

    info!(
        template_id = %template_id,
        enabled = schedule.enabled,
        weekdays = ?schedule.weekdays,
        "template schedule set"
    );
    Ok(schedule)
}

/// Templates owned by the actor, coach or athlete, by name.
pub async fn list_templates(pool: &PgPool, actor: &Actor) -> EngineResult<Vec<TrainingTemplate>> {
    Ok(templates::list_templates_for_owner(pool, actor.id).await?)
}

pub async fn template_detail(
    pool: &PgPool,
    actor: &Actor,
    template_id: Uuid,
) -> EngineResult<TemplateDetail> {
    let template = load_owned_template(pool, actor, template_id).await?;
    let exercises = templates::list_exercises(pool, template_id).await?;
    let sets = templates::list_sets(pool, template_id).await?;
    let schedule = templates::get_schedule(pool, template_id).await?;

    let exercises = exercises
        .into_iter()
        .map(|exercise| TemplateExerciseDetail {
            sets: sets
                .iter()
                .filter(|s| s.template_exercise_id == exercise.id)
                .cloned()
                .collect(),
            exercise,
        })
        .collect();

    Ok(TemplateDetail {
        template,
        exercises,
        schedule,
    })
}
