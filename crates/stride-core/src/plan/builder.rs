//! Plan tree builder.
//!
//! Validation and audience resolution happen in [`prepare`], which touches
//! no storage. [`build_plan`] then writes the prepared tree in a single
//! transaction, so a plan is either stored whole or not at all.

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use stride_db::models::{SessionType, WeeklyPlan};
use stride_db::queries::{groups, plans};

use crate::actor::Actor;
use crate::alias::{AliasTable, AliasVocabulary, names_groups};
use crate::calendar::{parse_clock_time, parse_weekday_name};
use crate::error::{EngineError, EngineResult};

use super::parsed::ParsedPlan;

/// Input to [`build_plan`].
#[derive(Debug, Clone)]
pub struct BuildPlanRequest {
    pub week_start_date: Option<NaiveDate>,
    pub plan: ParsedPlan,
    /// Defaults to `Week of YYYY-MM-DD`.
    pub name: Option<String>,
    pub source_text: Option<String>,
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuiltPlan {
    pub plan: WeeklyPlan,
    pub days: usize,
    pub sessions: usize,
    pub exercises: usize,
    /// Group references that matched none of the coach's groups.
    pub unresolved_tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTree {
    pub days: Vec<PreparedDay>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDay {
    pub day_of_week: u8,
    pub is_off_day: bool,
    pub sessions: Vec<PreparedSession>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSession {
    pub session_type: SessionType,
    pub title: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub is_optional: bool,
    pub for_specific_groups: bool,
    pub target_group_ids: Vec<Uuid>,
    pub exercises: Vec<PreparedExercise>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExercise {
    pub name: String,
    pub details: Option<String>,
    pub for_specific_groups: bool,
    pub target_group_ids: Vec<Uuid>,
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn lenient_time(label: &'static str, raw: Option<&String>) -> Option<NaiveTime> {
    let raw = raw.map(|s| s.trim()).filter(|s| !s.is_empty())?;
    let parsed = parse_clock_time(raw);
    if parsed.is_none() {
        warn!(field = label, value = raw, "unparseable time left unset");
    }
    parsed
}

fn resolve_audience(
    tokens: Option<&Vec<String>>,
    table: &AliasTable,
    unresolved: &mut Vec<String>,
) -> (bool, Vec<Uuid>) {
    let tokens = tokens.map(Vec::as_slice);
    if !names_groups(tokens) {
        return (false, Vec::new());
    }
    let resolution = table.resolve(tokens.unwrap_or_default());
    for token in resolution.unresolved {
        if !unresolved.contains(&token) {
            unresolved.push(token);
        }
    }
    (true, resolution.group_ids)
}

/// Validate parser output and resolve every group reference.
///
/// Fails on an empty day list, an unknown weekday name, or a blank exercise
/// name. Unresolved group references never fail; they are collected in
/// [`PreparedTree::unresolved`].
pub fn prepare(plan: &ParsedPlan, table: &AliasTable) -> EngineResult<PreparedTree> {
    if plan.days.is_empty() {
        return Err(EngineError::validation("plan has no days"));
    }

    let mut unresolved = Vec::new();
    let mut days = Vec::with_capacity(plan.days.len());

    for day in &plan.days {
        let day_of_week = parse_weekday_name(&day.day_of_week).ok_or_else(|| {
            EngineError::validation(format!("unknown weekday {:?}", day.day_of_week))
        })?;

        let mut sessions = Vec::with_capacity(day.sessions.len());
        for session in &day.sessions {
            let (for_specific_groups, target_group_ids) =
                resolve_audience(session.for_groups.as_ref(), table, &mut unresolved);

            let mut exercises = Vec::with_capacity(session.exercises.len());
            for exercise in &session.exercises {
                let name = exercise.name.trim();
                if name.is_empty() {
                    return Err(EngineError::validation(format!(
                        "exercise with blank name on {}",
                        day.day_of_week
                    )));
                }
                let (for_specific_groups, target_group_ids) =
                    resolve_audience(exercise.for_groups.as_ref(), table, &mut unresolved);
                exercises.push(PreparedExercise {
                    name: name.to_string(),
                    details: non_blank(exercise.details.as_ref()),
                    for_specific_groups,
                    target_group_ids,
                });
            }

            sessions.push(PreparedSession {
                session_type: session.session_type,
                title: non_blank(session.title.as_ref()),
                start_time: lenient_time("startTime", session.start_time.as_ref()),
                end_time: lenient_time("endTime", session.end_time.as_ref()),
                location: non_blank(session.location.as_ref()),
                is_optional: session.is_optional,
                for_specific_groups,
                target_group_ids,
                exercises,
            });
        }

        days.push(PreparedDay {
            day_of_week,
            is_off_day: day.is_off_day,
            sessions,
        });
    }

    Ok(PreparedTree { days, unresolved })
}

/// Persist a draft plan tree for the acting coach.
pub async fn build_plan(
    pool: &PgPool,
    vocabulary: &dyn AliasVocabulary,
    actor: &Actor,
    request: &BuildPlanRequest,
) -> EngineResult<BuiltPlan> {
    actor.require_coach("build plans")?;
    let week_start_date = request
        .week_start_date
        .ok_or_else(|| EngineError::validation("week start date is required"))?;

    let owned_groups = groups::list_groups(pool, actor.id).await?;
    let table = AliasTable::build(&owned_groups, vocabulary);
    let tree = prepare(&request.plan, &table)?;

    let name = non_blank(request.name.as_ref())
        .unwrap_or_else(|| format!("Week of {}", week_start_date.format("%Y-%m-%d")));

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = plans::insert_plan(
        &mut *tx,
        &plans::NewPlan {
            owner_id: actor.id,
            name: &name,
            week_start_date,
            source_text: request.source_text.as_deref(),
        },
    )
    .await?;

    let mut session_count = 0;
    let mut exercise_count = 0;
    for day in &tree.days {
        let day_row =
            plans::insert_day(&mut *tx, plan.id, i16::from(day.day_of_week), day.is_off_day)
                .await?;

        for (s_idx, session) in day.sessions.iter().enumerate() {
            let session_row = plans::insert_session(
                &mut *tx,
                &plans::NewPlanSession {
                    day_id: day_row.id,
                    session_type: session.session_type,
                    title: session.title.as_deref(),
                    start_time: session.start_time,
                    end_time: session.end_time,
                    location: session.location.as_deref(),
                    is_optional: session.is_optional,
                    sort_order: s_idx as i32,
                    for_specific_groups: session.for_specific_groups,
                    target_group_ids: &session.target_group_ids,
                },
            )
            .await?;
            session_count += 1;

            for (e_idx, exercise) in session.exercises.iter().enumerate() {
                plans::insert_exercise(
                    &mut *tx,
                    &plans::NewPlanExercise {
                        session_id: session_row.id,
                        name: &exercise.name,
                        details: exercise.details.as_deref(),
                        sort_order: e_idx as i32,
                        for_specific_groups: exercise.for_specific_groups,
                        target_group_ids: &exercise.target_group_ids,
                    },
                )
                .await?;
                exercise_count += 1;
            }
        }
    }

    tx.commit().await.context("failed to commit transaction")?;

    if !tree.unresolved.is_empty() {
        warn!(
            plan_id = %plan.id,
            tokens = ?tree.unresolved,
            "group references matched no group"
        );
    }
    info!(
        plan_id = %plan.id,
        days = tree.days.len(),
        sessions = session_count,
        exercises = exercise_count,
        "plan built"
    );

    Ok(BuiltPlan {
        plan,
        days: tree.days.len(),
        sessions: session_count,
        exercises: exercise_count,
        unresolved_tokens: tree.unresolved,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use stride_db::models::AthleteGroup;

    use super::*;
    use crate::alias::TrackAndFieldVocabulary;
    use crate::plan::parsed::{ParsedDay, ParsedExercise, ParsedSession};

    fn group(slug: &str) -> AthleteGroup {
        AthleteGroup {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: slug.replace('-', " "),
            slug: slug.to_string(),
            color: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn session(for_groups: Option<Vec<&str>>, exercises: Vec<ParsedExercise>) -> ParsedSession {
        ParsedSession {
            session_type: SessionType::Practice,
            title: Some("  Speed  ".to_string()),
            start_time: Some("3:30pm".to_string()),
            end_time: Some("whenever".to_string()),
            location: Some(" ".to_string()),
            is_optional: false,
            for_groups: for_groups.map(|g| g.into_iter().map(String::from).collect()),
            exercises,
        }
    }

    fn exercise(name: &str, for_groups: Option<Vec<&str>>) -> ParsedExercise {
        ParsedExercise {
            name: name.to_string(),
            details: Some("@ 90%".to_string()),
            for_groups: for_groups.map(|g| g.into_iter().map(String::from).collect()),
        }
    }

    fn day(name: &str, sessions: Vec<ParsedSession>) -> ParsedDay {
        ParsedDay {
            day_of_week: name.to_string(),
            is_off_day: false,
            sessions,
        }
    }

    #[test]
    fn empty_plan_is_rejected() {
        let table = AliasTable::default();
        let err = prepare(&ParsedPlan { days: vec![] }, &table).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        let table = AliasTable::default();
        let plan = ParsedPlan {
            days: vec![day("Someday", vec![])],
        };
        let err = prepare(&plan, &table).unwrap_err();
        assert!(err.to_string().contains("Someday"));
    }

    #[test]
    fn blank_exercise_name_is_rejected() {
        let table = AliasTable::default();
        let plan = ParsedPlan {
            days: vec![day("Mon", vec![session(None, vec![exercise("  ", None)])])],
        };
        assert!(matches!(
            prepare(&plan, &table),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn resolves_audiences_and_collects_misses() {
        let ls = group("long-sprints");
        let table = AliasTable::build(std::slice::from_ref(&ls), &TrackAndFieldVocabulary);
        let plan = ParsedPlan {
            days: vec![day(
                "Wednesday",
                vec![
                    session(
                        Some(vec!["LS"]),
                        vec![exercise("3x300", None), exercise("Bounds", Some(vec!["Jumpers"]))],
                    ),
                    session(Some(vec!["", " "]), vec![]),
                    session(Some(vec!["Throwers"]), vec![]),
                ],
            )],
        };

        let tree = prepare(&plan, &table).unwrap();
        let wed = &tree.days[0];
        assert_eq!(wed.day_of_week, 3);

        let first = &wed.sessions[0];
        assert!(first.for_specific_groups);
        assert_eq!(first.target_group_ids, vec![ls.id]);
        assert!(!first.exercises[0].for_specific_groups);
        assert!(first.exercises[1].for_specific_groups);
        assert!(first.exercises[1].target_group_ids.is_empty());

        // Blank-only tokens mean everyone.
        assert!(!wed.sessions[1].for_specific_groups);

        // Unresolved: flagged for groups but no targets.
        assert!(wed.sessions[2].for_specific_groups);
        assert!(wed.sessions[2].target_group_ids.is_empty());

        assert_eq!(tree.unresolved, vec!["jumpers".to_string(), "throwers".to_string()]);
    }

    #[test]
    fn text_fields_are_trimmed_and_times_parsed_leniently() {
        let table = AliasTable::default();
        let plan = ParsedPlan {
            days: vec![day("fri", vec![session(None, vec![])])],
        };
        let tree = prepare(&plan, &table).unwrap();
        let s = &tree.days[0].sessions[0];
        assert_eq!(s.title.as_deref(), Some("Speed"));
        assert_eq!(s.location, None);
        assert_eq!(s.start_time, NaiveTime::from_hms_opt(15, 30, 0));
        assert_eq!(s.end_time, None);
    }
}
