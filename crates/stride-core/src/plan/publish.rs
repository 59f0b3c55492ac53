//! Publishing a draft plan: date projection, audience resolution, and
//! per-athlete assignment materialization.
//!
//! Assignments are written one at a time with insert-or-skip, not inside a
//! transaction. A failure leaves earlier assignments in place and a retry
//! fills in the rest without duplicating anything.

use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stride_db::models::{PlanStatus, ScheduledPlanSession, WeeklyPlan};
use stride_db::queries::{assignments, groups, plans, users};

use crate::actor::Actor;
use crate::calendar::project_session_date;
use crate::error::{EngineError, EngineResult};

/// Who receives a plan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Members of these groups.
    Groups(Vec<Uuid>),
    /// Every athlete linked to the coach.
    AllLinked,
    /// Authored for specific groups that resolved to none. Never widened to
    /// everyone.
    Nobody,
}

impl Audience {
    pub fn for_session(for_specific_groups: bool, target_group_ids: &[Uuid]) -> Self {
        if !target_group_ids.is_empty() {
            Self::Groups(target_group_ids.to_vec())
        } else if !for_specific_groups {
            Self::AllLinked
        } else {
            Self::Nobody
        }
    }
}

/// Result of [`publish_plan`].
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub plan: WeeklyPlan,
    /// Assignments created by this call. Rows that already existed are not
    /// counted.
    pub assignments_created: usize,
    /// Sessions authored for specific groups whose references resolved to no
    /// group, so nobody received them.
    pub unreachable_sessions: Vec<Uuid>,
}

/// Publish a draft plan owned by the acting coach.
pub async fn publish_plan(
    pool: &PgPool,
    actor: &Actor,
    plan_id: Uuid,
) -> EngineResult<PublishOutcome> {
    actor.require_coach("publish plans")?;

    let plan = match plans::get_plan(pool, plan_id).await? {
        Some(p) if p.owner_id == actor.id => p,
        _ => return Err(EngineError::not_found("plan", plan_id)),
    };
    if plan.status != PlanStatus::Draft {
        return Err(EngineError::AlreadyPublished(plan_id));
    }

    let sessions = plans::list_scheduled_sessions(pool, plan_id).await?;

    let mut linked: Option<Vec<Uuid>> = None;
    let mut created = 0usize;
    let mut unreachable = Vec::new();

    for session in &sessions {
        let athletes = match Audience::for_session(
            session.for_specific_groups,
            &session.target_group_ids,
        ) {
            Audience::Groups(ids) => groups::list_members(pool, &ids)
                .await
                .map_err(|error| interrupted(created, error))?,
            Audience::AllLinked => match &linked {
                Some(ids) => ids.clone(),
                None => {
                    let ids = users::list_linked_athletes(pool, actor.id)
                        .await
                        .map_err(|error| interrupted(created, error))?;
                    linked = Some(ids.clone());
                    ids
                }
            },
            Audience::Nobody => {
                warn!(
                    plan_id = %plan_id,
                    session_id = %session.id,
                    "session targets groups that resolved to none; skipping"
                );
                unreachable.push(session.id);
                continue;
            }
        };

        created += materialize_session(pool, &plan, session, &athletes, created).await?;
    }

    let flipped = plans::mark_published(pool, plan_id)
        .await
        .map_err(|error| interrupted(created, error))?;
    let plan = match flipped {
        Some(p) => p,
        None => {
            info!(plan_id = %plan_id, "plan was published concurrently");
            plans::get_plan(pool, plan_id)
                .await
                .map_err(|error| interrupted(created, error))?
                .ok_or_else(|| EngineError::not_found("plan", plan_id))?
        }
    };

    info!(
        plan_id = %plan_id,
        sessions = sessions.len(),
        assignments_created = created,
        unreachable = unreachable.len(),
        "plan published"
    );

    Ok(PublishOutcome {
        plan,
        assignments_created: created,
        unreachable_sessions: unreachable,
    })
}

/// Storage failed once materialization had started. `completed`
/// assignments are already committed.
fn interrupted(completed: usize, error: anyhow::Error) -> EngineError {
    EngineError::Interrupted { completed, error }
}

/// Insert-or-skip one assignment per athlete. `done_before` is the count
/// already created by this publish, reported if the loop is interrupted.
async fn materialize_session(
    pool: &PgPool,
    plan: &WeeklyPlan,
    session: &ScheduledPlanSession,
    athletes: &[Uuid],
    done_before: usize,
) -> EngineResult<usize> {
    let day = u8::try_from(session.day_of_week).unwrap_or(0);
    let workout_date = project_session_date(plan.week_start_date, day);

    let mut created = 0;
    for athlete_id in athletes {
        match assignments::insert_if_absent(pool, *athlete_id, session.id, workout_date).await {
            Ok(true) => created += 1,
            Ok(false) => {
                debug!(athlete_id = %athlete_id, session_id = %session.id, "assignment exists");
            }
            Err(error) => return Err(interrupted(done_before + created, error)),
        }
    }
    Ok(created)
}
