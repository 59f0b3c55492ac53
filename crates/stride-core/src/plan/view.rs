//! Read-side views of stored plans.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use stride_db::models::{PlanDay, PlanExercise, PlanSession, WeeklyPlan};
use stride_db::queries::{assignments, plans};

use crate::actor::Actor;
use crate::calendar::project_session_date;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize)]
pub struct PlanDetail {
    pub plan: WeeklyPlan,
    pub days: Vec<DayDetail>,
    pub assignment_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayDetail {
    pub day: PlanDay,
    /// The date this day lands on once published.
    pub date: NaiveDate,
    pub sessions: Vec<SessionDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: PlanSession,
    pub exercises: Vec<PlanExercise>,
}

/// The acting coach's plans, most recent week first.
pub async fn list_plans(pool: &PgPool, actor: &Actor) -> EngineResult<Vec<WeeklyPlan>> {
    actor.require_coach("list plans")?;
    Ok(plans::list_plans_for_owner(pool, actor.id).await?)
}

/// Load a plan tree owned by the acting coach.
pub async fn plan_detail(pool: &PgPool, actor: &Actor, plan_id: Uuid) -> EngineResult<PlanDetail> {
    let plan = match plans::get_plan(pool, plan_id).await? {
        Some(p) if p.owner_id == actor.id => p,
        _ => return Err(EngineError::not_found("plan", plan_id)),
    };

    let days = plans::list_days(pool, plan_id).await?;
    let sessions = plans::list_sessions(pool, plan_id).await?;
    let exercises = plans::list_exercises(pool, plan_id).await?;
    let assignment_count = assignments::count_for_plan(pool, plan_id).await?;

    let mut details = Vec::with_capacity(days.len());
    for day in days {
        let date = project_session_date(
            plan.week_start_date,
            u8::try_from(day.day_of_week).unwrap_or(0),
        );
        let day_sessions = sessions
            .iter()
            .filter(|s| s.day_id == day.id)
            .map(|session| SessionDetail {
                session: session.clone(),
                exercises: exercises
                    .iter()
                    .filter(|e| e.session_id == session.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        details.push(DayDetail {
            day,
            date,
            sessions: day_sessions,
        });
    }

    Ok(PlanDetail {
        plan,
        days: details,
        assignment_count,
    })
}
