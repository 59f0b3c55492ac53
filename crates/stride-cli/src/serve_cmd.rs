use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use stride_core::EngineError;
use stride_core::actor::Actor;
use stride_core::alias::TrackAndFieldVocabulary;
use stride_core::calendar::parse_clock_time;
use stride_core::plan::{
    BuildPlanRequest, ParsedPlan, build_plan, list_plans, plan_detail, publish_plan,
};
use stride_core::template::{create_session_from_template, generate_from_template};
use stride_core::workouts::{complete_workout, list_assigned_workouts};
use stride_db::models::WeeklyPlan;

use crate::workout_cmds::default_range;

/// Header carrying the acting user's ID.
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Horizon used by generate requests that do not name one.
    pub weeks_ahead: u32,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Forbidden { .. } => StatusCode::FORBIDDEN,
            EngineError::AlreadyPublished(_) | EngineError::NoActiveSchedule(_) => {
                StatusCode::CONFLICT
            }
            EngineError::Interrupted { .. } | EngineError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %format!("{err:#}"), "request failed");
        }
        Self {
            status,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Acting user
// ---------------------------------------------------------------------------

/// The user named by the `x-actor-id` header, loaded from the users table.
pub struct ActingUser(pub Actor);

impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("missing {ACTOR_HEADER} header")))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::unauthorized(format!("{ACTOR_HEADER} is not a user ID")))?;

        match Actor::load(&state.pool, id).await {
            Ok(actor) => Ok(Self(actor)),
            Err(EngineError::NotFound { .. }) => {
                Err(AppError::unauthorized(format!("unknown user {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BuildPlanBody {
    pub week_start_date: Option<NaiveDate>,
    pub name: Option<String>,
    pub source_text: Option<String>,
    pub plan: ParsedPlan,
}

#[derive(Debug, Serialize)]
pub struct BuiltPlanResponse {
    #[serde(flatten)]
    pub plan: WeeklyPlan,
    pub days: usize,
    pub sessions: usize,
    pub exercises: usize,
    pub unresolved_tokens: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    #[serde(flatten)]
    pub plan: WeeklyPlan,
    pub assignments_created: usize,
    pub unreachable_sessions: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
    pub weeks_ahead: Option<u32>,
    /// The coach's local date. Defaults to the server's.
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct OneOffBody {
    pub date: NaiveDate,
    pub start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompleteBody {
    pub notes: Option<String>,
    pub perceived_effort: Option<i16>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/plans", get(list_plans_handler).post(build_plan_handler))
        .route("/api/plans/{id}", get(plan_detail_handler))
        .route("/api/plans/{id}/publish", post(publish_handler))
        .route("/api/templates/{id}/generate", post(generate_handler))
        .route("/api/templates/{id}/sessions", post(one_off_handler))
        .route("/api/workouts", get(list_workouts_handler))
        .route("/api/workouts/{id}/complete", post(complete_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, weeks_ahead: u32, bind: &str, port: u16) -> Result<()> {
    let app = build_router(AppState { pool, weeks_ahead });
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("stride serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("stride serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_plans_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
) -> Result<axum::response::Response, AppError> {
    let plans = list_plans(&state.pool, &actor).await?;
    Ok(Json(plans).into_response())
}

async fn build_plan_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Json(body): Json<BuildPlanBody>,
) -> Result<axum::response::Response, AppError> {
    let request = BuildPlanRequest {
        week_start_date: body.week_start_date,
        plan: body.plan,
        name: body.name,
        source_text: body.source_text,
    };
    let built = build_plan(&state.pool, &TrackAndFieldVocabulary, &actor, &request).await?;

    let response = BuiltPlanResponse {
        plan: built.plan,
        days: built.days,
        sessions: built.sessions,
        exercises: built.exercises,
        unresolved_tokens: built.unresolved_tokens,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn plan_detail_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let detail = plan_detail(&state.pool, &actor, id).await?;
    Ok(Json(detail).into_response())
}

async fn publish_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<axum::response::Response, AppError> {
    let outcome = publish_plan(&state.pool, &actor, id).await?;
    Ok(Json(PublishResponse {
        plan: outcome.plan,
        assignments_created: outcome.assignments_created,
        unreachable_sessions: outcome.unreachable_sessions,
    })
    .into_response())
}

async fn generate_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Json(body): Json<GenerateBody>,
) -> Result<axum::response::Response, AppError> {
    let weeks = body.weeks_ahead.unwrap_or(state.weeks_ahead);
    let today = body
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let created = generate_from_template(&state.pool, &actor, id, weeks, today).await?;
    Ok(Json(created).into_response())
}

async fn one_off_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Json(body): Json<OneOffBody>,
) -> Result<axum::response::Response, AppError> {
    let start_time = match body.start_time.as_deref() {
        Some(raw) => Some(parse_clock_time(raw).ok_or_else(|| {
            EngineError::validation(format!("invalid start time: {raw:?}"))
        })?),
        None => None,
    };
    let session =
        create_session_from_template(&state.pool, &actor, id, body.date, start_time).await?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

async fn list_workouts_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Query(range): Query<RangeQuery>,
) -> Result<axum::response::Response, AppError> {
    let (from, to) = default_range(chrono::Local::now().date_naive(), range.from, range.to);
    let rows = list_assigned_workouts(&state.pool, &actor, from, to).await?;
    Ok(Json(rows).into_response())
}

async fn complete_handler(
    State(state): State<AppState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteBody>,
) -> Result<axum::response::Response, AppError> {
    let row = complete_workout(
        &state.pool,
        &actor,
        id,
        body.notes.as_deref(),
        body.perceived_effort,
    )
    .await?;
    Ok(Json(row).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use stride_core::actor::Actor;
    use stride_core::template::{create_template, parse_template_toml};
    use stride_db::models::Role;
    use stride_test_utils::{create_test_db, drop_test_db, seed_athlete, seed_coach, seed_group};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn send(
        pool: PgPool,
        method: &str,
        uri: &str,
        actor: Option<Uuid>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let app = super::build_router(super::AppState {
            pool,
            weeks_ahead: 4,
        });
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(id) = actor {
            req = req.header(super::ACTOR_HEADER, id.to_string());
        }
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        app.oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const TEMPO: &str = r#"
[template]
name = "Tempo"
type = "conditioning"
duration_minutes = 60

[[exercises]]
name = "Tempo 200s"

[[exercises.sets]]
reps = 8

[schedule]
weekdays = ["mon", "wed", "fri"]
start_time = "09:00"
"#;

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn requests_without_a_known_actor_are_unauthorized() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(pool.clone(), "GET", "/api/plans", None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("x-actor-id"));

        let resp = send(pool.clone(), "GET", "/api/plans", Some(Uuid::new_v4()), None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn coach_builds_and_publishes_then_athlete_completes() {
        let (pool, db_name) = create_test_db().await;
        let coach = seed_coach(&pool, "coach").await;
        let sprinter = seed_athlete(&pool, coach.id, "sprinter").await;
        let thrower = seed_athlete(&pool, coach.id, "thrower").await;
        seed_group(&pool, coach.id, "Long Sprints", "long-sprints", &[sprinter.id]).await;

        let body = json!({
            "week_start_date": "2024-06-02",
            "name": "Speed week",
            "plan": {
                "days": [{
                    "dayOfWeek": "Wednesday",
                    "sessions": [{"type": "practice", "title": "Speed", "forGroups": ["LS"]}]
                }]
            }
        });
        let resp = send(pool.clone(), "POST", "/api/plans", Some(coach.id), Some(body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let built = body_json(resp).await;
        assert_eq!(built["status"], "draft");
        assert_eq!(built["sessions"], 1);
        assert_eq!(built["unresolved_tokens"], json!([]));
        let plan_id = built["id"].as_str().unwrap().to_string();

        let publish_uri = format!("/api/plans/{plan_id}/publish");
        let resp = send(pool.clone(), "POST", &publish_uri, Some(coach.id), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let published = body_json(resp).await;
        assert_eq!(published["status"], "published");
        assert_eq!(published["assignments_created"], 1);

        let resp = send(pool.clone(), "POST", &publish_uri, Some(coach.id), None).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = send(
            pool.clone(),
            "GET",
            &format!("/api/plans/{plan_id}"),
            Some(coach.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let detail = body_json(resp).await;
        assert_eq!(detail["assignment_count"], 1);
        assert_eq!(detail["days"][0]["date"], "2024-06-05");

        let range = "/api/workouts?from=2024-06-02&to=2024-06-08";
        let resp = send(pool.clone(), "GET", range, Some(thrower.id), None).await;
        assert_eq!(body_json(resp).await, json!([]));

        let resp = send(pool.clone(), "GET", range, Some(sprinter.id), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let workouts = body_json(resp).await;
        let workouts = workouts.as_array().unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0]["workout_date"], "2024-06-05");
        let assignment_id = workouts[0]["id"].as_str().unwrap().to_string();

        let complete_uri = format!("/api/workouts/{assignment_id}/complete");
        let resp = send(
            pool.clone(),
            "POST",
            &complete_uri,
            Some(sprinter.id),
            Some(json!({ "perceived_effort": 11 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = send(
            pool.clone(),
            "POST",
            &complete_uri,
            Some(thrower.id),
            Some(json!({})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(
            pool.clone(),
            "POST",
            &complete_uri,
            Some(sprinter.id),
            Some(json!({ "notes": "felt fast", "perceived_effort": 7 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let done = body_json(resp).await;
        assert_eq!(done["completed"], true);
        assert_eq!(done["perceived_effort"], 7);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn roles_and_ownership_map_to_status_codes() {
        let (pool, db_name) = create_test_db().await;
        let coach = seed_coach(&pool, "coach").await;
        let other = seed_coach(&pool, "other").await;
        let athlete = seed_athlete(&pool, coach.id, "a").await;

        let resp = send(pool.clone(), "GET", "/api/plans", Some(athlete.id), None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = send(pool.clone(), "GET", "/api/plans", Some(coach.id), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));

        let body = json!({ "week_start_date": "2024-06-02", "plan": { "days": [] } });
        let resp = send(pool.clone(), "POST", "/api/plans", Some(coach.id), Some(body)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json!({
            "week_start_date": "2024-06-02",
            "plan": { "days": [{ "dayOfWeek": "Mon", "sessions": [{ "type": "lift" }] }] }
        });
        let resp = send(pool.clone(), "POST", "/api/plans", Some(coach.id), Some(body)).await;
        let plan_id = body_json(resp).await["id"].as_str().unwrap().to_string();

        let resp = send(
            pool.clone(),
            "GET",
            &format!("/api/plans/{plan_id}"),
            Some(other.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(
            pool.clone(),
            "POST",
            &format!("/api/plans/{}/publish", Uuid::new_v4()),
            Some(coach.id),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn template_generation_and_one_off_sessions() {
        let (pool, db_name) = create_test_db().await;
        let coach_row = seed_coach(&pool, "coach").await;
        let coach = Actor::new(coach_row.id, Role::Coach);

        let scheduled = create_template(&pool, &coach, &parse_template_toml(TEMPO).unwrap())
            .await
            .unwrap();
        let unscheduled = create_template(
            &pool,
            &coach,
            &parse_template_toml(
                "[template]\nname = \"Lift\"\ntype = \"lift\"\nduration_minutes = 45\n",
            )
            .unwrap(),
        )
        .await
        .unwrap();

        let generate_uri = format!("/api/templates/{}/generate", scheduled.template.id);
        let body = json!({ "weeks_ahead": 2, "today": "2024-06-04" });
        let resp = send(pool.clone(), "POST", &generate_uri, Some(coach.id), Some(body.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body_json(resp).await;
        let created = created.as_array().unwrap();
        assert_eq!(created.len(), 6);
        assert_eq!(created[0]["scheduled_date"], "2024-06-05");
        assert_eq!(created[0]["start_at"], "2024-06-05T09:00:00");

        let resp = send(pool.clone(), "POST", &generate_uri, Some(coach.id), Some(body)).await;
        assert_eq!(body_json(resp).await, json!([]));

        let resp = send(
            pool.clone(),
            "POST",
            &generate_uri,
            Some(coach.id),
            Some(json!({ "weeks_ahead": 0 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = send(
            pool.clone(),
            "POST",
            &format!("/api/templates/{}/generate", unscheduled.template.id),
            Some(coach.id),
            Some(json!({})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let sessions_uri = format!("/api/templates/{}/sessions", unscheduled.template.id);
        let resp = send(
            pool.clone(),
            "POST",
            &sessions_uri,
            Some(coach.id),
            Some(json!({ "date": "2024-06-08", "start_time": "5:30pm" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let session = body_json(resp).await;
        assert_eq!(session["start_at"], "2024-06-08T17:30:00");
        assert_eq!(session["end_at"], "2024-06-08T18:15:00");
        assert_eq!(session["template_id"], Value::Null);

        let resp = send(
            pool.clone(),
            "POST",
            &sessions_uri,
            Some(coach.id),
            Some(json!({ "date": "2024-06-08", "start_time": "later" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
