//! Integration tests for building and publishing weekly plans.
//!
//! Each test creates an isolated temporary database through
//! `stride-test-utils`.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::actor::Actor;
use stride_core::alias::TrackAndFieldVocabulary;
use stride_core::plan::{
    BuildPlanRequest, ParsedPlan, build_plan, plan_detail, publish_plan,
};
use stride_core::EngineError;
use stride_db::models::{PlanStatus, Role};
use stride_db::queries::{assignments, plans};
use stride_test_utils::{create_test_db, drop_test_db, seed_athlete, seed_coach, seed_group};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn build(pool: &PgPool, coach: &Actor, json: &str) -> Uuid {
    let request = BuildPlanRequest {
        week_start_date: Some(date(2024, 6, 2)),
        plan: ParsedPlan::from_json(json).expect("valid plan json"),
        name: None,
        source_text: Some("raw coach text".to_string()),
    };
    build_plan(pool, &TrackAndFieldVocabulary, coach, &request)
        .await
        .expect("build should succeed")
        .plan
        .id
}

const LS_WEDNESDAY: &str = r#"{
    "days": [{
        "dayOfWeek": "Wednesday",
        "sessions": [{
            "type": "practice",
            "title": "Speed endurance",
            "forGroups": ["LS"],
            "exercises": [{"name": "3x300"}]
        }]
    }]
}"#;

#[tokio::test]
async fn ls_alias_session_lands_on_wednesday_for_group_members() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    let a = seed_athlete(&pool, coach.id, "a").await;
    let b = seed_athlete(&pool, coach.id, "b").await;
    let outsider = seed_athlete(&pool, coach.id, "c").await;
    seed_group(&pool, coach.id, "Long Sprints", "long-sprints", &[a.id, b.id]).await;

    let plan_id = build(&pool, &coach, LS_WEDNESDAY).await;
    let outcome = publish_plan(&pool, &coach, plan_id).await.expect("publish");

    assert_eq!(outcome.assignments_created, 2);
    assert!(outcome.unreachable_sessions.is_empty());
    assert_eq!(outcome.plan.status, PlanStatus::Published);
    assert!(outcome.plan.published_at.is_some());

    let sessions = plans::list_sessions(&pool, plan_id).await.unwrap();
    let rows = assignments::list_for_session(&pool, sessions[0].id).await.unwrap();
    let mut athletes: Vec<Uuid> = rows.iter().map(|r| r.athlete_id).collect();
    athletes.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(athletes, expected);
    assert!(rows.iter().all(|r| r.workout_date == date(2024, 6, 5)));
    assert!(!athletes.contains(&outsider.id));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn untargeted_sessions_reach_every_linked_athlete() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    for name in ["a", "b", "c"] {
        seed_athlete(&pool, coach.id, name).await;
    }
    // Linked to another coach only.
    let other = seed_coach(&pool, "other").await;
    seed_athlete(&pool, other.id, "d").await;

    let plan_id = build(
        &pool,
        &coach,
        r#"{"days":[
            {"dayOfWeek":"Mon","sessions":[{"type":"lift","forGroups":null}]},
            {"dayOfWeek":"Tue","sessions":[{"type":"recovery","forGroups":[]}]}
        ]}"#,
    )
    .await;

    let outcome = publish_plan(&pool, &coach, plan_id).await.unwrap();
    assert_eq!(outcome.assignments_created, 6);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unresolved_group_session_gets_nobody_while_others_publish() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    seed_athlete(&pool, coach.id, "a").await;
    seed_athlete(&pool, coach.id, "b").await;

    let plan_id = build(
        &pool,
        &coach,
        r#"{"days":[{"dayOfWeek":"Thursday","sessions":[
            {"type":"practice","forGroups":["Throwers"]},
            {"type":"conditioning"}
        ]}]}"#,
    )
    .await;

    let sessions = plans::list_sessions(&pool, plan_id).await.unwrap();
    let targeted = &sessions[0];
    assert!(targeted.for_specific_groups);
    assert!(targeted.target_group_ids.is_empty());

    let outcome = publish_plan(&pool, &coach, plan_id).await.unwrap();
    assert_eq!(outcome.assignments_created, 2);
    assert_eq!(outcome.unreachable_sessions, vec![targeted.id]);
    assert!(
        assignments::list_for_session(&pool, targeted.id)
            .await
            .unwrap()
            .is_empty()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn republishing_is_rejected_without_new_rows() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    seed_athlete(&pool, coach.id, "a").await;

    let plan_id = build(&pool, &coach, r#"{"days":[{"dayOfWeek":"Fri","sessions":[{"type":"lift"}]}]}"#).await;
    publish_plan(&pool, &coach, plan_id).await.unwrap();
    let before = assignments::count_for_plan(&pool, plan_id).await.unwrap();

    let err = publish_plan(&pool, &coach, plan_id).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyPublished(id) if id == plan_id));
    assert_eq!(assignments::count_for_plan(&pool, plan_id).await.unwrap(), before);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn concurrent_publishes_never_duplicate_assignments() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    for i in 0..4 {
        seed_athlete(&pool, coach.id, &format!("athlete-{i}")).await;
    }
    let plan_id = build(
        &pool,
        &coach,
        r#"{"days":[
            {"dayOfWeek":"Mon","sessions":[{"type":"practice"},{"type":"lift"}]},
            {"dayOfWeek":"Wed","sessions":[{"type":"practice"}]}
        ]}"#,
    )
    .await;

    let (first, second) = tokio::join!(
        publish_plan(&pool, &coach, plan_id),
        publish_plan(&pool, &coach, plan_id)
    );

    let created: usize = [first, second]
        .into_iter()
        .filter_map(|r| match r {
            Ok(outcome) => Some(outcome.assignments_created),
            Err(EngineError::AlreadyPublished(_)) => Some(0),
            Err(e) => panic!("unexpected publish error: {e}"),
        })
        .sum();

    assert_eq!(created, 12);
    assert_eq!(assignments::count_for_plan(&pool, plan_id).await.unwrap(), 12);
    let plan = plans::get_plan(&pool, plan_id).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Published);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn other_coaches_plans_are_not_found() {
    let (pool, db_name) = create_test_db().await;

    let owner_row = seed_coach(&pool, "owner").await;
    let owner = Actor::new(owner_row.id, Role::Coach);
    let other_row = seed_coach(&pool, "other").await;
    let other = Actor::new(other_row.id, Role::Coach);

    let plan_id = build(&pool, &owner, LS_WEDNESDAY).await;

    let err = publish_plan(&pool, &other, plan_id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "plan", .. }));
    let err = plan_detail(&pool, &other, plan_id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));

    let missing = publish_plan(&pool, &owner, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, EngineError::NotFound { .. }));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn athletes_cannot_build_or_publish() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    let athlete_row = seed_athlete(&pool, coach.id, "a").await;
    let athlete = Actor::new(athlete_row.id, Role::Athlete);

    let request = BuildPlanRequest {
        week_start_date: Some(date(2024, 6, 2)),
        plan: ParsedPlan::from_json(LS_WEDNESDAY).unwrap(),
        name: None,
        source_text: None,
    };
    let err = build_plan(&pool, &TrackAndFieldVocabulary, &athlete, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden { .. }));

    let plan_id = build(&pool, &coach, LS_WEDNESDAY).await;
    let err = publish_plan(&pool, &athlete, plan_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden { .. }));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn failed_validation_persists_nothing() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);

    let missing_start = BuildPlanRequest {
        week_start_date: None,
        plan: ParsedPlan::from_json(LS_WEDNESDAY).unwrap(),
        name: None,
        source_text: None,
    };
    let err = build_plan(&pool, &TrackAndFieldVocabulary, &coach, &missing_start)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let bad_exercise = BuildPlanRequest {
        week_start_date: Some(date(2024, 6, 2)),
        plan: ParsedPlan::from_json(
            r#"{"days":[{"dayOfWeek":"Mon","sessions":[{"type":"lift","exercises":[{"name":""}]}]}]}"#,
        )
        .unwrap(),
        name: None,
        source_text: None,
    };
    let err = build_plan(&pool, &TrackAndFieldVocabulary, &coach, &bad_exercise)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert!(plans::list_plans_for_owner(&pool, coach.id).await.unwrap().is_empty());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn built_plan_reads_back_with_projected_dates() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    seed_group(&pool, coach.id, "Long Sprints", "long-sprints", &[]).await;

    let plan_id = build(&pool, &coach, LS_WEDNESDAY).await;
    let detail = plan_detail(&pool, &coach, plan_id).await.unwrap();

    assert_eq!(detail.plan.name, "Week of 2024-06-02");
    assert_eq!(detail.plan.status, PlanStatus::Draft);
    assert_eq!(detail.plan.source_text.as_deref(), Some("raw coach text"));
    assert_eq!(detail.days.len(), 1);
    assert_eq!(detail.days[0].date, date(2024, 6, 5));
    let session = &detail.days[0].sessions[0];
    assert_eq!(session.session.title.as_deref(), Some("Speed endurance"));
    assert_eq!(session.session.target_group_ids.len(), 1);
    assert_eq!(session.exercises[0].name, "3x300");
    assert_eq!(detail.assignment_count, 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn interrupted_publish_stays_draft_and_resumes_without_duplicates() {
    let (pool, db_name) = create_test_db().await;

    let coach_row = seed_coach(&pool, "coach").await;
    let coach = Actor::new(coach_row.id, Role::Coach);
    let a = seed_athlete(&pool, coach.id, "a").await;
    seed_athlete(&pool, coach.id, "b").await;
    seed_group(&pool, coach.id, "Long Sprints", "long-sprints", &[a.id]).await;

    let plan_id = build(
        &pool,
        &coach,
        r#"{"days":[
            {"dayOfWeek":"Monday","sessions":[{"type":"lift"}]},
            {"dayOfWeek":"Tuesday","sessions":[{"type":"practice","forGroups":["LS"]}]}
        ]}"#,
    )
    .await;

    // Monday's session reaches both athletes before Tuesday needs the
    // group membership lookup.
    sqlx::query("ALTER TABLE group_memberships RENAME TO group_memberships_off")
        .execute(&pool)
        .await
        .unwrap();
    let err = publish_plan(&pool, &coach, plan_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Interrupted { completed: 2, .. }));
    let plan = plans::get_plan(&pool, plan_id).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Draft);
    assert_eq!(assignments::count_for_plan(&pool, plan_id).await.unwrap(), 2);

    sqlx::query("ALTER TABLE group_memberships_off RENAME TO group_memberships")
        .execute(&pool)
        .await
        .unwrap();
    let outcome = publish_plan(&pool, &coach, plan_id).await.expect("resumed publish");
    assert_eq!(outcome.assignments_created, 1);
    assert_eq!(outcome.plan.status, PlanStatus::Published);
    assert_eq!(assignments::count_for_plan(&pool, plan_id).await.unwrap(), 3);

    let tuesday = &plans::list_sessions(&pool, plan_id).await.unwrap()[1];
    let rows = assignments::list_for_session(&pool, tuesday.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].athlete_id, a.id);

    pool.close().await;
    drop_test_db(&db_name).await;
}
