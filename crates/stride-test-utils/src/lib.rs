//! PostgreSQL harness and fixtures for stride integration tests.
//!
//! One server is shared by every test in a binary and each test gets a
//! fresh database inside it. The server comes from `STRIDE_TEST_PG_URL`
//! when that is set (a container started by a setup script or CI service),
//! otherwise from a testcontainers instance started on first use.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use stride_db::models::{AthleteGroup, Role, User};
use stride_db::pool;
use stride_db::queries::{groups, users};

struct SharedPg {
    base_url: String,
    /// Keeps the container alive. `None` for an external server.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("STRIDE_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_string(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("18")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL of the shared PostgreSQL, without a database name.
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn maintenance_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a migrated temporary database.
///
/// Returns `(pool, db_name)`; pass `db_name` to [`drop_test_db`] at the end
/// of the test.
pub async fn create_test_db() -> (PgPool, String) {
    let maint_pool = maintenance_pool().await;
    let db_name = format!("stride_test_{}", Uuid::new_v4().simple());
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a temporary database, terminating its connections first.
pub async fn drop_test_db(db_name: &str) {
    let maint_pool = maintenance_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = maint_pool.execute(stmt.as_str()).await;
    maint_pool.close().await;
}

pub async fn seed_coach(pool: &PgPool, name: &str) -> User {
    users::insert_user(pool, name, Role::Coach)
        .await
        .expect("insert coach")
}

/// Insert an athlete and link them to `coach_id`.
pub async fn seed_athlete(pool: &PgPool, coach_id: Uuid, name: &str) -> User {
    let athlete = users::insert_user(pool, name, Role::Athlete)
        .await
        .expect("insert athlete");
    users::link_athlete(pool, coach_id, athlete.id)
        .await
        .expect("link athlete");
    athlete
}

/// Insert a group owned by `owner_id` with the given members.
pub async fn seed_group(
    pool: &PgPool,
    owner_id: Uuid,
    name: &str,
    slug: &str,
    members: &[Uuid],
) -> AthleteGroup {
    let group = groups::insert_group(
        pool,
        &groups::NewGroup {
            owner_id,
            name,
            slug,
            color: None,
            description: None,
        },
    )
    .await
    .expect("insert group");

    for athlete_id in members {
        groups::add_member(pool, group.id, *athlete_id)
            .await
            .expect("add member");
    }
    group
}
