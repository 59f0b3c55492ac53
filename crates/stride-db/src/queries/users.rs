//! Database query functions for the `users` and `coach_athletes` tables.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Role, User};

/// Insert a new user. Returns the row with server-generated defaults.
pub async fn insert_user(pool: &PgPool, display_name: &str, role: Role) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (display_name, role) VALUES ($1, $2) RETURNING *",
    )
    .bind(display_name)
    .bind(role)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert user {display_name:?}"))?;

    Ok(user)
}

/// Fetch a user by ID.
pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user")?;

    Ok(user)
}

/// Link an athlete to a coach.
///
/// Uses `ON CONFLICT DO NOTHING` so this is idempotent. Returns `true` when
/// a new link was created.
pub async fn link_athlete(pool: &PgPool, coach_id: Uuid, athlete_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO coach_athletes (coach_id, athlete_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(coach_id)
    .bind(athlete_id)
    .execute(pool)
    .await
    .context("failed to link athlete to coach")?;

    Ok(result.rows_affected() == 1)
}

/// IDs of every athlete currently linked to a coach, in a stable order.
pub async fn list_linked_athletes(pool: &PgPool, coach_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT athlete_id FROM coach_athletes WHERE coach_id = $1 ORDER BY athlete_id",
    )
    .bind(coach_id)
    .fetch_all(pool)
    .await
    .context("failed to list linked athletes")?;

    Ok(ids)
}
