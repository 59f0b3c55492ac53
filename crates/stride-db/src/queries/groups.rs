//! Database query functions for the `athlete_groups` and `group_memberships`
//! tables.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AthleteGroup;

/// Parameters for inserting a new group row.
#[derive(Debug, Clone)]
pub struct NewGroup<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub slug: &'a str,
    pub color: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Insert a new group.
///
/// A second group with the same slug for the same owner is rejected by the
/// UNIQUE constraint.
pub async fn insert_group(pool: &PgPool, new: &NewGroup<'_>) -> Result<AthleteGroup> {
    let group = sqlx::query_as::<_, AthleteGroup>(
        "INSERT INTO athlete_groups (owner_id, name, slug, color, description) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.owner_id)
    .bind(new.name)
    .bind(new.slug)
    .bind(new.color)
    .bind(new.description)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert group {:?}", new.slug))?;

    Ok(group)
}

/// Fetch a group by ID.
pub async fn get_group(pool: &PgPool, id: Uuid) -> Result<Option<AthleteGroup>> {
    let group = sqlx::query_as::<_, AthleteGroup>("SELECT * FROM athlete_groups WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch group")?;

    Ok(group)
}

/// List every group owned by `owner_id`, ordered by creation time.
pub async fn list_groups(pool: &PgPool, owner_id: Uuid) -> Result<Vec<AthleteGroup>> {
    let groups = sqlx::query_as::<_, AthleteGroup>(
        "SELECT * FROM athlete_groups WHERE owner_id = $1 ORDER BY created_at ASC, slug ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("failed to list groups")?;

    Ok(groups)
}

/// Add an athlete to a group.
///
/// Uses `ON CONFLICT DO NOTHING` so this is idempotent. Returns `true` when
/// the membership is new.
pub async fn add_member(pool: &PgPool, group_id: Uuid, athlete_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO group_memberships (group_id, athlete_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(athlete_id)
    .execute(pool)
    .await
    .context("failed to add group member")?;

    Ok(result.rows_affected() == 1)
}

/// Union of the members of `group_ids`, duplicates collapsed.
pub async fn list_members(pool: &PgPool, group_ids: &[Uuid]) -> Result<Vec<Uuid>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT DISTINCT athlete_id FROM group_memberships \
         WHERE group_id = ANY($1) \
         ORDER BY athlete_id",
    )
    .bind(group_ids)
    .fetch_all(pool)
    .await
    .context("failed to list group members")?;

    Ok(ids)
}

/// Member count per group for an owner, for listings.
pub async fn member_counts(pool: &PgPool, owner_id: Uuid) -> Result<Vec<(Uuid, i64)>> {
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT g.id, COUNT(m.athlete_id) FROM athlete_groups g \
         LEFT JOIN group_memberships m ON m.group_id = g.id \
         WHERE g.owner_id = $1 \
         GROUP BY g.id",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("failed to count group members")?;

    Ok(rows)
}
