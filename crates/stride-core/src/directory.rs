//! Group directory: coach-owned audience groups, their members, and the
//! coach to athlete links.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use stride_db::models::{AthleteGroup, Role};
use stride_db::queries::{groups, users};

use crate::actor::Actor;
use crate::error::{EngineError, EngineResult};

/// Derive a url-safe slug from a display name.
///
/// Lowercases ASCII alphanumerics and collapses every other run of
/// characters into a single hyphen, trimming hyphens at both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Input for [`create_group`].
#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    pub name: String,
    /// Derived from `name` when absent.
    pub slug: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

pub async fn create_group(
    pool: &PgPool,
    actor: &Actor,
    spec: &GroupSpec,
) -> EngineResult<AthleteGroup> {
    actor.require_coach("create groups")?;

    let name = spec.name.trim();
    if name.is_empty() {
        return Err(EngineError::validation("group name must not be blank"));
    }
    let slug = match spec.slug.as_deref() {
        Some(s) => s.trim().to_string(),
        None => slugify(name),
    };
    if !is_valid_slug(&slug) {
        return Err(EngineError::validation(format!(
            "invalid group slug {slug:?} (use lowercase letters, digits and single hyphens)"
        )));
    }

    let taken = groups::list_groups(pool, actor.id)
        .await?
        .iter()
        .any(|g| g.slug == slug);
    if taken {
        return Err(EngineError::validation(format!(
            "a group with slug {slug:?} already exists"
        )));
    }

    let group = groups::insert_group(
        pool,
        &groups::NewGroup {
            owner_id: actor.id,
            name,
            slug: &slug,
            color: spec.color.as_deref(),
            description: spec.description.as_deref(),
        },
    )
    .await?;

    info!(group_id = %group.id, slug = %group.slug, "group created");
    Ok(group)
}

pub async fn list_groups(pool: &PgPool, owner_id: Uuid) -> EngineResult<Vec<AthleteGroup>> {
    Ok(groups::list_groups(pool, owner_id).await?)
}

/// A coach's groups with their member counts.
pub async fn list_groups_with_counts(
    pool: &PgPool,
    actor: &Actor,
) -> EngineResult<Vec<(AthleteGroup, i64)>> {
    let owned = groups::list_groups(pool, actor.id).await?;
    let counts = groups::member_counts(pool, actor.id).await?;
    Ok(owned
        .into_iter()
        .map(|g| {
            let n = counts
                .iter()
                .find(|(id, _)| *id == g.id)
                .map_or(0, |(_, n)| *n);
            (g, n)
        })
        .collect())
}

/// Union of the members of the given groups.
pub async fn list_members(pool: &PgPool, group_ids: &[Uuid]) -> EngineResult<Vec<Uuid>> {
    Ok(groups::list_members(pool, group_ids).await?)
}

pub async fn list_linked_athletes(pool: &PgPool, coach_id: Uuid) -> EngineResult<Vec<Uuid>> {
    Ok(users::list_linked_athletes(pool, coach_id).await?)
}

async fn load_athlete(pool: &PgPool, athlete_id: Uuid) -> EngineResult<()> {
    match users::get_user(pool, athlete_id).await? {
        Some(u) if u.role == Role::Athlete => Ok(()),
        _ => Err(EngineError::not_found("athlete", athlete_id)),
    }
}

/// Link an athlete to the acting coach. Returns `true` for a new link.
pub async fn link_athlete(pool: &PgPool, actor: &Actor, athlete_id: Uuid) -> EngineResult<bool> {
    actor.require_coach("link athletes")?;
    load_athlete(pool, athlete_id).await?;

    let created = users::link_athlete(pool, actor.id, athlete_id).await?;
    info!(coach_id = %actor.id, athlete_id = %athlete_id, created, "athlete linked");
    Ok(created)
}

/// Add an athlete to one of the acting coach's groups. Returns `true` for a
/// new membership.
pub async fn add_member(
    pool: &PgPool,
    actor: &Actor,
    group_id: Uuid,
    athlete_id: Uuid,
) -> EngineResult<bool> {
    actor.require_coach("manage group membership")?;

    match groups::get_group(pool, group_id).await? {
        Some(g) if g.owner_id == actor.id => {}
        _ => return Err(EngineError::not_found("group", group_id)),
    }
    load_athlete(pool, athlete_id).await?;

    let created = groups::add_member(pool, group_id, athlete_id).await?;
    info!(group_id = %group_id, athlete_id = %athlete_id, created, "group member added");
    Ok(created)
}
