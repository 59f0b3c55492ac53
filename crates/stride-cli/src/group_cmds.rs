//! CLI handlers for `stride group` subcommands.
//!
//! Implements:
//! - `stride group create <name>`                   -- create a group
//! - `stride group list`                            -- list groups with member counts
//! - `stride group add-member <group> <athlete>`    -- add an athlete to a group

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::actor::Actor;
use stride_core::directory::{self, GroupSpec};

use crate::{GroupCommands, acting_user};

pub async fn run_group_command(
    command: GroupCommands,
    pool: &PgPool,
    actor_id: Option<Uuid>,
) -> Result<()> {
    let actor = acting_user(pool, actor_id).await?;
    match command {
        GroupCommands::Create {
            name,
            slug,
            color,
            description,
        } => {
            let spec = GroupSpec {
                name,
                slug,
                color,
                description,
            };
            cmd_create(pool, &actor, &spec).await
        }
        GroupCommands::List => cmd_list(pool, &actor).await,
        GroupCommands::AddMember {
            group_id,
            athlete_id,
        } => {
            let added = directory::add_member(pool, &actor, group_id, athlete_id).await?;
            if added {
                println!("Athlete {athlete_id} added to group {group_id}.");
            } else {
                println!("Athlete {athlete_id} is already in group {group_id}.");
            }
            Ok(())
        }
    }
}

async fn cmd_create(pool: &PgPool, actor: &Actor, spec: &GroupSpec) -> Result<()> {
    let group = directory::create_group(pool, actor, spec).await?;
    println!("Group created.");
    println!();
    println!("  Group ID:  {}", group.id);
    println!("  Name:      {}", group.name);
    println!("  Slug:      {}", group.slug);
    Ok(())
}

async fn cmd_list(pool: &PgPool, actor: &Actor) -> Result<()> {
    let groups = directory::list_groups_with_counts(pool, actor).await?;

    if groups.is_empty() {
        println!("No groups found. Use `stride group create <name>` to create one.");
        return Ok(());
    }

    let id_w = 36;
    let name_w = groups.iter().map(|(g, _)| g.name.len()).max().unwrap_or(4).max(4);
    let slug_w = groups.iter().map(|(g, _)| g.slug.len()).max().unwrap_or(4).max(4);

    println!(
        "{:<id_w$}  {:<name_w$}  {:<slug_w$}  {:>7}",
        "ID", "NAME", "SLUG", "MEMBERS",
    );
    for (group, members) in &groups {
        println!(
            "{:<id_w$}  {:<name_w$}  {:<slug_w$}  {:>7}",
            group.id, group.name, group.slug, members,
        );
    }
    Ok(())
}
