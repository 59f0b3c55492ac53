//! CLI handlers for `stride user` subcommands.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::directory;
use stride_db::queries::users;

use crate::{UserCommands, acting_user};

pub async fn run_user_command(
    command: UserCommands,
    pool: &PgPool,
    actor_id: Option<Uuid>,
) -> Result<()> {
    match command {
        UserCommands::Add { name, role } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("display name must not be blank");
            }
            let user = users::insert_user(pool, name, role).await?;
            println!("User created.");
            println!();
            println!("  User ID:  {}", user.id);
            println!("  Name:     {}", user.display_name);
            println!("  Role:     {}", user.role);
            Ok(())
        }
        UserCommands::Link { athlete_id } => {
            let actor = acting_user(pool, actor_id).await?;
            let created = directory::link_athlete(pool, &actor, athlete_id).await?;
            if created {
                println!("Athlete {athlete_id} linked to coach {}.", actor.id);
            } else {
                println!("Athlete {athlete_id} was already linked.");
            }
            Ok(())
        }
    }
}
