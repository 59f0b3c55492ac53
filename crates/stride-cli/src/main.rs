mod config;
mod group_cmds;
mod plan_cmds;
mod serve_cmd;
mod template_cmds;
#[cfg(test)]
mod test_util;
mod user_cmds;
mod workout_cmds;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::actor::Actor;
use stride_db::pool;

use config::StrideConfig;

#[derive(Parser)]
#[command(name = "stride", about = "Coach plan publishing and recurring workout engine")]
struct Cli {
    /// Database URL (overrides STRIDE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// ID of the user performing the command
    #[arg(long = "as", value_name = "USER_ID", global = true)]
    acting_user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a stride config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/stride")]
        db_url: String,
        /// Default number of weeks `template generate` looks ahead
        #[arg(long, default_value_t = stride_core::template::DEFAULT_WEEKS_AHEAD)]
        weeks_ahead: u32,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the stride database (requires config file or env vars)
    DbInit,
    /// Coach and athlete accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Athlete groups owned by the acting coach
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// Weekly plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Training templates and recurring sessions
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// The acting athlete's assigned workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Serve the JSON API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// Display name
        name: String,
        /// coach or athlete
        #[arg(long)]
        role: stride_db::models::Role,
    },
    /// Link an athlete to the acting coach
    Link {
        /// Athlete user ID
        athlete_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group
    Create {
        /// Group name, e.g. "Long Sprints"
        name: String,
        /// Slug (derived from the name when omitted)
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List groups with member counts
    List,
    /// Add an athlete to a group
    AddMember {
        /// Group ID
        group_id: Uuid,
        /// Athlete user ID
        athlete_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Build a draft plan from parsed-plan JSON
    Build {
        /// Path to the parsed plan JSON file
        file: String,
        /// Date the plan week starts on (YYYY-MM-DD)
        #[arg(long)]
        week_start: chrono::NaiveDate,
        /// Plan name (defaults to "Week of <week start>")
        #[arg(long)]
        name: Option<String>,
        /// Path to the coach's original plan text, stored alongside the plan
        #[arg(long)]
        source: Option<String>,
    },
    /// Show plan details (or list all plans)
    Show {
        /// Plan ID to show (omit to list all)
        plan_id: Option<Uuid>,
    },
    /// Publish a draft plan to athletes
    Publish {
        /// Plan ID to publish
        plan_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a template from a TOML file
    Create {
        /// Path to the template TOML file
        file: String,
    },
    /// Show template details (or list all templates)
    Show {
        /// Template ID to show (omit to list all)
        template_id: Option<Uuid>,
    },
    /// Generate scheduled sessions for the coming weeks
    Generate {
        /// Template ID
        template_id: Uuid,
        /// Weeks to look ahead (defaults to the configured value)
        #[arg(long)]
        weeks: Option<u32>,
    },
    /// Copy a template into a single session on a date
    Copy {
        /// Template ID
        template_id: Uuid,
        /// Session date (YYYY-MM-DD)
        #[arg(long)]
        date: chrono::NaiveDate,
        /// Start time such as 17:30 or 5:30pm
        #[arg(long)]
        start: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum WorkoutCommands {
    /// List assigned workouts in a date range (defaults to the next 7 days)
    List {
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
        #[arg(long)]
        to: Option<chrono::NaiveDate>,
    },
    /// Mark an assigned workout completed
    Complete {
        /// Assignment ID
        assignment_id: Uuid,
        #[arg(long)]
        notes: Option<String>,
        /// Perceived effort, 1 to 10
        #[arg(long)]
        effort: Option<i16>,
    },
}

/// Execute the `stride init` command: write config file.
fn cmd_init(db_url: &str, weeks_ahead: u32, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }
    let weeks_ahead = config::parse_weeks_ahead(&weeks_ahead.to_string())?;

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        schedule: config::ScheduleSection { weeks_ahead },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  schedule.weeks_ahead = {weeks_ahead}");
    println!();
    println!("Next: run `stride db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `stride db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = StrideConfig::resolve(cli_db_url)?;

    println!("Initializing stride database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("stride db-init complete.");
    Ok(())
}

/// Resolve `--as` against the users table.
pub async fn acting_user(pool: &PgPool, id: Option<Uuid>) -> anyhow::Result<Actor> {
    let id = id.context("this command needs the acting user: pass --as <USER_ID>")?;
    Ok(Actor::load(pool, id).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            weeks_ahead,
            force,
        } => {
            cmd_init(&db_url, weeks_ahead, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::User { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = user_cmds::run_user_command(command, &db_pool, cli.acting_user).await;
            db_pool.close().await;
            result?;
        }
        Commands::Group { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = group_cmds::run_group_command(command, &db_pool, cli.acting_user).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool, cli.acting_user).await;
            db_pool.close().await;
            result?;
        }
        Commands::Template { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = template_cmds::run_template_command(
                command,
                &db_pool,
                cli.acting_user,
                resolved.weeks_ahead,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Workout { command } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                workout_cmds::run_workout_command(command, &db_pool, cli.acting_user).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = StrideConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                serve_cmd::run_serve(db_pool.clone(), resolved.weeks_ahead, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn acting_user_flag_is_global() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "stride",
            "plan",
            "publish",
            &Uuid::new_v4().to_string(),
            "--as",
            &id.to_string(),
        ])
        .unwrap();
        assert_eq!(cli.acting_user, Some(id));
        assert!(matches!(
            cli.command,
            Commands::Plan {
                command: PlanCommands::Publish { .. }
            }
        ));
    }

    #[test]
    fn user_role_is_parsed() {
        let cli = Cli::try_parse_from(["stride", "user", "add", "Sam", "--role", "athlete"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::User {
                command: UserCommands::Add {
                    role: stride_db::models::Role::Athlete,
                    ..
                }
            }
        ));
        assert!(Cli::try_parse_from(["stride", "user", "add", "Sam", "--role", "admin"]).is_err());
    }
}
