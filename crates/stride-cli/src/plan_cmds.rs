//! CLI handlers for `stride plan` subcommands.
//!
//! Implements:
//! - `stride plan build <file> --week-start <date>` -- build a draft plan from parser JSON
//! - `stride plan show [plan-id]`                   -- show plan details or list all plans
//! - `stride plan publish <plan-id>`                -- publish a draft plan to athletes

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::actor::Actor;
use stride_core::alias::TrackAndFieldVocabulary;
use stride_core::plan::{
    BuildPlanRequest, ParsedPlan, build_plan, list_plans, plan_detail, publish_plan,
};

use crate::{PlanCommands, acting_user};

pub async fn run_plan_command(
    command: PlanCommands,
    pool: &PgPool,
    actor_id: Option<Uuid>,
) -> Result<()> {
    let actor = acting_user(pool, actor_id).await?;
    match command {
        PlanCommands::Build {
            file,
            week_start,
            name,
            source,
        } => cmd_build(pool, &actor, &file, week_start, name, source.as_deref()).await,
        PlanCommands::Show { plan_id } => match plan_id {
            Some(id) => cmd_show_one(pool, &actor, id).await,
            None => cmd_show_all(pool, &actor).await,
        },
        PlanCommands::Publish { plan_id } => cmd_publish(pool, &actor, plan_id).await,
    }
}

// -----------------------------------------------------------------------
// stride plan build <file>
// -----------------------------------------------------------------------

async fn cmd_build(
    pool: &PgPool,
    actor: &Actor,
    file_path: &str,
    week_start: NaiveDate,
    name: Option<String>,
    source_path: Option<&str>,
) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read plan file: {file_path}"))?;
    let parsed = ParsedPlan::from_json(&content)
        .with_context(|| format!("failed to parse plan file: {file_path}"))?;
    let source_text = match source_path {
        Some(p) => Some(
            std::fs::read_to_string(p)
                .with_context(|| format!("failed to read source text: {p}"))?,
        ),
        None => None,
    };

    let request = BuildPlanRequest {
        week_start_date: Some(week_start),
        plan: parsed,
        name,
        source_text,
    };
    let built = build_plan(pool, &TrackAndFieldVocabulary, actor, &request).await?;

    println!("Plan created successfully.");
    println!();
    println!("  Plan ID:     {}", built.plan.id);
    println!("  Name:        {}", built.plan.name);
    println!("  Week start:  {}", built.plan.week_start_date);
    println!("  Status:      {}", built.plan.status);
    println!("  Days:        {}", built.days);
    println!("  Sessions:    {}", built.sessions);
    println!("  Exercises:   {}", built.exercises);

    if !built.unresolved_tokens.is_empty() {
        println!();
        println!("Warnings:");
        for token in &built.unresolved_tokens {
            println!("  - no group matches {token:?}");
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// stride plan show
// -----------------------------------------------------------------------

async fn cmd_show_all(pool: &PgPool, actor: &Actor) -> Result<()> {
    let plans = list_plans(pool, actor).await?;

    if plans.is_empty() {
        println!("No plans found. Use `stride plan build <file>` to create one.");
        return Ok(());
    }

    let id_w = 36;
    let name_w = plans.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);
    let status_w = 9;

    println!(
        "{:<id_w$}  {:<name_w$}  {:<status_w$}  {:<10}  CREATED",
        "ID", "NAME", "STATUS", "WEEK",
    );
    for plan in &plans {
        let created = plan.created_at.format("%Y-%m-%d %H:%M");
        println!(
            "{:<id_w$}  {:<name_w$}  {:<status_w$}  {:<10}  {}",
            plan.id,
            plan.name,
            plan.status.to_string(),
            plan.week_start_date.to_string(),
            created,
        );
    }
    Ok(())
}

async fn cmd_show_one(pool: &PgPool, actor: &Actor, plan_id: Uuid) -> Result<()> {
    let detail = plan_detail(pool, actor, plan_id).await?;
    let plan = &detail.plan;

    println!("Plan: {}", plan.name);
    println!("  ID:           {}", plan.id);
    println!("  Status:       {}", plan.status);
    println!("  Week start:   {}", plan.week_start_date);
    println!(
        "  Created:      {}",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(published) = plan.published_at {
        println!(
            "  Published:    {}",
            published.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("  Assignments:  {}", detail.assignment_count);

    for day in &detail.days {
        println!();
        let off = if day.day.is_off_day { " (off)" } else { "" };
        println!("{} {}{off}", day.date.format("%A"), day.date);

        for s in &day.sessions {
            let session = &s.session;
            let title = session.title.as_deref().unwrap_or("");
            let times = match (session.start_time, session.end_time) {
                (Some(a), Some(b)) => format!(" {}-{}", a.format("%H:%M"), b.format("%H:%M")),
                (Some(a), None) => format!(" {}", a.format("%H:%M")),
                _ => String::new(),
            };
            let audience = if session.for_specific_groups {
                format!(" [{} group(s)]", session.target_group_ids.len())
            } else {
                String::new()
            };
            println!("  [{}] {title}{times}{audience}", session.session_type);
            if let Some(loc) = &session.location {
                println!("    Location:  {loc}");
            }
            for ex in &s.exercises {
                match &ex.details {
                    Some(d) => println!("    - {}: {d}", ex.name),
                    None => println!("    - {}", ex.name),
                }
            }
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// stride plan publish <plan-id>
// -----------------------------------------------------------------------

async fn cmd_publish(pool: &PgPool, actor: &Actor, plan_id: Uuid) -> Result<()> {
    let outcome = publish_plan(pool, actor, plan_id).await?;

    println!("Plan {} published.", outcome.plan.id);
    println!("  Assignments created:  {}", outcome.assignments_created);
    if !outcome.unreachable_sessions.is_empty() {
        println!();
        println!("Warnings: these sessions target groups that do not exist and reach nobody:");
        for id in &outcome.unreachable_sessions {
            println!("  - {id}");
        }
    }
    Ok(())
}
