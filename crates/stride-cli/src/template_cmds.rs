//! CLI handlers for `stride template` subcommands.
//!
//! Implements:
//! - `stride template create <file>`               -- create a template from TOML
//! - `stride template show [template-id]`          -- show a template or list all
//! - `stride template generate <id> [--weeks N]`   -- generate scheduled sessions
//! - `stride template copy <id> --date <date>`     -- one-off session from a template

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::actor::Actor;
use stride_core::calendar::{parse_clock_time, weekday_name};
use stride_core::template::{
    create_session_from_template, create_template, generate_from_template, list_templates,
    parse_template_toml, session_detail, template_detail,
};

use crate::{TemplateCommands, acting_user};

pub async fn run_template_command(
    command: TemplateCommands,
    pool: &PgPool,
    actor_id: Option<Uuid>,
    default_weeks: u32,
) -> Result<()> {
    let actor = acting_user(pool, actor_id).await?;
    match command {
        TemplateCommands::Create { file } => cmd_create(pool, &actor, &file).await,
        TemplateCommands::Show { template_id } => match template_id {
            Some(id) => cmd_show_one(pool, &actor, id).await,
            None => cmd_show_all(pool, &actor).await,
        },
        TemplateCommands::Generate { template_id, weeks } => {
            cmd_generate(pool, &actor, template_id, weeks.unwrap_or(default_weeks)).await
        }
        TemplateCommands::Copy {
            template_id,
            date,
            start,
        } => cmd_copy(pool, &actor, template_id, date, start.as_deref()).await,
    }
}

async fn cmd_create(pool: &PgPool, actor: &Actor, file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read template file: {file_path}"))?;
    let def = parse_template_toml(&content)
        .with_context(|| format!("failed to parse template file: {file_path}"))?;

    let detail = create_template(pool, actor, &def).await?;

    println!("Template created successfully.");
    println!();
    println!("  Template ID:  {}", detail.template.id);
    println!("  Name:         {}", detail.template.name);
    println!("  Type:         {}", detail.template.workout_type);
    println!("  Duration:     {} min", detail.template.duration_minutes);
    println!("  Exercises:    {}", detail.exercises.len());
    match &detail.schedule {
        Some(s) => println!("  Schedule:     {}", describe_weekdays(&s.weekdays)),
        None => println!("  Schedule:     none"),
    }
    Ok(())
}

async fn cmd_show_all(pool: &PgPool, actor: &Actor) -> Result<()> {
    let templates = list_templates(pool, actor).await?;

    if templates.is_empty() {
        println!("No templates found. Use `stride template create <file>` to create one.");
        return Ok(());
    }

    let id_w = 36;
    let name_w = templates.iter().map(|t| t.name.len()).max().unwrap_or(4).max(4);
    let type_w = templates
        .iter()
        .map(|t| t.workout_type.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<id_w$}  {:<name_w$}  {:<type_w$}  {:>8}",
        "ID", "NAME", "TYPE", "DURATION",
    );
    for t in &templates {
        println!(
            "{:<id_w$}  {:<name_w$}  {:<type_w$}  {:>4} min",
            t.id, t.name, t.workout_type, t.duration_minutes,
        );
    }
    Ok(())
}

async fn cmd_show_one(pool: &PgPool, actor: &Actor, template_id: Uuid) -> Result<()> {
    let detail = template_detail(pool, actor, template_id).await?;
    let t = &detail.template;

    println!("Template: {}", t.name);
    println!("  ID:         {}", t.id);
    println!("  Type:       {}", t.workout_type);
    println!("  Duration:   {} min", t.duration_minutes);
    if let Some(i) = &t.intensity {
        println!("  Intensity:  {i}");
    }
    if let Some(f) = &t.focus {
        println!("  Focus:      {f}");
    }
    match &detail.schedule {
        Some(s) => {
            let state = if s.enabled { "enabled" } else { "disabled" };
            println!(
                "  Schedule:   {} at {} ({state})",
                describe_weekdays(&s.weekdays),
                s.start_time.format("%H:%M")
            );
            if let Some(end) = s.end_date {
                println!("  Ends:       {end}");
            }
        }
        None => println!("  Schedule:   none"),
    }

    if detail.exercises.is_empty() {
        return Ok(());
    }
    println!();
    println!("Exercises:");
    for ex in &detail.exercises {
        println!("  {}", ex.exercise.name);
        for set in &ex.sets {
            println!("    {}", describe_set(set.set_number, set.reps, set.weight, set.rpe));
        }
    }
    Ok(())
}

async fn cmd_generate(pool: &PgPool, actor: &Actor, template_id: Uuid, weeks: u32) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let created = generate_from_template(pool, actor, template_id, weeks, today).await?;

    if created.is_empty() {
        println!("No new sessions: the next {weeks} week(s) are already generated.");
        return Ok(());
    }

    println!("Generated {} session(s):", created.len());
    for s in &created {
        println!(
            "  {}  {}  {}",
            s.start_at.format("%a %Y-%m-%d %H:%M"),
            s.workout_type,
            s.id
        );
    }
    Ok(())
}

async fn cmd_copy(
    pool: &PgPool,
    actor: &Actor,
    template_id: Uuid,
    date: NaiveDate,
    start: Option<&str>,
) -> Result<()> {
    let start_time = match start {
        Some(raw) => Some(
            parse_clock_time(raw).with_context(|| format!("invalid start time: {raw:?}"))?,
        ),
        None => None,
    };
    let session = create_session_from_template(pool, actor, template_id, date, start_time).await?;
    let detail = session_detail(pool, actor, session.id).await?;

    println!("Session created.");
    println!();
    println!("  Session ID:  {}", session.id);
    println!(
        "  When:        {} to {}",
        session.start_at.format("%a %Y-%m-%d %H:%M"),
        session.end_at.format("%H:%M")
    );
    println!("  Type:        {}", session.workout_type);
    println!("  Exercises:   {}", detail.exercises.len());
    Ok(())
}

fn describe_weekdays(days: &[i16]) -> String {
    let names: Vec<&str> = days
        .iter()
        .filter_map(|d| u8::try_from(*d).ok())
        .map(weekday_name)
        .collect();
    if names.is_empty() {
        "no weekdays".to_string()
    } else {
        names.join(", ")
    }
}

fn describe_set(number: i32, reps: Option<i32>, weight: Option<f32>, rpe: Option<f32>) -> String {
    let mut out = format!("set {number}:");
    if let Some(r) = reps {
        out.push_str(&format!(" {r} reps"));
    }
    if let Some(w) = weight {
        out.push_str(&format!(" @ {w}"));
    }
    if let Some(r) = rpe {
        out.push_str(&format!(" rpe {r}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekdays_are_named() {
        assert_eq!(describe_weekdays(&[1, 3, 5]), "monday, wednesday, friday");
        assert_eq!(describe_weekdays(&[]), "no weekdays");
    }

    #[test]
    fn set_description_skips_missing_fields() {
        assert_eq!(describe_set(1, Some(8), None, Some(6.5)), "set 1: 8 reps rpe 6.5");
        assert_eq!(describe_set(2, None, None, None), "set 2:");
    }
}
