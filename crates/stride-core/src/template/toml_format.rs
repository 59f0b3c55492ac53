//! On-disk template definition format.
//!
//! ```toml
//! [template]
//! name = "Tempo Monday"
//! type = "conditioning"
//! duration_minutes = 60
//! intensity = "moderate"
//!
//! [[exercises]]
//! name = "Tempo 200s"
//!
//! [[exercises.sets]]
//! reps = 8
//! rpe = 6.5
//!
//! [schedule]
//! weekdays = ["mon", "wed", 5]
//! start_time = "09:00"
//! end_date = "2024-12-31"
//! ```

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{parse_clock_time, parse_weekday_name};

#[derive(Debug, Error)]
pub enum TemplateParseError {
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("template name must not be blank")]
    BlankName,

    #[error("template type must not be blank")]
    BlankType,

    #[error("duration_minutes must be positive, got {0}")]
    InvalidDuration(i32),

    #[error("exercise #{0} has a blank name")]
    BlankExerciseName(usize),

    #[error("invalid weekday {0:?} (expected 0-6 or a weekday name)")]
    InvalidWeekday(String),

    #[error("invalid start_time {0:?}")]
    InvalidStartTime(String),

    #[error("an enabled schedule needs at least one weekday")]
    NoWeekdays,
}

/// Top-level structure of a template file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateToml {
    pub template: TemplateMeta,
    #[serde(default)]
    pub exercises: Vec<ExerciseToml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleToml>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub workout_type: String,
    pub duration_minutes: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseToml {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set numbers follow list order, starting at 1.
    #[serde(default)]
    pub sets: Vec<SetToml>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f32>,
}

/// A weekday given as an index or a name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WeekdayToml {
    Index(i64),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleToml {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub weekdays: Vec<WeekdayToml>,
    pub start_time: String,
    /// Inclusive, as a quoted `YYYY-MM-DD` string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

fn default_enabled() -> bool {
    true
}

impl WeekdayToml {
    pub fn to_index(&self) -> Result<u8, TemplateParseError> {
        match self {
            Self::Index(i) => u8::try_from(*i)
                .ok()
                .filter(|d| *d <= 6)
                .ok_or_else(|| TemplateParseError::InvalidWeekday(i.to_string())),
            Self::Name(name) => parse_weekday_name(name)
                .ok_or_else(|| TemplateParseError::InvalidWeekday(name.clone())),
        }
    }
}

impl ScheduleToml {
    /// Weekday indices, sorted with duplicates removed.
    pub fn weekday_indices(&self) -> Result<Vec<u8>, TemplateParseError> {
        let mut days = self
            .weekdays
            .iter()
            .map(WeekdayToml::to_index)
            .collect::<Result<Vec<_>, _>>()?;
        days.sort_unstable();
        days.dedup();
        Ok(days)
    }

    pub fn start_time(&self) -> Result<NaiveTime, TemplateParseError> {
        parse_clock_time(&self.start_time)
            .ok_or_else(|| TemplateParseError::InvalidStartTime(self.start_time.clone()))
    }
}

/// Parse and validate a template definition.
pub fn parse_template_toml(content: &str) -> Result<TemplateToml, TemplateParseError> {
    let def: TemplateToml = toml::from_str(content)?;
    validate(&def)?;
    Ok(def)
}

fn validate(def: &TemplateToml) -> Result<(), TemplateParseError> {
    if def.template.name.trim().is_empty() {
        return Err(TemplateParseError::BlankName);
    }
    if def.template.workout_type.trim().is_empty() {
        return Err(TemplateParseError::BlankType);
    }
    if def.template.duration_minutes <= 0 {
        return Err(TemplateParseError::InvalidDuration(
            def.template.duration_minutes,
        ));
    }
    for (i, exercise) in def.exercises.iter().enumerate() {
        if exercise.name.trim().is_empty() {
            return Err(TemplateParseError::BlankExerciseName(i + 1));
        }
    }
    if let Some(schedule) = &def.schedule {
        let days = schedule.weekday_indices()?;
        if schedule.enabled && days.is_empty() {
            return Err(TemplateParseError::NoWeekdays);
        }
        schedule.start_time()?;
    }
    Ok(())
}
