//! The structured plan contract produced by the external text parser.
//!
//! Field names follow the parser's JSON (`dayOfWeek`, `forGroups`, ...).
//! `forGroups` may be `null`, absent, or empty; all three mean the session
//! or exercise applies to everyone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stride_db::models::SessionType;

#[derive(Debug, Error)]
pub enum PlanInputError {
    #[error("plan JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedPlan {
    #[serde(default)]
    pub days: Vec<ParsedDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDay {
    /// Weekday name, e.g. `"Wednesday"` or `"wed"`.
    pub day_of_week: String,
    #[serde(default)]
    pub is_off_day: bool,
    #[serde(default)]
    pub sessions: Vec<ParsedSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSession {
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub for_groups: Option<Vec<String>>,
    #[serde(default)]
    pub exercises: Vec<ParsedExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedExercise {
    pub name: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub for_groups: Option<Vec<String>>,
}

impl ParsedPlan {
    pub fn from_json(content: &str) -> Result<Self, PlanInputError> {
        Ok(serde_json::from_str(content)?)
    }
}
