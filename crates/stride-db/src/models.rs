use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Role of a user, as reported by the identity system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coach,
    Athlete,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Coach => "coach",
            Self::Athlete => "athlete",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coach" => Ok(Self::Coach),
            "athlete" => Ok(Self::Athlete),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Role`] string.
#[derive(Debug, Clone)]
pub struct RoleParseError(pub String);

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role: {:?} (expected coach or athlete)", self.0)
    }
}

impl std::error::Error for RoleParseError {}

// ---------------------------------------------------------------------------

/// Lifecycle of a weekly plan. The only transition is `draft -> published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Published,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Published => "published",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanStatus {
    type Err = PlanStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(PlanStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanStatus`] string.
#[derive(Debug, Clone)]
pub struct PlanStatusParseError(pub String);

impl fmt::Display for PlanStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid plan status: {:?}", self.0)
    }
}

impl std::error::Error for PlanStatusParseError {}

// ---------------------------------------------------------------------------

/// Kind of training event within a plan day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Practice,
    Lift,
    Conditioning,
    Recovery,
    Competition,
    Optional,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Practice => "practice",
            Self::Lift => "lift",
            Self::Conditioning => "conditioning",
            Self::Recovery => "recovery",
            Self::Competition => "competition",
            Self::Optional => "optional",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionType {
    type Err = SessionTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practice" => Ok(Self::Practice),
            "lift" => Ok(Self::Lift),
            "conditioning" => Ok(Self::Conditioning),
            "recovery" => Ok(Self::Recovery),
            "competition" => Ok(Self::Competition),
            "optional" => Ok(Self::Optional),
            other => Err(SessionTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SessionType`] string.
#[derive(Debug, Clone)]
pub struct SessionTypeParseError(pub String);

impl fmt::Display for SessionTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session type: {:?}", self.0)
    }
}

impl std::error::Error for SessionTypeParseError {}

// ---------------------------------------------------------------------------
// Row structs: identity and group directory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A named audience managed by a coach.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AthleteGroup {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// URL-safe, unique per owner.
    pub slug: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMembership {
    pub group_id: Uuid,
    pub athlete_id: Uuid,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Row structs: weekly plans
// ---------------------------------------------------------------------------

/// One authored plan for one coach, anchored to a calendar week.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeeklyPlan {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub week_start_date: NaiveDate,
    pub status: PlanStatus,
    pub source_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A weekday slot within a plan. Has no fixed date until publish.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanDay {
    pub id: Uuid,
    pub plan_id: Uuid,
    /// 0 = Sunday ... 6 = Saturday.
    pub day_of_week: i16,
    pub is_off_day: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanSession {
    pub id: Uuid,
    pub day_id: Uuid,
    pub session_type: SessionType,
    pub title: Option<String>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub is_optional: bool,
    pub sort_order: i32,
    /// Author intent: the parsed session named target groups.
    pub for_specific_groups: bool,
    /// Groups the references resolved to at build time (possibly empty).
    pub target_group_ids: Vec<Uuid>,
}

/// A plan session joined with the weekday of its day, as the publisher
/// consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduledPlanSession {
    pub id: Uuid,
    pub day_of_week: i16,
    pub session_type: SessionType,
    pub title: Option<String>,
    pub for_specific_groups: bool,
    pub target_group_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanExercise {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub sort_order: i32,
    pub for_specific_groups: bool,
    pub target_group_ids: Vec<Uuid>,
}

/// The materialized instruction for one athlete on one date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignedWorkout {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub plan_session_id: Uuid,
    pub workout_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub athlete_notes: Option<String>,
    pub perceived_effort: Option<i16>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Row structs: templates and generated sessions
// ---------------------------------------------------------------------------

/// A reusable workout blueprint. Not a calendar event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingTemplate {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub workout_type: String,
    pub duration_minutes: i32,
    pub intensity: Option<String>,
    pub focus: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateExercise {
    pub id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateSet {
    pub id: Uuid,
    pub template_exercise_id: Uuid,
    pub set_number: i32,
    pub reps: Option<i32>,
    pub weight: Option<f32>,
    pub rpe: Option<f32>,
}

/// Weekly recurrence attached to a template (at most one per template).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TemplateSchedule {
    pub template_id: Uuid,
    pub enabled: bool,
    /// Weekday indexes, 0 = Sunday ... 6 = Saturday.
    pub weekdays: Vec<i16>,
    pub start_time: NaiveTime,
    /// Inclusive upper bound for generated occurrences.
    pub end_date: Option<NaiveDate>,
}

/// A dated, concrete workout occurrence.
///
/// `template_id` and `scheduled_date` are both set only for recurring
/// occurrences; one-off copies leave them unset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub template_id: Option<Uuid>,
    pub scheduled_date: Option<NaiveDate>,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub workout_type: String,
    pub intensity: Option<String>,
    pub focus: Option<String>,
    pub notes: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionExercise {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub notes: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionSet {
    pub id: Uuid,
    pub session_exercise_id: Uuid,
    pub set_number: i32,
    pub reps: Option<i32>,
    pub weight: Option<f32>,
    pub rpe: Option<f32>,
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
