//! Weekly plans: building a plan tree from parser output, publishing it to
//! athletes, and reading it back.

pub mod builder;
pub mod parsed;
pub mod publish;
pub mod view;

pub use builder::{BuildPlanRequest, BuiltPlan, build_plan};
pub use parsed::{ParsedDay, ParsedExercise, ParsedPlan, ParsedSession, PlanInputError};
pub use publish::{Audience, PublishOutcome, publish_plan};
pub use view::{PlanDetail, list_plans, plan_detail};
