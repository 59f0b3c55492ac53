//! Training templates: authoring, schedules, and session generation.

pub mod authoring;
pub mod generate;
pub mod toml_format;

pub use authoring::{
    ScheduleSpec, TemplateDetail, create_template, list_templates, set_schedule, template_detail,
};
pub use generate::{
    DEFAULT_WEEKS_AHEAD, MAX_WEEKS_AHEAD, SessionDetail, create_session_from_template,
    generate_from_template, session_detail,
};
pub use toml_format::{TemplateParseError, TemplateToml, parse_template_toml};
