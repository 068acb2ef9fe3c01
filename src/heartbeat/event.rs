//! The heartbeat record and its builder methods.

use super::types::{Activity, Category, EntityType};
use crate::flags::name::{
    ALTERNATE_BRANCH, ALTERNATE_PROJECT, CATEGORY, CURSORPOS, ENTITY, ENTITY_TYPE,
    IS_UNSAVED_ENTITY, LANGUAGE, LINENO, LINES_IN_FILE, PROJECT, TIME, WRITE,
};
use crate::flags::{Flag, FlagName, FlagRegistry};
use chrono::{DateTime, Utc};

/// Render a timestamp the way wakatime-cli reads `--time`: unix seconds
/// with millisecond fraction.
pub fn format_time(time: DateTime<Utc>) -> String {
    format!("{}.{:03}", time.timestamp(), time.timestamp_subsec_millis())
}

/// One recorded instant of developer activity.
///
/// A heartbeat is a flag registry seeded with a timestamp, the `coding`
/// category and the `file` entity type. Builder methods replace flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    flags: FlagRegistry,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Heartbeat {
    /// Heartbeat stamped with the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Heartbeat stamped with `time`.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::seeded(FlagRegistry::new(), time)
    }

    /// Heartbeat starting from a copy of the common flags.
    ///
    /// Defaults only fill gaps: a category or entity type present in the
    /// common flags wins over the seeded one.
    pub fn from_common(common: &FlagRegistry, time: DateTime<Utc>) -> Self {
        Self::seeded(common.clone(), time)
    }

    fn seeded(mut flags: FlagRegistry, time: DateTime<Utc>) -> Self {
        flags.add_flag(Flag::text(TIME, format_time(time)), false);
        flags.add_flag(Flag::text(CATEGORY, Category::default().as_str()), false);
        flags.add_flag(Flag::text(ENTITY_TYPE, EntityType::default().as_str()), false);
        Self { flags }
    }

    /// Heartbeat for an editor activity callback, stamped with `time`.
    pub fn from_activity(common: &FlagRegistry, activity: &Activity, time: DateTime<Utc>) -> Self {
        let mut heartbeat = Self::from_common(common, time)
            .entity(activity.entity.clone())
            .time(time)
            .is_write(activity.is_write)
            .category(activity.category.unwrap_or_default())
            .entity_type(activity.entity_type.unwrap_or_default());
        if let Some(project) = activity.alternate_project.as_deref() {
            heartbeat = heartbeat.alternate_project(project);
        }
        heartbeat
    }

    /// Set or replace an arbitrary flag.
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.add_flag(flag, true);
        self
    }

    pub fn entity(self, entity: impl Into<String>) -> Self {
        self.with_flag(Flag::text(ENTITY, entity))
    }

    pub fn time(self, time: DateTime<Utc>) -> Self {
        self.with_flag(Flag::text(TIME, format_time(time)))
    }

    pub fn category(self, category: Category) -> Self {
        self.with_flag(Flag::text(CATEGORY, category.as_str()))
    }

    pub fn entity_type(self, entity_type: EntityType) -> Self {
        self.with_flag(Flag::text(ENTITY_TYPE, entity_type.as_str()))
    }

    pub fn is_write(self, is_write: bool) -> Self {
        self.with_flag(Flag::boolean(WRITE, is_write))
    }

    /// Fallback project name. Empty names are ignored.
    pub fn alternate_project(self, project: impl Into<String>) -> Self {
        let project = project.into();
        if project.is_empty() {
            return self;
        }
        self.with_flag(Flag::text(ALTERNATE_PROJECT, project))
    }

    /// Project name that overrides detection.
    pub fn project(self, project: impl Into<String>) -> Self {
        self.with_flag(Flag::text(PROJECT, project))
    }

    pub fn language(self, language: impl Into<String>) -> Self {
        self.with_flag(Flag::text(LANGUAGE, language))
    }

    pub fn branch(self, branch: impl Into<String>) -> Self {
        self.with_flag(Flag::text(ALTERNATE_BRANCH, branch))
    }

    pub fn lineno(self, line: u32) -> Self {
        self.with_flag(Flag::text(LINENO, line.to_string()))
    }

    pub fn cursorpos(self, position: u32) -> Self {
        self.with_flag(Flag::text(CURSORPOS, position.to_string()))
    }

    pub fn lines_in_file(self, lines: u32) -> Self {
        self.with_flag(Flag::text(LINES_IN_FILE, lines.to_string()))
    }

    pub fn is_unsaved_entity(self, unsaved: bool) -> Self {
        self.with_flag(Flag::boolean(IS_UNSAVED_ENTITY, unsaved))
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FlagRegistry {
        &mut self.flags
    }

    pub fn has_flag(&self, name: FlagName) -> bool {
        self.flags.has_flag(name)
    }

    pub fn get_flag(&self, name: FlagName) -> Option<&Flag> {
        self.flags.get_flag(name)
    }

    pub fn to_cli_args(&self, obfuscate: bool) -> Vec<String> {
        self.flags.to_cli_args(obfuscate)
    }

    pub fn to_json_object(&self, include_non_extra_fields: bool) -> String {
        self.flags.to_json_object(include_non_extra_fields)
    }
}

impl From<FlagRegistry> for Heartbeat {
    /// Wrap a registry as-is, without seeding defaults.
    fn from(flags: FlagRegistry) -> Self {
        Self { flags }
    }
}

/// Serialize heartbeats as the JSON array wakatime-cli reads from stdin
/// alongside `--extra-heartbeats`. Only extra-eligible flags are included.
pub fn heartbeats_to_json(heartbeats: &[Heartbeat]) -> String {
    let objects: Vec<String> = heartbeats
        .iter()
        .map(|h| h.to_json_object(false))
        .collect();
    format!("[{}]", objects.join(","))
}
