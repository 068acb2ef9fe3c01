//! Flag identities understood by wakatime-cli.
//!
//! A flag is identified by its command-line switch. The same identity also
//! carries the member name used when the heartbeat travels as JSON on the
//! extra-heartbeats stdin channel.

use std::fmt;

/// Identity of a flag: CLI switch plus JSON member name.
///
/// Two names are the same flag when their switches match.
#[derive(Debug, Clone, Copy, Eq)]
pub struct FlagName {
    cli: &'static str,
    json: &'static str,
}

impl FlagName {
    /// Create a flag identity.
    pub const fn new(cli: &'static str, json: &'static str) -> Self {
        Self { cli, json }
    }

    /// The command-line switch, e.g. `--entity`.
    pub fn cli(&self) -> &'static str {
        self.cli
    }

    /// The JSON member name, e.g. `entity`.
    pub fn json(&self) -> &'static str {
        self.json
    }
}

impl PartialEq for FlagName {
    fn eq(&self, other: &Self) -> bool {
        self.cli == other.cli
    }
}

impl std::hash::Hash for FlagName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.cli.hash(state);
    }
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli)
    }
}

pub const KEY: FlagName = FlagName::new("--key", "key");
pub const PLUGIN: FlagName = FlagName::new("--plugin", "plugin");
pub const ENTITY: FlagName = FlagName::new("--entity", "entity");
pub const ENTITY_TYPE: FlagName = FlagName::new("--entity-type", "type");
pub const TIME: FlagName = FlagName::new("--time", "time");
pub const CATEGORY: FlagName = FlagName::new("--category", "category");
pub const WRITE: FlagName = FlagName::new("--write", "is_write");
pub const ALTERNATE_PROJECT: FlagName = FlagName::new("--alternate-project", "alternate_project");
pub const PROJECT: FlagName = FlagName::new("--project", "project");
pub const LANGUAGE: FlagName = FlagName::new("--language", "language");
pub const LINENO: FlagName = FlagName::new("--lineno", "lineno");
pub const CURSORPOS: FlagName = FlagName::new("--cursorpos", "cursorpos");
pub const LINES_IN_FILE: FlagName = FlagName::new("--lines-in-file", "lines");
pub const ALTERNATE_BRANCH: FlagName = FlagName::new("--alternate-branch", "alternate_branch");
pub const IS_UNSAVED_ENTITY: FlagName = FlagName::new("--is-unsaved-entity", "is_unsaved_entity");
pub const EXTRA_HEARTBEATS: FlagName = FlagName::new("--extra-heartbeats", "extra_heartbeats");

/// Flags every heartbeat must carry before it may be sent, in check order.
pub const REQUIRED: [FlagName; 6] = [KEY, PLUGIN, ENTITY, ENTITY_TYPE, TIME, CATEGORY];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_the_cli_switch() {
        let renamed = FlagName::new("--entity", "path");
        assert_eq!(renamed, ENTITY);
        assert_ne!(ENTITY, ENTITY_TYPE);
    }

    #[test]
    fn test_display_uses_switch() {
        assert_eq!(ENTITY_TYPE.to_string(), "--entity-type");
        assert_eq!(ENTITY_TYPE.json(), "type");
    }
}
