//! Ordered, unique-keyed collection of flags.

use super::flag::Flag;
use super::name::FlagName;

/// Mapping from flag identity to flag.
///
/// Iteration follows insertion order, and replacing a flag keeps its
/// original position, so argument lists and JSON objects are reproducible.
/// Heartbeats carry a dozen or so flags; a linear scan beats hashing here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagRegistry {
    flags: Vec<Flag>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: FlagName) -> Option<usize> {
        self.flags.iter().position(|f| f.name() == name)
    }

    /// Insert a flag. An existing entry is replaced only when `overwrite` is set.
    pub fn add_flag(&mut self, flag: Flag, overwrite: bool) {
        match self.position(flag.name()) {
            Some(i) if overwrite => self.flags[i] = flag,
            Some(_) => {}
            None => self.flags.push(flag),
        }
    }

    /// Remove a flag; absent names are ignored.
    pub fn remove_flag(&mut self, name: FlagName) {
        if let Some(i) = self.position(name) {
            self.flags.remove(i);
        }
    }

    pub fn has_flag(&self, name: FlagName) -> bool {
        self.position(name).is_some()
    }

    pub fn get_flag(&self, name: FlagName) -> Option<&Flag> {
        self.flags.iter().find(|f| f.name() == name)
    }

    /// Copy in every flag of `other` that is not already present.
    pub fn merge_missing(&mut self, other: &FlagRegistry) {
        for flag in other.iter() {
            self.add_flag(flag.clone(), false);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Command-line renderings of all flags, skipping those that render empty.
    pub fn to_cli_args(&self, obfuscate: bool) -> Vec<String> {
        self.flags
            .iter()
            .map(|f| f.to_cli(obfuscate))
            .filter(|arg| !arg.is_empty())
            .collect()
    }

    /// Render as a single JSON object.
    ///
    /// Unless `include_non_extra_fields` is set, flags that are not eligible
    /// for extra heartbeats are left out.
    pub fn to_json_object(&self, include_non_extra_fields: bool) -> String {
        let members: Vec<String> = self
            .flags
            .iter()
            .filter(|f| include_non_extra_fields || f.include_in_extra())
            .map(Flag::to_json)
            .filter(|member| !member.is_empty())
            .collect();
        format!("{{{}}}", members.join(","))
    }
}

impl<'a> IntoIterator for &'a FlagRegistry {
    type Item = &'a Flag;
    type IntoIter = std::slice::Iter<'a, Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::name::{CATEGORY, ENTITY, KEY, PLUGIN, WRITE};

    #[test]
    fn test_add_without_overwrite_keeps_existing() {
        let mut registry = FlagRegistry::new();
        registry.add_flag(Flag::text(ENTITY, "first"), true);
        registry.add_flag(Flag::text(ENTITY, "second"), false);

        assert_eq!(registry.get_flag(ENTITY).unwrap().value(false), "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_with_overwrite_replaces_in_place() {
        let mut registry = FlagRegistry::new();
        registry.add_flag(Flag::text(ENTITY, "first"), true);
        registry.add_flag(Flag::text(CATEGORY, "coding"), true);
        registry.add_flag(Flag::text(ENTITY, "second"), true);

        assert_eq!(registry.get_flag(ENTITY).unwrap().value(false), "second");
        let order: Vec<_> = registry.iter().map(|f| f.name()).collect();
        assert_eq!(order, vec![ENTITY, CATEGORY]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = FlagRegistry::new();
        registry.add_flag(Flag::text(ENTITY, "a"), true);
        registry.remove_flag(KEY);
        assert!(registry.has_flag(ENTITY));

        registry.remove_flag(ENTITY);
        assert!(!registry.has_flag(ENTITY));
        assert!(registry.get_flag(ENTITY).is_none());
    }

    #[test]
    fn test_cli_args_skip_empty_renderings() {
        let mut registry = FlagRegistry::new();
        registry.add_flag(Flag::text(ENTITY, "/src/lib.rs"), true);
        registry.add_flag(Flag::boolean(WRITE, false), true);
        registry.add_flag(Flag::text(CATEGORY, ""), true);
        registry.add_flag(Flag::text(KEY, "secret-key").obfuscatable(), true);

        assert_eq!(
            registry.to_cli_args(false),
            vec!["--entity\" \"/src/lib.rs", "--key\" \"secret-key"]
        );
        assert_eq!(
            registry.to_cli_args(true),
            vec!["--entity\" \"/src/lib.rs", "--key\" \"XXXXXX-key"]
        );
    }

    #[test]
    fn test_json_object_respects_extra_eligibility() {
        let mut registry = FlagRegistry::new();
        registry.add_flag(Flag::text(KEY, "k").primary_only(), true);
        registry.add_flag(Flag::text(ENTITY, "a.rs"), true);
        registry.add_flag(Flag::boolean(WRITE, false), true);
        registry.add_flag(Flag::text(PLUGIN, "").primary_only(), true);

        assert_eq!(
            registry.to_json_object(false),
            "{\"entity\": \"a.rs\",\"is_write\": false}"
        );
        assert_eq!(
            registry.to_json_object(true),
            "{\"key\": \"k\",\"entity\": \"a.rs\",\"is_write\": false}"
        );
        assert_eq!(FlagRegistry::new().to_json_object(false), "{}");
    }

    #[test]
    fn test_merge_missing_does_not_override() {
        let mut common = FlagRegistry::new();
        common.add_flag(Flag::text(KEY, "common-key"), true);
        common.add_flag(Flag::text(PLUGIN, "vim/9 vim-wakatime/11"), true);

        let mut registry = FlagRegistry::new();
        registry.add_flag(Flag::text(KEY, "own-key"), true);
        registry.merge_missing(&common);

        assert_eq!(registry.get_flag(KEY).unwrap().value(false), "own-key");
        assert!(registry.has_flag(PLUGIN));
    }
}
