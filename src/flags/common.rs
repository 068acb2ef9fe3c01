//! Constructors for the flags shared by every heartbeat.

use super::flag::Flag;
use super::name::{KEY, LANGUAGE, PLUGIN};
use super::registry::FlagRegistry;

/// `--key`: masked in logs and never sent inside extra heartbeats.
pub fn api_key(key: impl Into<String>) -> Flag {
    Flag::text(KEY, key).obfuscatable().primary_only()
}

/// `--plugin`: the editor/plugin user agent, primary heartbeat only.
pub fn plugin(user_agent: impl Into<String>) -> Flag {
    Flag::text(PLUGIN, user_agent).primary_only()
}

/// `--language` override, also sent with extra heartbeats.
pub fn language(language: impl Into<String>) -> Flag {
    Flag::text(LANGUAGE, language)
}

/// Build a common-flags registry from the process-wide identity values.
pub fn common_flags(
    api_key_value: Option<&str>,
    plugin_value: &str,
    language_value: Option<&str>,
) -> FlagRegistry {
    let mut registry = FlagRegistry::new();
    if let Some(key) = api_key_value.filter(|k| !k.is_empty()) {
        registry.add_flag(api_key(key), true);
    }
    registry.add_flag(plugin(plugin_value), true);
    if let Some(lang) = language_value.filter(|l| !l.is_empty()) {
        registry.add_flag(language(lang), true);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_flags_skip_empty_values() {
        let registry = common_flags(Some(""), "vim/9.0 vim-wakatime/11.0", None);
        assert!(!registry.has_flag(KEY));
        assert!(registry.has_flag(PLUGIN));
        assert!(!registry.has_flag(LANGUAGE));
    }

    #[test]
    fn test_common_flag_bits() {
        let registry = common_flags(Some("abcdef"), "p", Some("Rust"));
        let key = registry.get_flag(KEY).unwrap();
        assert!(key.can_obfuscate());
        assert!(!key.include_in_extra());
        assert!(registry.get_flag(LANGUAGE).unwrap().include_in_extra());
        assert_eq!(registry.to_json_object(false), "{\"language\": \"Rust\"}");
    }
}
