//! A single typed heartbeat attribute and its renderings.

use super::json::json_escape;
use super::name::FlagName;
use super::obfuscate::obfuscate;

/// Typed value of a flag.
///
/// Each variant owns its value, CLI and JSON formatting, so rendering is an
/// exhaustive match rather than a runtime type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Bool(bool),
    Text(String),
}

impl FlagValue {
    /// Value as a plain string. Only text is ever masked.
    fn format_value(&self, obfuscated: bool) -> String {
        match self {
            FlagValue::Bool(b) => b.to_string(),
            FlagValue::Text(s) if obfuscated => obfuscate(s),
            FlagValue::Text(s) => s.clone(),
        }
    }

    /// Command-line form.
    ///
    /// A true boolean is the bare switch. Text becomes `switch" "value`, the
    /// quote-delimited pair split back into two tokens before the process
    /// is spawned (see [`crate::pipeline::Invocation::tokens`]).
    fn format_cli(&self, name: FlagName, formatted: &str) -> String {
        match self {
            FlagValue::Bool(true) => name.cli().to_string(),
            FlagValue::Bool(false) => String::new(),
            FlagValue::Text(_) if formatted.is_empty() => String::new(),
            FlagValue::Text(_) => format!("{}\" \"{}", name.cli(), formatted),
        }
    }

    /// JSON member form, `"name": value`.
    fn format_json(&self, name: FlagName, formatted: &str) -> String {
        if formatted.is_empty() {
            return String::new();
        }
        match self {
            FlagValue::Bool(_) => format!("\"{}\": {}", name.json(), formatted),
            FlagValue::Text(_) => format!(
                "\"{}\": \"{}\"",
                name.json(),
                json_escape(Some(formatted)).unwrap_or_default()
            ),
        }
    }
}

/// An immutable, named heartbeat attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    name: FlagName,
    value: FlagValue,
    can_obfuscate: bool,
    include_in_extra: bool,
}

impl Flag {
    /// A boolean flag, eligible for extra heartbeats.
    pub fn boolean(name: FlagName, value: bool) -> Self {
        Self {
            name,
            value: FlagValue::Bool(value),
            can_obfuscate: false,
            include_in_extra: true,
        }
    }

    /// A text flag, eligible for extra heartbeats.
    pub fn text(name: FlagName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: FlagValue::Text(value.into()),
            can_obfuscate: false,
            include_in_extra: true,
        }
    }

    /// Mark the value as secret so log renderings mask it.
    pub fn obfuscatable(mut self) -> Self {
        self.can_obfuscate = true;
        self
    }

    /// Keep this flag out of the extra-heartbeats payload.
    pub fn primary_only(mut self) -> Self {
        self.include_in_extra = false;
        self
    }

    pub fn name(&self) -> FlagName {
        self.name
    }

    pub fn raw(&self) -> &FlagValue {
        &self.value
    }

    pub fn can_obfuscate(&self) -> bool {
        self.can_obfuscate
    }

    pub fn include_in_extra(&self) -> bool {
        self.include_in_extra
    }

    /// Value as a string, masked when `obfuscate` is set and the flag allows it.
    pub fn value(&self, obfuscate: bool) -> String {
        self.value.format_value(obfuscate && self.can_obfuscate)
    }

    /// Command-line rendering; empty when the flag contributes no argument.
    pub fn to_cli(&self, obfuscate: bool) -> String {
        self.value.format_cli(self.name, &self.value(obfuscate))
    }

    /// JSON member rendering; empty when the value is empty.
    pub fn to_json(&self) -> String {
        self.value.format_json(self.name, &self.value(false))
    }
}
