//! Activity event types observed in the editor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the developer was doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    Coding,
    Building,
    Indexing,
    Debugging,
    #[serde(rename = "running tests")]
    RunningTests,
    #[serde(rename = "writing tests")]
    WritingTests,
    #[serde(rename = "manual testing")]
    ManualTesting,
    #[serde(rename = "code reviewing")]
    CodeReviewing,
    Browsing,
    Designing,
    Learning,
    Researching,
    Meeting,
    Planning,
    #[serde(rename = "writing docs")]
    WritingDocs,
    Communicating,
}

impl Category {
    /// The value wakatime-cli expects after `--category`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coding => "coding",
            Category::Building => "building",
            Category::Indexing => "indexing",
            Category::Debugging => "debugging",
            Category::RunningTests => "running tests",
            Category::WritingTests => "writing tests",
            Category::ManualTesting => "manual testing",
            Category::CodeReviewing => "code reviewing",
            Category::Browsing => "browsing",
            Category::Designing => "designing",
            Category::Learning => "learning",
            Category::Researching => "researching",
            Category::Meeting => "meeting",
            Category::Planning => "planning",
            Category::WritingDocs => "writing docs",
            Category::Communicating => "communicating",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Wire names use spaces; accept dashes from command lines too.
        let wanted = s.trim().to_lowercase().replace('-', " ");
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

const ALL_CATEGORIES: [Category; 16] = [
    Category::Coding,
    Category::Building,
    Category::Indexing,
    Category::Debugging,
    Category::RunningTests,
    Category::WritingTests,
    Category::ManualTesting,
    Category::CodeReviewing,
    Category::Browsing,
    Category::Designing,
    Category::Learning,
    Category::Researching,
    Category::Meeting,
    Category::Planning,
    Category::WritingDocs,
    Category::Communicating,
];

/// Kind of entity a heartbeat refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    File,
    Domain,
    App,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::File => "file",
            EntityType::Domain => "domain",
            EntityType::App => "app",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(EntityType::File),
            "domain" => Ok(EntityType::Domain),
            "app" => Ok(EntityType::App),
            _ => Err(format!("unknown entity type: {s}")),
        }
    }
}

/// One activity callback from the editor.
///
/// This is also the line format read by `wakatime-heartbeat watch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Path (or domain/app name) of the active entity
    pub entity: String,
    /// Whether the entity was just saved
    #[serde(default)]
    pub is_write: bool,
    /// Project name to use when wakatime-cli cannot detect one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
}

impl Activity {
    /// Activity on a file, without a save.
    pub fn file(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    /// Activity on a file that was just saved.
    pub fn write(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            is_write: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_names() {
        assert_eq!(Category::default().as_str(), "coding");
        assert_eq!(Category::RunningTests.to_string(), "running tests");

        let parsed: Category = serde_json::from_str("\"code reviewing\"").unwrap();
        assert_eq!(parsed, Category::CodeReviewing);
        let parsed: Category = serde_json::from_str("\"debugging\"").unwrap();
        assert_eq!(parsed, Category::Debugging);
    }

    #[test]
    fn test_parse_from_command_line() {
        assert_eq!("writing-tests".parse::<Category>(), Ok(Category::WritingTests));
        assert_eq!("Coding".parse::<Category>(), Ok(Category::Coding));
        assert!("napping".parse::<Category>().is_err());
        assert_eq!("domain".parse::<EntityType>(), Ok(EntityType::Domain));
        assert!("folder".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_activity_line_parsing() {
        let line = r#"{"entity": "/src/main.rs", "is_write": true, "entity_type": "file"}"#;
        let activity: Activity = serde_json::from_str(line).unwrap();
        assert_eq!(activity.entity, "/src/main.rs");
        assert!(activity.is_write);
        assert_eq!(activity.entity_type, Some(EntityType::File));
        assert!(activity.category.is_none());

        let minimal: Activity = serde_json::from_str(r#"{"entity": "a.rs"}"#).unwrap();
        assert_eq!(minimal, Activity::file("a.rs"));
    }
}
