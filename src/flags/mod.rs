//! Typed heartbeat attributes.
//!
//! A [`Flag`] knows how to render itself three ways: as a plain value (for
//! logs, optionally masked), as a command-line argument and as a JSON
//! member. A [`FlagRegistry`] holds flags in insertion order and renders
//! the whole set either as an argument list or as one JSON object.

pub mod common;
pub mod flag;
pub mod json;
pub mod name;
pub mod obfuscate;
pub mod registry;

// Re-export commonly used types
pub use common::common_flags;
pub use flag::{Flag, FlagValue};
pub use json::json_escape;
pub use name::FlagName;
pub use obfuscate::obfuscate;
pub use registry::FlagRegistry;
