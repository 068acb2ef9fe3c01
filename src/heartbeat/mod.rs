//! Heartbeats: one flag set per observed activity event.
//!
//! This module contains:
//! - Activity and category types reported by the editor
//! - The [`Heartbeat`] record with its builder methods
//! - Required-flag validation

pub mod event;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use event::{format_time, heartbeats_to_json, Heartbeat};
pub use types::{Activity, Category, EntityType};
pub use validation::{MissingFlagError, MissingFlagsError, Validator};
