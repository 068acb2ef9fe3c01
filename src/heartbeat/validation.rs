//! Required-flag validation for heartbeats.

use super::event::Heartbeat;
use crate::flags::name::REQUIRED;
use crate::flags::FlagName;
use crate::logging::Logger;
use std::sync::Arc;

/// A required flag is absent from a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("heartbeat is missing required flag {flag}")]
pub struct MissingFlagError {
    pub flag: FlagName,
}

/// One or more required flags are absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("heartbeat is missing {} required flag(s): {}", .errors.len(), names(.errors))]
pub struct MissingFlagsError {
    errors: Vec<MissingFlagError>,
}

fn names(errors: &[MissingFlagError]) -> String {
    errors
        .iter()
        .map(|e| e.flag.cli())
        .collect::<Vec<_>>()
        .join(", ")
}

impl MissingFlagsError {
    /// One error per missing flag, in check order.
    pub fn inner(&self) -> &[MissingFlagError] {
        &self.errors
    }

    pub fn missing(&self) -> impl Iterator<Item = FlagName> + '_ {
        self.errors.iter().map(|e| e.flag)
    }
}

/// Checks heartbeats against the required flag set.
///
/// Validity is recomputed on every call; nothing is cached on the heartbeat.
#[derive(Clone)]
pub struct Validator {
    logger: Arc<dyn Logger>,
}

impl Validator {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    /// Required flags absent from `heartbeat`, in check order.
    pub fn missing_flags(heartbeat: &Heartbeat) -> Vec<FlagName> {
        REQUIRED
            .iter()
            .copied()
            .filter(|name| !heartbeat.has_flag(*name))
            .collect()
    }

    /// Whether every required flag is present.
    ///
    /// Each missing flag is logged as an error. With `throw_on_missing` the
    /// missing flags are returned as one aggregate error instead of `Ok(false)`.
    pub fn is_valid(
        &self,
        heartbeat: &Heartbeat,
        throw_on_missing: bool,
    ) -> Result<bool, MissingFlagsError> {
        let missing = Self::missing_flags(heartbeat);
        for name in &missing {
            self.logger
                .error(&format!("Heartbeat is missing required flag {name}"), None);
        }

        if missing.is_empty() {
            return Ok(true);
        }
        if throw_on_missing {
            return Err(MissingFlagsError {
                errors: missing
                    .into_iter()
                    .map(|flag| MissingFlagError { flag })
                    .collect(),
            });
        }
        Ok(false)
    }
}
