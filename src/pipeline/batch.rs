//! Turning queued heartbeats into one wakatime-cli invocation.

use super::queue::PendingQueue;
use crate::flags::name::EXTRA_HEARTBEATS;
use crate::flags::{Flag, FlagRegistry};
use crate::heartbeat::{heartbeats_to_json, Heartbeat};
use std::path::PathBuf;

/// One flush worth of heartbeats: the primary goes out as command-line
/// arguments, the extras as a JSON array on stdin.
#[derive(Debug, Clone)]
pub struct Batch {
    pub primary: Heartbeat,
    pub extras: Vec<Heartbeat>,
}

#[allow(clippy::len_without_is_empty)]
impl Batch {
    /// Dequeue the head as primary and drain the rest as extras.
    pub fn take(queue: &PendingQueue) -> Option<Self> {
        let primary = queue.pop()?;
        Some(Self {
            primary,
            extras: queue.drain(),
        })
    }

    /// Number of heartbeats in the batch; never zero.
    pub fn len(&self) -> usize {
        1 + self.extras.len()
    }

    /// Fill in common flags the primary does not already carry.
    pub fn merge_common(&mut self, common: &FlagRegistry) {
        self.primary.flags_mut().merge_missing(common);
    }

    /// Build the invocation. Common flags should already be merged.
    pub fn into_invocation(mut self, binary: PathBuf) -> Invocation {
        let stdin = if self.extras.is_empty() {
            None
        } else {
            self.primary.flags_mut().add_flag(
                Flag::boolean(EXTRA_HEARTBEATS, true).primary_only(),
                true,
            );
            Some(heartbeats_to_json(&self.extras))
        };

        Invocation {
            binary,
            args: self.primary.to_cli_args(false),
            display_args: self.primary.to_cli_args(true),
            stdin,
        }
    }
}

/// A fully rendered wakatime-cli call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub binary: PathBuf,
    /// Flag renderings, one entry per flag (`--switch" "value` or `--switch`)
    pub args: Vec<String>,
    /// Same as `args` with secret values masked; for logs only
    pub display_args: Vec<String>,
    /// Extra heartbeats JSON array
    pub stdin: Option<String>,
}

impl Invocation {
    /// Process argument tokens: each rendering split into switch and value.
    pub fn tokens(&self) -> Vec<String> {
        self.args.iter().flat_map(|arg| split_cli_arg(arg)).collect()
    }

    /// Masked command line with every token quoted, for logs.
    pub fn command_line(&self) -> String {
        let mut line = format!("\"{}\"", self.binary.display());
        for arg in &self.display_args {
            line.push_str(" \"");
            line.push_str(arg);
            line.push('"');
        }
        line
    }

    /// Number of extra heartbeats carried on stdin.
    pub fn extra_count(&self) -> usize {
        self.stdin
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<serde_json::Value>>(s).ok())
            .map_or(0, |v| v.len())
    }
}

/// Split a `--switch" "value` rendering into its two tokens.
///
/// Bare switches come back as a single token.
pub fn split_cli_arg(arg: &str) -> Vec<String> {
    match arg.split_once("\" \"") {
        Some((switch, value)) => vec![switch.to_string(), value.to_string()],
        None => vec![arg.to_string()],
    }
}
