//! WakaTime Heartbeat - editor activity reporting through wakatime-cli.
//!
//! This library turns editor activity callbacks into heartbeats and reports
//! them to WakaTime by invoking the external `wakatime-cli` helper.
//!
//! # Delivery Model
//!
//! - **Debounced**: repeated non-write activity on the same file is dropped
//!   inside the heartbeat frequency window (2 minutes by default)
//! - **Batched**: each flush makes exactly one wakatime-cli call; the oldest
//!   heartbeat goes in the arguments, the rest as JSON on stdin
//! - **Best effort**: a failed call is logged and its heartbeats dropped,
//!   never retried
//! - **Masked logs**: API keys are obfuscated whenever a command line is logged
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     WakaTime Heartbeat                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Activity   │──▶│  Debounce   │──▶│   Pending   │       │
//! │  │ (callbacks) │   │    Gate     │   │    Queue    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │ every 10s    │
//! │                                             ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │wakatime-cli │◀──│ Invocation  │◀──│    Batch    │       │
//! │  │  (process)  │   │ args + JSON │   │primary+extra│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use wakatime_heartbeat::{
//!     Activity, CommandRunner, EventPipeline, FixedBinary, PipelineSettings, TracingLogger,
//! };
//!
//! let mut pipeline = EventPipeline::new(
//!     PipelineSettings::default(),
//!     Arc::new(CommandRunner::new()),
//!     Arc::new(FixedBinary(PathBuf::from("/home/dev/.wakatime/wakatime-cli"))),
//!     Arc::new(TracingLogger),
//! );
//! pipeline.set_api_key("waka_00000000-0000-0000-0000-000000000000");
//! pipeline.set_plugin("vim/9.0 vim-wakatime/11.0");
//! pipeline.start();
//!
//! pipeline.handle_activity(&Activity::file("/home/dev/project/src/main.rs"));
//!
//! // Sends anything still queued before returning.
//! pipeline.shutdown();
//! ```

pub mod config;
pub mod flags;
pub mod heartbeat;
pub mod logging;
pub mod pipeline;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, PluginIdentity};
pub use flags::{Flag, FlagName, FlagRegistry, FlagValue};
pub use heartbeat::{
    heartbeats_to_json, Activity, Category, EntityType, Heartbeat, MissingFlagError,
    MissingFlagsError, Validator,
};
pub use logging::{init_logging, LogLevel, Logger, RecordingLogger, TracingLogger};
pub use pipeline::{
    Admission, BinaryLocator, CommandRunner, EventPipeline, FixedBinary, FlushOutcome,
    Invocation, PipelineSettings, ProcessError, ProcessOutput, ProcessRunner,
};
pub use stats::{PipelineStats, SharedPipelineStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
