//! Event pipeline: admission, queueing, batching and dispatch.
//!
//! This module contains:
//! - The debounce gate that filters repeated activity
//! - The pending heartbeat queue
//! - Batch assembly into one wakatime-cli invocation per flush
//! - The process runner abstraction
//! - [`EventPipeline`], which ties them together with a flush thread

pub mod batch;
pub mod debounce;
pub mod driver;
pub mod process;
pub mod queue;

// Re-export commonly used types
pub use batch::{split_cli_arg, Batch, Invocation};
pub use debounce::{DebounceGate, DebounceState};
pub use driver::{
    Admission, BinaryLocator, EventPipeline, FixedBinary, FlushOutcome, PipelineSettings,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_HEARTBEAT_FREQUENCY,
};
pub use process::{CommandRunner, ProcessError, ProcessOutput, ProcessRunner};
pub use queue::PendingQueue;
