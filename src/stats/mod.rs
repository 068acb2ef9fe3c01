//! Statistics about heartbeat collection and delivery.

pub mod counters;

// Re-export commonly used types
pub use counters::{
    create_shared_stats, create_shared_stats_with_persistence, read_persisted, PersistedStats,
    PipelineStats, SharedPipelineStats, StatsSnapshot,
};
