//! Heartbeat pipeline counters.
//!
//! Counts what the pipeline accepted, dropped and sent so `status` can show
//! it. Only counts are kept, never entity names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current process.
#[derive(Debug)]
pub struct PipelineStats {
    /// Activity events turned into queued heartbeats
    accepted: AtomicU64,
    /// Activity events suppressed by the debounce gate
    debounced: AtomicU64,
    /// Heartbeats dropped for missing required flags
    rejected: AtomicU64,
    /// wakatime-cli invocations attempted
    batches: AtomicU64,
    /// Heartbeats carried by successful invocations
    sent: AtomicU64,
    /// Heartbeats carried by failed invocations
    failed: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            debounced: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Counters that [`save`](Self::save) to `path`.
    ///
    /// Starts from zero; call [`load`](Self::load) to continue from the
    /// saved totals.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);
        stats
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_debounced(&self) {
        self.debounced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, count: u64) {
        self.rejected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, count: u64) {
        self.sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            debounced: self.debounced.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        self.snapshot().summary()
    }

    /// Save totals to disk, if persistence is enabled.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let snapshot = self.snapshot();
            let persisted = PersistedStats {
                accepted: snapshot.accepted,
                debounced: snapshot.debounced,
                rejected: snapshot.rejected,
                batches: snapshot.batches,
                sent: snapshot.sent,
                failed: snapshot.failed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Continue from the totals saved at the persistence path, if any.
    ///
    /// A missing file is not an error. A corrupt one leaves the counters
    /// untouched.
    pub fn load(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = read_persisted(path)?;
                self.accepted.store(persisted.accepted, Ordering::Relaxed);
                self.debounced.store(persisted.debounced, Ordering::Relaxed);
                self.rejected.store(persisted.rejected, Ordering::Relaxed);
                self.batches.store(persisted.batches, Ordering::Relaxed);
                self.sent.store(persisted.sent, Ordering::Relaxed);
                self.failed.store(persisted.failed, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub debounced: u64,
    pub rejected: u64,
    pub batches: u64,
    pub sent: u64,
    pub failed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl StatsSnapshot {
    pub fn summary(&self) -> String {
        format!(
            "Heartbeat Statistics:\n\
             - Heartbeats queued: {}\n\
             - Activity events debounced: {}\n\
             - Heartbeats rejected (missing flags): {}\n\
             - wakatime-cli invocations: {}\n\
             - Heartbeats sent: {}\n\
             - Heartbeats in failed invocations: {}\n\
             - Session duration: {} seconds",
            self.accepted,
            self.debounced,
            self.rejected,
            self.batches,
            self.sent,
            self.failed,
            self.session_duration_secs
        )
    }
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedStats {
    pub accepted: u64,
    pub debounced: u64,
    pub rejected: u64,
    pub batches: u64,
    pub sent: u64,
    pub failed: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read totals saved by [`PipelineStats::save`].
pub fn read_persisted(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

/// Thread-safe shared stats.
pub type SharedPipelineStats = Arc<PipelineStats>;

/// Create new shared stats.
pub fn create_shared_stats() -> SharedPipelineStats {
    Arc::new(PipelineStats::new())
}

/// Create new shared stats with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedPipelineStats {
    Arc::new(PipelineStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = PipelineStats::new();
        stats.record_accepted();
        stats.record_accepted();
        stats.record_debounced();
        stats.record_batch();
        stats.record_sent(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.accepted, 2);
        assert_eq!(snapshot.debounced, 1);
        assert_eq!(snapshot.batches, 1);
        assert_eq!(snapshot.sent, 2);
        assert_eq!(snapshot.failed, 0);
    }


    #[test]
    fn test_summary_format() {
        let summary = PipelineStats::new().summary();
        assert!(summary.contains("Heartbeats queued"));
        assert!(summary.contains("wakatime-cli invocations"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.json");

        let stats = PipelineStats::with_persistence(path.clone());
        stats.record_accepted();
        stats.record_sent(1);
        stats.save().unwrap();

        let reloaded = PipelineStats::with_persistence(path.clone());
        assert_eq!(reloaded.snapshot().accepted, 0);
        reloaded.load().unwrap();
        assert_eq!(reloaded.snapshot().accepted, 1);
        assert_eq!(reloaded.snapshot().sent, 1);
        assert_eq!(read_persisted(&path).unwrap().sent, 1);
    }

    #[test]
    fn test_load_without_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let stats = PipelineStats::with_persistence(dir.path().join("stats.json"));
        stats.load().unwrap();
        assert_eq!(stats.snapshot().accepted, 0);
    }

    #[test]
    fn test_corrupt_file_is_reported_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "{not json").unwrap();

        let stats = PipelineStats::with_persistence(path.clone());
        stats.record_accepted();
        assert!(stats.load().is_err());
        assert_eq!(stats.snapshot().accepted, 1);

        // Saving replaces the corrupt file.
        stats.save().unwrap();
        assert_eq!(read_persisted(&path).unwrap().accepted, 1);
    }
}
