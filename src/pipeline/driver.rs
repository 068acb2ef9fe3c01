//! The heartbeat event pipeline.
//!
//! Producers call [`EventPipeline::handle_activity`] from any thread. A
//! dedicated flush thread wakes every `flush_interval`, takes everything
//! queued as one [`Batch`] and hands it to wakatime-cli in a single
//! invocation. Failures are logged and the batch is dropped.

use super::batch::{Batch, Invocation};
use super::debounce::DebounceGate;
use super::process::ProcessRunner;
use super::queue::PendingQueue;
use crate::flags::{common, Flag, FlagName, FlagRegistry};
use crate::heartbeat::{Activity, Heartbeat, MissingFlagsError, Validator};
use crate::logging::Logger;
use crate::stats::{create_shared_stats, SharedPipelineStats};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default debounce window for repeated activity on one entity.
pub const DEFAULT_HEARTBEAT_FREQUENCY: Duration = Duration::from_secs(120);

/// Default period of the flush thread.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Timing and dispatch settings for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Non-write events for the same entity inside this window are dropped
    pub heartbeat_frequency: Duration,
    /// How often the flush thread drains the queue
    pub flush_interval: Duration,
    /// Run wakatime-cli on the flush thread and log its output
    pub debug: bool,
    /// Check required flags on the primary heartbeat before invoking wakatime-cli
    pub validate_on_flush: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            heartbeat_frequency: DEFAULT_HEARTBEAT_FREQUENCY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            debug: false,
            validate_on_flush: true,
        }
    }
}

/// Supplies the path of the wakatime-cli executable.
pub trait BinaryLocator: Send + Sync {
    fn cli_path(&self) -> PathBuf;
}

/// A locator that always returns the same path.
#[derive(Debug, Clone)]
pub struct FixedBinary(pub PathBuf);

impl BinaryLocator for FixedBinary {
    fn cli_path(&self) -> PathBuf {
        self.0.clone()
    }
}

/// What happened to an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A heartbeat was queued
    Queued,
    /// Suppressed by the debounce gate
    Debounced,
    /// No entity, or the pipeline is shut down
    Ignored,
}

/// Result of one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued
    Empty,
    /// Another flush was draining the queue; this one was skipped
    Busy,
    /// The primary heartbeat failed validation and the batch was dropped
    Invalid { heartbeats: usize },
    /// Handed to a background thread; the result is only logged
    Dispatched { heartbeats: usize },
    /// wakatime-cli exited successfully
    Sent { heartbeats: usize },
    /// wakatime-cli could not be run or exited with an error
    Failed { heartbeats: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Foreground,
    Background,
}

struct Shared {
    settings: PipelineSettings,
    common: RwLock<FlagRegistry>,
    gate: DebounceGate,
    queue: PendingQueue,
    flushing: Mutex<()>,
    closed: AtomicBool,
    runner: Arc<dyn ProcessRunner>,
    locator: Arc<dyn BinaryLocator>,
    logger: Arc<dyn Logger>,
    validator: Validator,
    stats: SharedPipelineStats,
    inflight: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn common(&self) -> FlagRegistry {
        self.common
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_common(&self, update: impl FnOnce(&mut FlagRegistry)) {
        let mut common = self.common.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut common);
    }

    fn timer_dispatch(&self) -> Dispatch {
        if self.settings.debug {
            Dispatch::Foreground
        } else {
            Dispatch::Background
        }
    }

    /// Drain the queue into one invocation.
    ///
    /// Only one flush drains at a time. With `wait` unset a flush that finds
    /// another in progress returns [`FlushOutcome::Busy`] immediately.
    fn flush(self: &Arc<Self>, dispatch: Dispatch, wait: bool) -> FlushOutcome {
        let _guard = if wait {
            self.flushing.lock().unwrap_or_else(PoisonError::into_inner)
        } else {
            match self.flushing.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    self.logger.debug("Flush already in progress, skipping");
                    return FlushOutcome::Busy;
                }
            }
        };

        let Some(mut batch) = Batch::take(&self.queue) else {
            return FlushOutcome::Empty;
        };
        let heartbeats = batch.len();
        batch.merge_common(&self.common());

        if self.settings.validate_on_flush
            && !matches!(self.validator.is_valid(&batch.primary, false), Ok(true))
        {
            self.logger.warning(&format!(
                "Dropping {heartbeats} heartbeat(s): primary heartbeat is missing required flags"
            ));
            self.stats.record_rejected(heartbeats as u64);
            return FlushOutcome::Invalid { heartbeats };
        }

        let invocation = batch.into_invocation(self.locator.cli_path());
        self.logger
            .debug(&format!("Sending heartbeat: {}", invocation.command_line()));
        if heartbeats > 1 {
            self.logger.debug(&format!(
                "Including {} extra heartbeat(s) on stdin",
                heartbeats - 1
            ));
        }
        self.stats.record_batch();

        match dispatch {
            Dispatch::Foreground => {
                if self.execute(&invocation, heartbeats) {
                    FlushOutcome::Sent { heartbeats }
                } else {
                    FlushOutcome::Failed { heartbeats }
                }
            }
            Dispatch::Background => self.spawn_send(invocation, heartbeats),
        }
    }

    /// Run wakatime-cli and log the result. Returns whether it succeeded.
    fn execute(&self, invocation: &Invocation, heartbeats: usize) -> bool {
        match self.runner.run(invocation) {
            Ok(output) if output.success => {
                if self.settings.debug {
                    if !output.stdout.trim().is_empty() {
                        self.logger
                            .debug(&format!("wakatime-cli stdout: {}", output.stdout.trim()));
                    }
                    if !output.stderr.trim().is_empty() {
                        self.logger
                            .debug(&format!("wakatime-cli stderr: {}", output.stderr.trim()));
                    }
                }
                self.stats.record_sent(heartbeats as u64);
                true
            }
            Ok(output) => {
                let status = output
                    .exit_code
                    .map_or_else(|| "a signal".to_string(), |code| format!("code {code}"));
                self.logger
                    .error(&format!("wakatime-cli exited with {status}"), None);
                if !output.stdout.trim().is_empty() {
                    self.logger
                        .error(&format!("wakatime-cli stdout: {}", output.stdout.trim()), None);
                }
                if !output.stderr.trim().is_empty() {
                    self.logger
                        .error(&format!("wakatime-cli stderr: {}", output.stderr.trim()), None);
                }
                self.stats.record_failed(heartbeats as u64);
                false
            }
            Err(e) => {
                self.logger.error("Failed to run wakatime-cli", Some(&e));
                self.stats.record_failed(heartbeats as u64);
                false
            }
        }
    }

    fn spawn_send(self: &Arc<Self>, invocation: Invocation, heartbeats: usize) -> FlushOutcome {
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("wakatime-send".to_string())
            .spawn(move || {
                shared.execute(&invocation, heartbeats);
            });

        match spawned {
            Ok(handle) => {
                let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
                inflight.retain(|h| !h.is_finished());
                inflight.push(handle);
                FlushOutcome::Dispatched { heartbeats }
            }
            Err(e) => {
                self.logger
                    .error("Failed to start background wakatime-cli thread", Some(&e));
                self.stats.record_failed(heartbeats as u64);
                FlushOutcome::Failed { heartbeats }
            }
        }
    }

    fn join_inflight(&self) {
        let handles = std::mem::take(
            &mut *self.inflight.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if handle.join().is_err() {
                self.logger.error("Background wakatime-cli thread panicked", None);
            }
        }
    }
}

struct FlushWorker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Debounces activity, queues heartbeats and reports them through wakatime-cli.
pub struct EventPipeline {
    shared: Arc<Shared>,
    worker: Option<FlushWorker>,
}

impl EventPipeline {
    /// Create a pipeline. The flush thread is not running until [`start`](Self::start).
    pub fn new(
        settings: PipelineSettings,
        runner: Arc<dyn ProcessRunner>,
        locator: Arc<dyn BinaryLocator>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::with_stats(settings, runner, locator, logger, create_shared_stats())
    }

    /// Create a pipeline that reports into existing stats.
    pub fn with_stats(
        settings: PipelineSettings,
        runner: Arc<dyn ProcessRunner>,
        locator: Arc<dyn BinaryLocator>,
        logger: Arc<dyn Logger>,
        stats: SharedPipelineStats,
    ) -> Self {
        let shared = Shared {
            gate: DebounceGate::new(settings.heartbeat_frequency),
            settings,
            common: RwLock::new(FlagRegistry::new()),
            queue: PendingQueue::new(),
            flushing: Mutex::new(()),
            closed: AtomicBool::new(false),
            runner,
            locator,
            validator: Validator::new(Arc::clone(&logger)),
            logger,
            stats,
            inflight: Mutex::new(Vec::new()),
        };
        Self {
            shared: Arc::new(shared),
            worker: None,
        }
    }

    /// Start the periodic flush thread.
    pub fn start(&mut self) {
        if self.worker.is_some() || self.is_closed() {
            self.shared
                .logger
                .warning("Heartbeat pipeline already started or shut down");
            return;
        }

        let (stop, stop_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let interval = self.shared.settings.flush_interval;
        let spawned = thread::Builder::new()
            .name("wakatime-flush".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        shared.flush(shared.timer_dispatch(), false);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => self.worker = Some(FlushWorker { stop, handle }),
            Err(e) => self
                .shared
                .logger
                .error("Failed to start heartbeat flush thread", Some(&e)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.shared.settings
    }

    pub fn stats(&self) -> SharedPipelineStats {
        Arc::clone(&self.shared.stats)
    }

    /// Number of heartbeats waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Record an editor activity callback.
    pub fn handle_activity(&self, activity: &Activity) -> Admission {
        self.handle_activity_at(activity, Utc::now())
    }

    /// Record an activity callback observed at `now`.
    pub fn handle_activity_at(&self, activity: &Activity, now: DateTime<Utc>) -> Admission {
        if activity.entity.is_empty() || self.is_closed() {
            return Admission::Ignored;
        }

        let shared = &self.shared;
        if shared
            .gate
            .should_drop(&activity.entity, activity.is_write, now)
        {
            shared.stats.record_debounced();
            shared.logger.debug(&format!(
                "Skipping heartbeat for {}: already sent within {}s",
                activity.entity,
                shared.gate.window().as_secs()
            ));
            return Admission::Debounced;
        }

        let heartbeat = Heartbeat::from_activity(&shared.common(), activity, now);
        shared.queue.push(heartbeat);
        shared.gate.record(&activity.entity, now);
        shared.stats.record_accepted();
        Admission::Queued
    }

    /// A heartbeat stamped now and pre-seeded with the common flags.
    pub fn new_heartbeat(&self) -> Heartbeat {
        Heartbeat::from_common(&self.shared.common(), Utc::now())
    }

    /// Validate a heartbeat and queue it.
    ///
    /// Common flags missing from the heartbeat are filled in first. An
    /// invalid heartbeat is dropped: `Ok(false)` normally, the aggregate
    /// error when `throw_on_invalid` is set.
    pub fn send(
        &self,
        mut heartbeat: Heartbeat,
        throw_on_invalid: bool,
    ) -> Result<bool, MissingFlagsError> {
        let shared = &self.shared;
        heartbeat.flags_mut().merge_missing(&shared.common());

        match shared.validator.is_valid(&heartbeat, throw_on_invalid) {
            Ok(true) => {
                shared.queue.push(heartbeat);
                shared.stats.record_accepted();
                Ok(true)
            }
            Ok(false) => {
                shared.stats.record_rejected(1);
                Ok(false)
            }
            Err(e) => {
                shared.stats.record_rejected(1);
                Err(e)
            }
        }
    }

    /// Copy of the current common flags.
    pub fn common_flags(&self) -> FlagRegistry {
        self.shared.common()
    }

    /// Replace all common flags.
    pub fn set_common_flags(&self, registry: FlagRegistry) {
        self.shared.update_common(|common| *common = registry);
    }

    /// Add or replace one common flag.
    pub fn set_common_flag(&self, flag: Flag) {
        self.shared
            .update_common(|common| common.add_flag(flag, true));
    }

    pub fn remove_common_flag(&self, name: FlagName) {
        self.shared.update_common(|common| common.remove_flag(name));
    }

    pub fn set_api_key(&self, key: impl Into<String>) {
        self.set_common_flag(common::api_key(key));
    }

    pub fn set_plugin(&self, user_agent: impl Into<String>) {
        self.set_common_flag(common::plugin(user_agent));
    }

    /// Set or clear the language override.
    pub fn set_language(&self, language: Option<&str>) {
        match language.filter(|l| !l.is_empty()) {
            Some(language) => self.set_common_flag(common::language(language)),
            None => self.remove_common_flag(crate::flags::name::LANGUAGE),
        }
    }

    /// Timer-style flush: skipped when another flush is draining, and run in
    /// the background unless the pipeline is in debug mode.
    pub fn process_queue(&self) -> FlushOutcome {
        self.shared.flush(self.shared.timer_dispatch(), false)
    }

    /// Wait for any running flush, then drain and send in the foreground.
    pub fn flush(&self) -> FlushOutcome {
        self.shared.flush(Dispatch::Foreground, true)
    }

    /// Stop the flush thread, send whatever is still queued and wait for
    /// background sends to finish. Later activity is ignored.
    pub fn shutdown(&mut self) -> FlushOutcome {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                self.shared
                    .logger
                    .error("Heartbeat flush thread panicked", None);
            }
        }

        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return FlushOutcome::Empty;
        }
        let outcome = self.flush();
        self.shared.join_inflight();
        outcome
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.shutdown();
        }
    }
}
