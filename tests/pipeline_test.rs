//! Integration tests for the heartbeat pipeline

use chrono::{Duration as ChronoDuration, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use wakatime_heartbeat::flags::name::{ENTITY, KEY, PLUGIN, TIME};
use wakatime_heartbeat::flags::obfuscate;
use wakatime_heartbeat::{
    heartbeats_to_json, Activity, Admission, Config, EventPipeline, FixedBinary, FlushOutcome,
    Heartbeat, Invocation, LogLevel, PipelineSettings, ProcessError, ProcessOutput, ProcessRunner,
    RecordingLogger, Validator,
};

const API_KEY: &str = "92DEF62E-54DC-4BFF-A67A-F2A2C1EA083D";

#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok(ProcessOutput {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn foreground_pipeline(runner: Arc<dyn ProcessRunner>) -> EventPipeline {
    let settings = PipelineSettings {
        debug: true,
        ..PipelineSettings::default()
    };
    let pipeline = EventPipeline::new(
        settings,
        runner,
        Arc::new(FixedBinary(PathBuf::from("/opt/wakatime/wakatime-cli"))),
        Arc::new(RecordingLogger::new()),
    );
    pipeline.set_api_key(API_KEY);
    pipeline.set_plugin("vim/9.0 vim-wakatime/11.0");
    pipeline
}

fn value_after(tokens: &[String], switch: &str) -> Option<String> {
    tokens
        .iter()
        .position(|t| t == switch)
        .and_then(|i| tokens.get(i + 1).cloned())
}

#[test]
fn test_repeated_reads_are_debounced_and_writes_are_not() {
    let runner = Arc::new(RecordingRunner::default());
    let pipeline = foreground_pipeline(runner);
    let start = Utc::now();

    let read = Activity::file("/home/dev/app/src/main.rs");
    let outcomes: Vec<Admission> = (0..3)
        .map(|i| pipeline.handle_activity_at(&read, start + ChronoDuration::seconds(i * 10)))
        .collect();
    assert_eq!(
        outcomes,
        vec![Admission::Queued, Admission::Debounced, Admission::Debounced]
    );
    assert_eq!(pipeline.pending(), 1);

    let save = Activity::write("/home/dev/app/src/main.rs");
    for i in 0..3 {
        assert_eq!(
            pipeline.handle_activity_at(&save, start + ChronoDuration::seconds(40 + i)),
            Admission::Queued
        );
    }
    assert_eq!(pipeline.pending(), 4);

    // Past the two minute window the same file is accepted again.
    let later = start + ChronoDuration::seconds(43 + 121);
    assert_eq!(pipeline.handle_activity_at(&read, later), Admission::Queued);

    // A different file is never debounced.
    let other = Activity::file("/home/dev/app/src/lib.rs");
    assert_eq!(pipeline.handle_activity_at(&other, later), Admission::Queued);
    assert_eq!(pipeline.pending(), 6);
}

#[test]
fn test_flush_sends_primary_as_args_and_extras_on_stdin() {
    let runner = Arc::new(RecordingRunner::default());
    let pipeline = foreground_pipeline(runner.clone());
    let now = Utc::now();

    pipeline.handle_activity_at(&Activity::file("/p/first.rs"), now);
    pipeline.handle_activity_at(&Activity::file("/p/second.rs"), now);
    pipeline.handle_activity_at(&Activity::write("/p/third.rs"), now);

    assert_eq!(pipeline.flush(), FlushOutcome::Sent { heartbeats: 3 });
    assert_eq!(pipeline.pending(), 0);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let invocation = &calls[0];
    assert_eq!(invocation.binary, PathBuf::from("/opt/wakatime/wakatime-cli"));

    let tokens = invocation.tokens();
    assert_eq!(value_after(&tokens, "--entity").as_deref(), Some("/p/first.rs"));
    assert_eq!(value_after(&tokens, "--key").as_deref(), Some(API_KEY));
    assert!(tokens.contains(&"--extra-heartbeats".to_string()));
    assert!(!tokens.iter().any(|t| t.contains("second.rs") || t.contains("third.rs")));

    let stdin = invocation.stdin.as_deref().unwrap();
    let extras: Vec<serde_json::Value> = serde_json::from_str(stdin).unwrap();
    assert_eq!(extras.len(), 2);
    assert_eq!(invocation.extra_count(), 2);
    assert_eq!(extras[0]["entity"], "/p/second.rs");
    assert_eq!(extras[1]["entity"], "/p/third.rs");
    assert_eq!(extras[1]["is_write"], true);
    assert_eq!(extras[0]["category"], "coding");
    assert_eq!(extras[0]["type"], "file");
    for extra in &extras {
        assert!(extra.get("key").is_none());
        assert!(extra.get("plugin").is_none());
        assert!(extra.get("extra_heartbeats").is_none());
        assert!(extra["time"].is_string());
    }
}

#[test]
fn test_logged_command_line_masks_the_key() {
    let runner = Arc::new(RecordingRunner::default());
    let pipeline = foreground_pipeline(runner.clone());
    pipeline.handle_activity(&Activity::file("/p/a.rs"));
    pipeline.flush();

    let command_line = runner.calls()[0].command_line();
    assert!(command_line.contains(&obfuscate(API_KEY)));
    assert!(command_line.contains("XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXX083D"));
    assert!(!command_line.contains(API_KEY));
}

#[test]
fn test_empty_collection_is_empty_array() {
    assert_eq!(heartbeats_to_json(&[]), "[]");

    let one = Heartbeat::new().entity("/p/a.rs");
    let json = heartbeats_to_json(std::slice::from_ref(&one));
    let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0]["entity"], "/p/a.rs");
}

#[test]
fn test_validation_reports_every_missing_flag() {
    let logger = Arc::new(RecordingLogger::new());
    let validator = Validator::new(logger.clone());

    // Time, category and entity type are seeded; key, plugin and entity are not.
    let mut heartbeat = Heartbeat::new();
    heartbeat.flags_mut().add_flag(
        wakatime_heartbeat::Flag::text(KEY, API_KEY).obfuscatable(),
        true,
    );
    let err = validator.is_valid(&heartbeat, true).unwrap_err();
    assert_eq!(err.inner().len(), 2);
    assert_eq!(err.missing().collect::<Vec<_>>(), vec![PLUGIN, ENTITY]);
    assert_eq!(logger.messages(LogLevel::Error).len(), 2);

    assert_eq!(validator.is_valid(&heartbeat, false), Ok(false));
    assert!(heartbeat.has_flag(TIME));
}

#[test]
fn test_shutdown_sends_the_remainder_once() {
    let runner = Arc::new(RecordingRunner::default());
    let mut pipeline = foreground_pipeline(runner.clone());
    pipeline.start();

    pipeline.handle_activity(&Activity::file("/p/a.rs"));
    pipeline.handle_activity(&Activity::file("/p/b.rs"));
    assert_eq!(pipeline.shutdown(), FlushOutcome::Sent { heartbeats: 2 });
    assert_eq!(runner.calls().len(), 1);

    drop(pipeline);
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_drop_flushes_pending_heartbeats() {
    let runner = Arc::new(RecordingRunner::default());
    {
        let pipeline = foreground_pipeline(runner.clone());
        pipeline.handle_activity(&Activity::file("/p/a.rs"));
    }
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_config_without_key_never_reaches_wakatime_cli() {
    let config = Config::default();
    assert!(config.require_api_key().is_err());

    let runner = Arc::new(RecordingRunner::default());
    let pipeline = EventPipeline::new(
        PipelineSettings {
            debug: true,
            ..config.pipeline_settings()
        },
        runner.clone(),
        Arc::new(FixedBinary(config.resolved_cli_path())),
        Arc::new(RecordingLogger::new()),
    );
    pipeline.set_common_flags(config.common_flags());

    pipeline.handle_activity(&Activity::file("/p/a.rs"));
    assert_eq!(pipeline.flush(), FlushOutcome::Invalid { heartbeats: 1 });
    assert!(runner.calls().is_empty());
    assert_eq!(pipeline.stats().snapshot().rejected, 1);

    // Once a key is configured the same activity goes out.
    let config = Config {
        api_key: Some(API_KEY.to_string()),
        ..config
    };
    assert_eq!(config.require_api_key().unwrap(), API_KEY);
    pipeline.set_common_flags(config.common_flags());
    pipeline.handle_activity(&Activity::write("/p/a.rs"));
    assert_eq!(pipeline.flush(), FlushOutcome::Sent { heartbeats: 1 });
    assert_eq!(runner.calls().len(), 1);
}

#[cfg(unix)]
mod process_tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use wakatime_heartbeat::CommandRunner;

    /// A stand-in wakatime-cli that records its arguments and stdin.
    fn fake_cli(dir: &std::path::Path) -> PathBuf {
        let script = dir.join("wakatime-cli");
        let body = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"{0}/args\"\ncat > \"{0}/stdin\"\n",
            dir.display()
        );
        std::fs::write(&script, body).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        script
    }

    #[test]
    fn test_real_process_receives_args_and_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let cli = fake_cli(dir.path());

        let pipeline = EventPipeline::new(
            PipelineSettings {
                debug: true,
                ..PipelineSettings::default()
            },
            Arc::new(CommandRunner::new()),
            Arc::new(FixedBinary(cli)),
            Arc::new(RecordingLogger::new()),
        );
        pipeline.set_api_key(API_KEY);
        pipeline.set_plugin("vim/9.0 vim-wakatime/11.0");

        pipeline.handle_activity(&Activity::file("/p/with space.rs"));
        pipeline.handle_activity(&Activity::file("/p/b.rs"));
        assert_eq!(pipeline.flush(), FlushOutcome::Sent { heartbeats: 2 });

        let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        let entity = args.iter().position(|a| *a == "--entity").unwrap();
        assert_eq!(args[entity + 1], "/p/with space.rs");
        assert!(args.contains(&"--extra-heartbeats"));

        let stdin = std::fs::read_to_string(dir.path().join("stdin")).unwrap();
        let extras: Vec<serde_json::Value> = serde_json::from_str(&stdin).unwrap();
        assert_eq!(extras.len(), 1);
        assert_eq!(extras[0]["entity"], "/p/b.rs");
    }

    #[test]
    fn test_missing_binary_is_failed_flush() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(RecordingLogger::new());
        let pipeline = EventPipeline::new(
            PipelineSettings {
                debug: true,
                ..PipelineSettings::default()
            },
            Arc::new(CommandRunner::new()),
            Arc::new(FixedBinary(dir.path().join("absent-cli"))),
            logger.clone(),
        );
        pipeline.set_api_key(API_KEY);
        pipeline.set_plugin("vim/9.0 vim-wakatime/11.0");

        pipeline.handle_activity(&Activity::file("/p/a.rs"));
        assert_eq!(pipeline.flush(), FlushOutcome::Failed { heartbeats: 1 });
        assert_eq!(pipeline.pending(), 0);
        assert!(!logger.messages(LogLevel::Error).is_empty());
    }
}
