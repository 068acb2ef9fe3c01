//! Demonstration of the heartbeat pipeline without wakatime-cli.
//!
//! This example shows how to:
//! 1. Create a pipeline with a custom process runner
//! 2. Feed it editor activity, some of which is debounced
//! 3. Watch each flush become a single wakatime-cli call
//! 4. Shut down with a final flush
//!
//! Run with: cargo run --example pipeline_demo

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wakatime_heartbeat::{
    Activity, Admission, Category, EventPipeline, FixedBinary, Invocation, PipelineSettings,
    ProcessError, ProcessOutput, ProcessRunner, RecordingLogger,
};

/// Prints the invocation instead of running it.
struct PrintingRunner;

impl ProcessRunner for PrintingRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        println!("  $ {}", invocation.command_line());
        if let Some(stdin) = &invocation.stdin {
            println!(
                "  stdin ({} extra heartbeat(s)): {stdin}",
                invocation.extra_count()
            );
        }
        Ok(ProcessOutput {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn main() {
    println!("WakaTime Heartbeat - Pipeline Demo");
    println!("==================================");
    println!();

    let settings = PipelineSettings {
        flush_interval: Duration::from_secs(2),
        debug: true,
        ..PipelineSettings::default()
    };
    let logger = Arc::new(RecordingLogger::new());
    let mut pipeline = EventPipeline::new(
        settings,
        Arc::new(PrintingRunner),
        Arc::new(FixedBinary(PathBuf::from("/home/dev/.wakatime/wakatime-cli"))),
        logger.clone(),
    );
    pipeline.set_api_key("waka_92DEF62E-54DC-4BFF-A67A-F2A2C1EA083D");
    pipeline.set_plugin("demo/1.0 pipeline-demo/1.0");
    pipeline.start();

    let events = [
        Activity::file("/home/dev/project/src/main.rs"),
        Activity::file("/home/dev/project/src/main.rs"),
        Activity::file("/home/dev/project/src/main.rs"),
        Activity::write("/home/dev/project/src/main.rs"),
        Activity::file("/home/dev/project/src/lib.rs"),
        Activity {
            category: Some(Category::Debugging),
            ..Activity::file("/home/dev/project/tests/pipeline.rs")
        },
    ];

    println!("Feeding {} activity events...", events.len());
    for activity in &events {
        let admission = pipeline.handle_activity(activity);
        let label = match admission {
            Admission::Queued => "queued",
            Admission::Debounced => "debounced",
            Admission::Ignored => "ignored",
        };
        println!(
            "  {:<40} write={:<5} -> {label}",
            activity.entity, activity.is_write
        );
    }
    println!();

    println!("Waiting for the flush thread...");
    thread::sleep(Duration::from_secs(3));
    println!();

    pipeline.handle_activity(&Activity::write("/home/dev/project/Cargo.toml"));
    println!("Shutting down with 1 queued heartbeat...");
    let outcome = pipeline.shutdown();
    println!("  {outcome:?}");
    println!();

    println!("Pipeline log:");
    for (level, line) in logger.lines() {
        println!("  [{level:?}] {line}");
    }
    println!();

    println!("{}", pipeline.stats().summary());
}
