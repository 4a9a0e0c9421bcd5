use anyhow::Context;
use clap::Parser;
use display::bridge::ConsoleDisplay;
use generator::profile::GeneratorConfig;
use rppgcore::interface::ChannelSink;
use rppgcore::prelude::CombinationStrategy;
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use store::records::RecordStore;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod display;
mod generator;
mod store;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline session driver for the rPPG core")]
struct Args {
    /// Load a workflow config from YAML; the remaining flags are ignored
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value = "demo-subject")]
    subject: String,
    /// Signal combination: default, red, blue or chrom
    #[arg(long, default_value = "default")]
    strategy: String,
    #[arg(long, default_value_t = 30.0)]
    duration: f64,
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    #[arg(long, default_value_t = 72.0)]
    bpm: f32,
    #[arg(long, default_value_t = 1.5)]
    noise: f32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Submit a record every sampling interval
    #[arg(long, default_value_t = false)]
    sampling: bool,
    /// Deliver frames at the camera rate instead of as fast as possible (Ctrl+C stops)
    #[arg(long, default_value_t = false)]
    realtime: bool,
    #[arg(long, default_value = "tools/data/session_report.log")]
    report: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let strategy: CombinationStrategy = args
            .strategy
            .parse()
            .with_context(|| format!("parsing strategy {}", args.strategy))?;
        WorkflowConfig::from_args(
            &args.subject,
            strategy,
            args.sampling,
            GeneratorConfig {
                duration_secs: args.duration,
                fps: args.fps,
                bpm: args.bpm,
                noise: args.noise,
                seed: args.seed,
                ..Default::default()
            },
        )
    };

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime")?;
    runtime.block_on(run(workflow_config, args.realtime, args.report))
}

async fn run(config: WorkflowConfig, realtime: bool, report_path: PathBuf) -> anyhow::Result<()> {
    let display = ConsoleDisplay::new(config.gate);
    let store = Arc::new(RecordStore::new());
    let (sink, receiver) = ChannelSink::new();
    let consumer = tokio::spawn(store.clone().consume(receiver));

    let started_at_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("reading system clock")?
        .as_secs_f64();
    let runner = Runner::new(config.clone());
    display.publish_status(&format!(
        "Recording {} ({} strategy, {:.0} s)",
        config.subject, config.pipeline.strategy, config.generator.duration_secs
    ));
    if let Some(description) = &config.generator.description {
        display.publish_status(description);
    }

    let result = if realtime {
        runner
            .execute_paced(&sink, &display, started_at_unix)
            .await?
    } else {
        runner.execute(&sink, &display, started_at_unix)?
    };
    drop(sink);
    let stored = consumer.await.context("joining record consumer")?;
    log::info!("record consumer finished after {} records", stored);

    println!(
        "Session {} -> frames {}, analyses {}, records {}, HR {:.1} BPM ({:.2}), SDNN {:.1} ms ({:.2})",
        result.subject,
        result.frames,
        result.reports.len(),
        store.len(),
        result.vitals.heart_rate.bpm,
        result.vitals.heart_rate.confidence,
        result.vitals.hrv.sdnn,
        result.vitals.hrv.confidence
    );

    let summary = match store.aggregate(&config.subject) {
        Ok(summary) => {
            display.publish_status(&format!(
                "Average HR {:.2} BPM, average HRV {:.2} ms over {} records",
                summary.avg_heart_rate, summary.avg_hrv, summary.record_count
            ));
            Some(summary)
        }
        Err(err) => {
            display.publish_status(&format!("No aggregate: {}", err));
            None
        }
    };

    let report = json!({
        "subject": result.subject,
        "startedAt": started_at_unix,
        "frames": result.frames,
        "analyses": result.reports.len(),
        "interrupted": result.interrupted,
        "vitals": result.vitals,
        "quality": result.quality,
        "metrics": result.metrics,
        "summary": summary,
    });
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening report {}", report_path.display()))?;
    writeln!(file, "{}", report).context("writing session report")?;

    Ok(())
}
