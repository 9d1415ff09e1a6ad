//! edgeloop - command line entry point
//!
//! - `start`: run every enabled detector until Ctrl-C
//! - `check`: load and validate a config, print a summary
//! - `watch-config`: print the config file whenever it changes on disk

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::conductor::Conductor;
use crate::config::RuntimeConfig;
use crate::inference::HttpInferenceConnector;
use crate::ingest::{FrameSource, SourceRegistry};
use crate::messages::LiveReviewMetadata;
use crate::queue::LiveReviewFeed;

const FEED_POLL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(
    name = "edgeloop",
    about = "Edge detection loops backed by a remote inference service"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run all enabled detectors until interrupted
    Start {
        #[arg(short, long, env = "EDGELOOP_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate a config file and print what it would run
    Check {
        #[arg(short, long, env = "EDGELOOP_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the config file each time it changes
    WatchConfig {
        #[arg(short, long, env = "EDGELOOP_CONFIG")]
        config: PathBuf,
        /// Seconds between modification checks
        #[arg(long, default_value_t = 1.0)]
        poll_delay: f64,
    },
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Start { config } => start(config.as_deref()),
        Command::Check { config } => check(config.as_deref()),
        Command::WatchConfig { config, poll_delay } => watch_config(&config, poll_delay),
    }
}

fn start(path: Option<&Path>) -> Result<()> {
    let cfg = RuntimeConfig::load(path)?;
    let registry = SourceRegistry::with_builtin();
    let sources = cfg
        .cameras
        .iter()
        .map(|camera| registry.build(camera))
        .collect::<Result<Vec<Box<dyn FrameSource>>>>()?;

    let connector = Arc::new(HttpInferenceConnector::new(cfg.inference.clone()));
    let mut handle = Conductor::start(&cfg.detectors, connector)?;
    if handle.worker_count() == 0 {
        return Ok(());
    }
    handle.serve_frames(sources)?;

    let shutdown = handle.shutdown_flag();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || signal.store(true, Ordering::SeqCst))
        .context("error setting Ctrl-C handler")?;
    log::info!(
        "edgeloop running {} detector(s); waiting for Ctrl-C...",
        handle.worker_count()
    );

    let feed = handle.live_review();
    while !shutdown.load(Ordering::SeqCst) {
        drain_live_review(&feed);
        std::thread::sleep(FEED_POLL);
    }

    log::info!("shutdown signal received, stopping detectors...");
    handle.stop();
    handle.join()
}

fn drain_live_review(feed: &LiveReviewFeed) {
    while let Some(metadata) = feed.metadata.try_recv() {
        log::info!("live review: {}", metadata_summary(&metadata));
    }
    while let Some(notice) = feed.cancel.try_recv() {
        match serde_json::to_string(&notice) {
            Ok(json) => log::info!("live review cancel: {}", json),
            Err(e) => log::warn!("live review cancel not serializable: {}", e),
        }
    }
}

// The frame itself stays out of the logs.
fn metadata_summary(metadata: &LiveReviewMetadata) -> serde_json::Value {
    serde_json::json!({
        "uuid": metadata.uuid,
        "det_id": metadata.detector_id,
        "det_idx": metadata.detector_index,
        "imgsrc_idx": metadata.image_source_index,
        "query_id": metadata.query_id,
        "image_bytes": metadata.image_base64.len(),
    })
}

fn check(path: Option<&Path>) -> Result<()> {
    let cfg = RuntimeConfig::load(path)?;
    let registry = SourceRegistry::with_builtin();
    if let Some(path) = &cfg.source_path {
        println!("config: {}", path.display());
    }
    println!("inference endpoint: {}", cfg.inference.endpoint);
    println!("cameras: {}", cfg.cameras.len());
    for (idx, camera) in cfg.cameras.iter().enumerate() {
        let status = if registry.contains(&camera.input_type) {
            "ok"
        } else {
            "unknown input_type"
        };
        println!("  [{}] {} ({}): {}", idx, camera.name, camera.input_type, status);
    }
    println!(
        "detectors: {} ({} enabled)",
        cfg.detectors.len(),
        cfg.enabled_detectors().count()
    );
    for det in &cfg.detectors {
        println!(
            "  {} '{}' trigger={} cycle={:.1}s imgsrc={} {}",
            det.id,
            det.name,
            det.trigger_type,
            det.cycle_time.as_secs_f64(),
            det.image_source_index
                .map(|idx| idx.to_string())
                .unwrap_or_else(|| "-".to_string()),
            if det.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}

fn watch_config(path: &Path, poll_delay: f64) -> Result<()> {
    let poll = Duration::try_from_secs_f64(poll_delay)
        .with_context(|| format!("invalid poll delay {}", poll_delay))?;
    let mut last_seen: Option<SystemTime> = None;
    loop {
        match modified_at(path) {
            Ok(mtime) if last_seen != Some(mtime) => {
                last_seen = Some(mtime);
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("read {}", path.display()))?;
                println!("{}", text);
            }
            Ok(_) => {}
            Err(e) => log::warn!("{:#}", e),
        }
        std::thread::sleep(poll);
    }
}

fn modified_at(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("stat {}", path.display()))
}
