//! detect_probe - run the camera and detector without touching the motors.
//!
//! Prints every non-empty detection set with its inference time. Useful for
//! checking the model, label table and camera before letting the rover move.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use target_rover::{open_backend, open_source, FrameSource, LabelTable, RoverConfig, StopSignal};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print detections from the rover camera")]
struct Args {
    /// JSON config file. Environment overrides still apply.
    #[arg(long, env = "ROVER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the detector confidence threshold.
    #[arg(long)]
    threshold: Option<f32>,

    /// Override the maximum number of detections per frame.
    #[arg(long)]
    top_k: Option<usize>,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = RoverConfig::load_from(args.config.as_deref())?;
    let threshold = args.threshold.unwrap_or(cfg.detector.threshold);
    let top_k = args.top_k.unwrap_or(cfg.detector.max_results);
    // The label table is optional here: raw ids are still useful.
    let labels = match LabelTable::load(&cfg.detector.labels_path) {
        Ok(labels) => labels,
        Err(err) => {
            log::warn!("printing raw label ids: {:#}", err);
            LabelTable::default()
        }
    };
    let mut detector = open_backend(&cfg.detector)?;
    let mut source = open_source(&cfg.camera)?;
    source.connect()?;
    detector.warm_up()?;

    let stop = StopSignal::new(None);
    stop.install()?;

    let mut seen = 0u64;
    while !stop.is_requested() && args.frames.map_or(true, |limit| seen < limit) {
        let frame = source.next_frame()?;
        let started = Instant::now();
        let detections = detector.detect(&frame, threshold, top_k)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        seen += 1;

        if detections.is_empty() {
            continue;
        }
        println!("frame {} ({:.2}ms):", frame.sequence, elapsed_ms);
        for d in &detections {
            let name = labels
                .name(d.label_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", d.label_id));
            println!(
                "  {:<16} {:.2}  [{:.3}, {:.3}, {:.3}, {:.3}]",
                name, d.score, d.bbox.x0, d.bbox.y0, d.bbox.x1, d.bbox.y1
            );
        }
    }

    let stats = source.stats();
    log::info!(
        "detect_probe done: frames={} suppressed={} url={}",
        stats.frames_captured,
        stats.statuses_suppressed,
        stats.url
    );
    Ok(())
}
