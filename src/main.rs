//! Gesture Stream - continuous gesture recognition
//!
//! Calibrates rejection thresholds and replays recorded sessions through
//! the recognizer.

use anyhow::Context;
use gesture_stream::app::cli::{Cli, Commands, ConfigAction, DeviceArg, PolicyArg};
use gesture_stream::app::config::{Config, DeviceKind};
use gesture_stream::capture::Sample;
use gesture_stream::matching::TemplateExport;
use gesture_stream::math::{RunningStatistics, Vector};
use gesture_stream::workflow::ContinuousRecognizer;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Initialize tracing (--verbose enables debug-level output)
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config = if let Some(path) = &cli.config {
        Config::load(path).with_context(|| format!("Failed to load config {:?}", path))?
    } else {
        Config::load_default()?
    };

    // Execute command
    match cli.command {
        Commands::Calibrate {
            samples,
            output,
            seed,
            model,
        } => {
            run_calibrate(&samples, output, seed, model, &config)?;
        }
        Commands::Replay {
            samples,
            frames,
            output,
            policy,
            model,
        } => {
            run_replay(&samples, &frames, output, policy, model, &config)?;
        }
        Commands::Init { device, force } => {
            run_init(device, force)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn load_samples(path: &Path) -> anyhow::Result<Vec<Sample>> {
    let samples =
        Sample::load_all(path).with_context(|| format!("Failed to load samples {:?}", path))?;
    if samples.is_empty() {
        anyhow::bail!("No samples in {:?}", path);
    }

    info!(count = samples.len(), "Loaded training samples");
    Ok(samples)
}

fn load_points(path: &Path) -> anyhow::Result<Vec<Vector>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read frames {:?}", path))?;
    let points: Vec<Vector> =
        serde_json::from_str(&content).with_context(|| format!("Invalid frame file {:?}", path))?;
    Ok(points)
}

fn load_model(path: &Path) -> anyhow::Result<Vec<TemplateExport>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read model {:?}", path))?;
    let templates: Vec<TemplateExport> =
        serde_json::from_str(&content).with_context(|| format!("Invalid model file {:?}", path))?;

    info!(templates = templates.len(), "Loaded matcher templates");
    Ok(templates)
}

fn run_calibrate(
    samples: &Path,
    output: Option<PathBuf>,
    seed: Option<u64>,
    model: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    let samples = load_samples(samples)?;

    let mut config = config.clone();
    config.recognizer.calibrate = true;
    if seed.is_some() {
        config.recognizer.calibration.seed = seed;
    }

    let recognizer = ContinuousRecognizer::new(&config, &samples)?;

    let reports = recognizer.calibration();
    for report in reports {
        info!(
            template = report.template,
            class_id = report.class_id,
            threshold = report.threshold,
            positive_mean = report.positive_mean,
            negative_p95 = report.negative_p95,
            "Calibrated template"
        );
        if report.positive_mean > report.threshold {
            warn!(
                template = report.template,
                "Mean positive score exceeds the threshold"
            );
        }
    }

    if let Some(path) = model {
        let templates = recognizer.matcher().export_templates();
        std::fs::write(&path, serde_json::to_string_pretty(&templates)?)
            .with_context(|| format!("Failed to write model {:?}", path))?;
        info!(templates = templates.len(), path = %path.display(), "Wrote matcher templates");
    }

    let json = serde_json::to_string_pretty(reports)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("Wrote {} thresholds to {}", reports.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn run_replay(
    samples: &Path,
    frames: &Path,
    output: Option<PathBuf>,
    policy: Option<PolicyArg>,
    model: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    let samples = load_samples(samples)?;
    let points = load_points(frames)?;

    let mut config = config.clone();
    if let Some(policy) = policy {
        config.recognizer.policy = policy.into();
    }

    let mut recognizer = match model {
        Some(path) => ContinuousRecognizer::with_templates(&config, &samples, load_model(&path)?)?,
        None => ContinuousRecognizer::new(&config, &samples)?,
    };
    let mut timing = RunningStatistics::new();

    for point in &points {
        let started = Instant::now();
        recognizer.process_frame(point)?;
        timing.add(started.elapsed().as_secs_f64() * 1e6);
    }

    let detections = recognizer.log().detections();
    let json = serde_json::to_string_pretty(detections)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("Wrote {} detections to {}", detections.len(), path.display());
        }
        None => println!("{}", json),
    }

    let (low, high) = timing.confidence_interval(1.96);
    info!(
        frames = timing.count,
        mean_us = timing.mean,
        ci_low_us = low,
        ci_high_us = high,
        max_us = timing.maximum,
        "Per-frame processing time"
    );

    Ok(())
}

fn run_init(device: DeviceArg, force: bool) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    let config = Config::for_device(DeviceKind::from(device));
    config.save(&config_path)?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = config.to_toml()?;
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", toml_str);
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path().display());
        }
        ConfigAction::Reset { force } => {
            let config_path = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save(&config_path)?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
