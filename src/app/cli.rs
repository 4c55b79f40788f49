//! Command-Line Interface

use crate::app::config::{DeviceKind, PolicyKind};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Gesture Stream - continuous gesture segmentation and recognition
#[derive(Parser, Debug)]
#[command(name = "gesture-stream")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Learn per-template rejection thresholds
    Calibrate {
        /// Training samples (JSON array)
        #[arg(short, long)]
        samples: PathBuf,

        /// Calibration report output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// RNG seed for reproducible thresholds
        #[arg(long)]
        seed: Option<u64>,

        /// Write the trained matcher templates here for later replays
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Run the recognizer over a recorded session
    Replay {
        /// Training samples (JSON array)
        #[arg(short, long)]
        samples: PathBuf,

        /// Session frames (JSON array of points)
        #[arg(short, long)]
        frames: PathBuf,

        /// Detections output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured segmentation policy
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Trained matcher templates from `calibrate --model` (skips training the matcher)
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Initialize configuration
    Init {
        /// Device preset
        #[arg(short, long, value_enum, default_value = "kinect")]
        device: DeviceArg,

        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the default config path
    Path,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Device presets selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Kinect,
    Mouse,
    VivePosition,
    ViveQuaternion,
}

impl From<DeviceArg> for DeviceKind {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Kinect => DeviceKind::Kinect,
            DeviceArg::Mouse => DeviceKind::Mouse,
            DeviceArg::VivePosition => DeviceKind::VivePosition,
            DeviceArg::ViveQuaternion => DeviceKind::ViveQuaternion,
        }
    }
}

/// Segmentation policies selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    Incremental,
    Window,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Incremental => PolicyKind::Incremental,
            PolicyArg::Window => PolicyKind::Window,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_calibrate() {
        let args = vec![
            "gesture-stream",
            "calibrate",
            "--samples", "train.json",
            "--output", "thresholds.json",
            "--seed", "7",
            "--model", "model.json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Calibrate { samples, output, seed, model } => {
                assert_eq!(samples, PathBuf::from("train.json"));
                assert_eq!(output, Some(PathBuf::from("thresholds.json")));
                assert_eq!(seed, Some(7));
                assert_eq!(model, Some(PathBuf::from("model.json")));
            }
            _ => panic!("Expected Calibrate command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_with_policy() {
        let args = vec![
            "gesture-stream",
            "replay",
            "-s", "train.json",
            "-f", "session.json",
            "--policy", "window",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Replay { output, policy, model, .. } => {
                assert!(output.is_none());
                assert!(model.is_none());
                assert_eq!(policy, Some(PolicyArg::Window));
                assert_eq!(PolicyKind::from(PolicyArg::Window), PolicyKind::Window);
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_parse_replay_with_model() {
        let args = vec![
            "gesture-stream",
            "replay",
            "-s", "train.json",
            "-f", "session.json",
            "-m", "model.json",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Replay { model, .. } => {
                assert_eq!(model, Some(PathBuf::from("model.json")));
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_cli_replay_requires_frames() {
        let args = vec!["gesture-stream", "replay", "-s", "train.json"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_parse_init_device() {
        let cli = Cli::try_parse_from(vec!["gesture-stream", "init"]).unwrap();
        match cli.command {
            Commands::Init { device, force } => {
                assert_eq!(device, DeviceArg::Kinect);
                assert!(!force);
            }
            _ => panic!("Expected Init command"),
        }

        let cli =
            Cli::try_parse_from(vec!["gesture-stream", "init", "--device", "vive-quaternion", "-f"])
                .unwrap();
        match cli.command {
            Commands::Init { device, force } => {
                assert_eq!(DeviceKind::from(device), DeviceKind::ViveQuaternion);
                assert!(force);
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let args = vec![
            "gesture-stream",
            "config",
            "show",
            "--verbose",
            "--config", "/tmp/custom.toml",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/custom.toml")));
        assert!(matches!(
            cli.command,
            Commands::Config { action: ConfigAction::Show }
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
