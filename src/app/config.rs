//! Configuration Management
//!
//! Every tuning constant the recognizer needs is carried in an explicit
//! [`Config`] value handed to constructors. Nothing is read from process-wide
//! state. Device presets mirror the input classes the recognizer was tuned on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Skeleton joint positions (3D)
    Kinect,
    /// 2D pointer in pixels
    Mouse,
    /// Tracked controller positions
    VivePosition,
    /// Tracked controller orientations
    ViveQuaternion,
}

/// Device-specific tuning constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub kind: DeviceKind,
    /// Angle between the first frame direction and a template start that
    /// still allows a new match to begin (degrees)
    pub start_angle_degrees: f64,
    /// Frames moving less than this are skipped (0 disables gating)
    pub min_motion: f64,
    /// Pointer-like device: enables dehooking and closedness correction
    pub pointer: bool,
    /// Matcher resample count
    pub resample_count: usize,
    /// Matcher Sakoe-Chiba radius
    pub radius: usize,
    /// Fixed matcher rejection threshold used when calibration is off
    pub rejection_threshold: f64,
}

impl DeviceProfile {
    /// Preset tuned for a device class
    pub fn preset(kind: DeviceKind) -> Self {
        let (resample_count, rejection_threshold) = match kind {
            DeviceKind::Kinect => (20, 7.0),
            DeviceKind::Mouse => (96, 7.0),
            DeviceKind::VivePosition => (32, 7.0),
            DeviceKind::ViveQuaternion => (16, 5.5),
        };
        let pointer = kind == DeviceKind::Mouse;

        Self {
            kind,
            start_angle_degrees: if pointer { 20.0 } else { 65.0 },
            min_motion: if pointer { 10.0 } else { 0.0 },
            pointer,
            resample_count,
            radius: resample_count / 10,
            rejection_threshold,
        }
    }

    /// Column-0 sentinel cost `(1 - cos(start_angle))^2`
    pub fn start_cost(&self) -> f64 {
        let threshold = 1.0 - self.start_angle_degrees.to_radians().cos();
        threshold * threshold
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::preset(DeviceKind::Kinect)
    }
}

/// Incremental segmentor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentorConfig {
    /// Frames the minimum must stay unbeaten before it is reported
    pub latency_frame_count: usize,
    /// Cancel a trigger when another template holds a lower minimum
    pub cancel_with_better: bool,
    /// Build templates from the filtered trajectory when samples carry one
    pub use_filtered: bool,
    /// Score a template must exceed to leave WAIT_FOR_END. Falls back to
    /// the adaptive trigger threshold when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_threshold: Option<f64>,
    /// Update templates on the rayon pool
    pub parallel: bool,
}

impl Default for SegmentorConfig {
    fn default() -> Self {
        Self {
            latency_frame_count: 1,
            cancel_with_better: false,
            use_filtered: true,
            rejection_threshold: None,
            parallel: false,
        }
    }
}

/// Matcher measures and features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Points per resampled trajectory
    pub resample_count: usize,
    /// Sakoe-Chiba band radius
    pub radius: usize,
    /// Inner-product cost over normalized direction vectors
    pub inner_product: bool,
    /// Squared Euclidean cost over points
    pub euclidean_distance: bool,
    /// Z-score normalize points (Euclidean only)
    pub z_normalize: bool,
    /// Envelope lower bound pruning in `classify`
    pub lower_bound: bool,
    /// Confidence factor from absolute distance travelled per axis
    pub cf_abs_distance: bool,
    /// Confidence factor from bounding-box widths
    pub cf_bb_widths: bool,
}

impl MatcherConfig {
    /// Inner-product measure with both confidence factors
    pub fn inner_product_defaults() -> Self {
        Self {
            resample_count: 16,
            radius: 2,
            inner_product: true,
            euclidean_distance: false,
            z_normalize: false,
            lower_bound: true,
            cf_abs_distance: true,
            cf_bb_widths: true,
        }
    }

    /// Euclidean measure over z-normalized points
    pub fn euclidean_defaults() -> Self {
        Self {
            resample_count: 16,
            radius: 2,
            inner_product: false,
            euclidean_distance: true,
            z_normalize: true,
            lower_bound: true,
            cf_abs_distance: false,
            cf_bb_widths: false,
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::inner_product_defaults()
    }
}

/// Window sizes tested by the window front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    Min,
    Max,
    MinMax,
    MinMidMax,
    Mid,
}

/// Window front end settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub mode: WindowMode,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            mode: WindowMode::Min,
        }
    }
}

/// How candidate segments are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Incremental segmentor with matcher confirmation
    Incremental,
    /// Fixed trailing windows classified directly
    Window,
}

/// Monte-Carlo threshold calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Points per synthetic positive
    pub gpsr_n: usize,
    /// Points removed per synthetic positive
    pub gpsr_r: usize,
    /// F-beta trade-off (1.0 weights precision and recall equally)
    pub beta: f64,
    /// RNG seed for reproducible thresholds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            gpsr_n: 16,
            gpsr_r: 2,
            beta: 1.0,
            seed: None,
        }
    }
}

/// Low-pass filtering of exemplars and live frames
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub enabled: bool,
    /// Cutoff frequency (Hz)
    pub cutoff_hz: f64,
    /// Frame rate assumed for the live stream and for exemplars without timestamps
    pub fps: f64,
}

impl FilterConfig {
    /// Cutoff tuned for a device class
    pub fn for_device(kind: DeviceKind) -> Self {
        Self {
            cutoff_hz: if kind == DeviceKind::Mouse { 5.0 } else { 3.0 },
            ..Self::default()
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cutoff_hz: 3.0,
            fps: 30.0,
        }
    }
}

/// Recognition pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    pub policy: PolicyKind,
    /// Learn per-template thresholds instead of the device's fixed one
    pub calibrate: bool,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Incremental,
            calibrate: false,
            calibration: CalibrationConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub device: DeviceProfile,
    #[serde(default)]
    pub segmentor: SegmentorConfig,
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_device(DeviceKind::Kinect)
    }
}

impl Config {
    /// Consistent configuration for a device class
    pub fn for_device(kind: DeviceKind) -> Self {
        let device = DeviceProfile::preset(kind);
        let matcher = MatcherConfig {
            resample_count: device.resample_count,
            radius: device.radius,
            ..MatcherConfig::inner_product_defaults()
        };

        Self {
            device,
            segmentor: SegmentorConfig::default(),
            matcher,
            window: WindowConfig::default(),
            recognizer: RecognizerConfig {
                filter: FilterConfig::for_device(kind),
                ..RecognizerConfig::default()
            },
        }
    }

    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(self.device.start_angle_degrees > 0.0 && self.device.start_angle_degrees <= 180.0) {
            return Err(crate::Error::Config(format!(
                "start_angle_degrees must be in (0, 180], got {}",
                self.device.start_angle_degrees
            )));
        }
        if self.device.min_motion < 0.0 {
            return Err(crate::Error::Config(format!(
                "min_motion must be >= 0, got {}",
                self.device.min_motion
            )));
        }
        if self.device.rejection_threshold <= 0.0 {
            return Err(crate::Error::Config(format!(
                "rejection_threshold must be > 0, got {}",
                self.device.rejection_threshold
            )));
        }
        if let Some(threshold) = self.segmentor.rejection_threshold {
            if threshold <= 0.0 {
                return Err(crate::Error::Config(format!(
                    "segmentor rejection_threshold must be > 0, got {}",
                    threshold
                )));
            }
        }
        if self.matcher.resample_count < 2 {
            return Err(crate::Error::Config(format!(
                "resample_count must be >= 2, got {}",
                self.matcher.resample_count
            )));
        }
        if self.matcher.inner_product == self.matcher.euclidean_distance {
            return Err(crate::Error::Config(
                "exactly one of inner_product and euclidean_distance must be enabled".to_string(),
            ));
        }
        let calibration = &self.recognizer.calibration;
        if calibration.gpsr_n < 2 {
            return Err(crate::Error::Config(format!(
                "gpsr_n must be >= 2, got {}",
                calibration.gpsr_n
            )));
        }
        if calibration.beta <= 0.0 {
            return Err(crate::Error::Config(format!(
                "beta must be > 0, got {}",
                calibration.beta
            )));
        }
        let filter = &self.recognizer.filter;
        if filter.enabled && !(filter.cutoff_hz > 0.0 && filter.fps > 0.0) {
            return Err(crate::Error::Config(format!(
                "filter cutoff_hz and fps must be > 0, got {} and {}",
                filter.cutoff_hz, filter.fps
            )));
        }
        Ok(())
    }

    /// Load config from file
    pub fn load(path: &PathBuf) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &PathBuf) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".gesture_stream").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
