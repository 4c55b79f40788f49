//! Recorded Gesture Samples
//!
//! A `Sample` is one recorded trajectory of a known gesture class. Both the
//! segmentor and the matcher build their templates from samples. Samples are
//! immutable once constructed; the constructors take ownership of (or clone)
//! the caller's points so templates never alias caller buffers.

use crate::math::Vector;
use serde::{Deserialize, Serialize};

/// Gesture class identifier
pub type ClassId = usize;

/// One recorded trajectory with identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Participant who recorded the sample
    pub subject_id: u32,
    /// Gesture class
    pub class_id: ClassId,
    /// Repetition number for this subject and class
    pub instance_id: u32,
    /// Human-readable gesture name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    trajectory: Vec<Vector>,
    /// Seconds since the start of the recording, one per point (may be empty)
    #[serde(default)]
    timestamps: Vec<f64>,
    /// Low-pass filtered copy of the trajectory, if the collaborator produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filtered: Option<Vec<Vector>>,
}

impl Sample {
    /// Create a sample from a raw trajectory.
    ///
    /// Every point must share the dimensionality of the first one.
    pub fn new(
        subject_id: u32,
        class_id: ClassId,
        instance_id: u32,
        trajectory: Vec<Vector>,
    ) -> crate::Result<Self> {
        check_dimensions(&trajectory)?;

        Ok(Self {
            subject_id,
            class_id,
            instance_id,
            name: None,
            trajectory,
            timestamps: Vec::new(),
            filtered: None,
        })
    }

    /// Build from a borrowed slice (points are cloned)
    pub fn from_points(class_id: ClassId, points: &[Vector]) -> crate::Result<Self> {
        Self::new(0, class_id, 0, points.to_vec())
    }

    /// Attach a gesture name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach timestamps (seconds). Length must match the trajectory.
    pub fn with_timestamps(mut self, timestamps: Vec<f64>) -> crate::Result<Self> {
        if timestamps.len() != self.trajectory.len() {
            return Err(crate::Error::Template(format!(
                "expected {} timestamps, got {}",
                self.trajectory.len(),
                timestamps.len()
            )));
        }
        self.timestamps = timestamps;
        Ok(self)
    }

    /// Attach the filtered variant of the trajectory
    pub fn with_filtered(mut self, filtered: Vec<Vector>) -> crate::Result<Self> {
        check_dimensions(&filtered)?;
        if let (Some(a), Some(b)) = (self.trajectory.first(), filtered.first()) {
            a.ensure_same_size(b)?;
        }
        self.filtered = Some(filtered);
        Ok(self)
    }

    /// Re-check dimensional consistency (for samples deserialized from disk)
    pub fn validate(&self) -> crate::Result<()> {
        check_dimensions(&self.trajectory)?;
        if let Some(filtered) = &self.filtered {
            check_dimensions(filtered)?;
            if let (Some(a), Some(b)) = (self.trajectory.first(), filtered.first()) {
                a.ensure_same_size(b)?;
            }
        }
        Ok(())
    }

    /// Load a JSON array of samples, validating each one
    pub fn load_all(path: &std::path::Path) -> crate::Result<Vec<Sample>> {
        let content = std::fs::read_to_string(path)?;
        let samples: Vec<Sample> = serde_json::from_str(&content)?;
        for sample in &samples {
            sample.validate()?;
        }
        Ok(samples)
    }

    /// Raw trajectory
    pub fn trajectory(&self) -> &[Vector] {
        &self.trajectory
    }

    /// Filtered trajectory, if any
    pub fn filtered(&self) -> Option<&[Vector]> {
        self.filtered.as_deref()
    }

    /// Filtered trajectory when requested and available, raw otherwise
    pub fn trajectory_for(&self, use_filtered: bool) -> &[Vector] {
        match (use_filtered, self.filtered.as_deref()) {
            (true, Some(filtered)) if !filtered.is_empty() => filtered,
            _ => &self.trajectory,
        }
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Dimensionality of the points (0 for an empty sample)
    pub fn dimension(&self) -> usize {
        self.trajectory.first().map(Vector::size).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    /// Mean frame rate implied by the timestamps
    pub fn estimated_fps(&self) -> Option<f64> {
        let periods: Vec<f64> = self
            .timestamps
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|p| *p > 0.0)
            .collect();

        if periods.is_empty() {
            return None;
        }
        Some(periods.iter().map(|p| 1.0 / p).sum::<f64>() / periods.len() as f64)
    }
}

fn check_dimensions(points: &[Vector]) -> crate::Result<()> {
    if let Some(first) = points.first() {
        for point in &points[1..] {
            first.ensure_same_size(point)?;
        }
    }
    Ok(())
}
