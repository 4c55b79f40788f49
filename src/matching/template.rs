//! Matcher template
//!
//! Feature vectors of one exemplar plus the envelopes used for lower-bound
//! pruning. The template itself is never modified during matching; per-query
//! values (confidence factor, bound) are returned from the matcher instead.
//!
//! A trained template can be flattened to a [`TemplateExport`] (features and
//! threshold only) and rebuilt from one; envelopes are recomputed on import.

use crate::app::config::MatcherConfig;
use crate::capture::{ClassId, Sample};
use crate::math::Vector;
use crate::matching::dtw::envelopes;
use crate::matching::features::Features;
use serde::{Deserialize, Serialize};

/// Flat, serializable form of a trained template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExport {
    pub class_id: ClassId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub length: usize,
    pub vecs: Vec<Vector>,
    pub abs: Vector,
    pub bb: Vector,
    pub rejection_threshold: f64,
}

/// Exemplar prepared for whole-sequence matching
#[derive(Debug, Clone)]
pub struct MatchTemplate {
    pub class_id: ClassId,
    pub name: Option<String>,
    /// Frame count of the exemplar before resampling
    pub length: usize,
    trajectory: Vec<Vector>,
    features: Features,
    lower: Vec<Vector>,
    upper: Vec<Vector>,
    /// Scores below this are accepted
    pub rejection_threshold: f64,
}

impl MatchTemplate {
    pub fn new(config: &MatcherConfig, sample: &Sample) -> crate::Result<Self> {
        Self::from_points(
            config,
            sample.class_id,
            sample.name.clone(),
            sample.len(),
            sample.trajectory().to_vec(),
        )
    }

    /// Build from raw points with an explicit original length
    pub fn from_points(
        config: &MatcherConfig,
        class_id: ClassId,
        name: Option<String>,
        length: usize,
        trajectory: Vec<Vector>,
    ) -> crate::Result<Self> {
        if trajectory.len() < 2 {
            return Err(crate::Error::Template(format!(
                "class {} exemplar needs at least two points, got {}",
                class_id,
                trajectory.len()
            )));
        }

        let features = Features::new(config, &trajectory);
        let (lower, upper) = envelopes(&features.vecs, config.radius);

        Ok(Self {
            class_id,
            name,
            length,
            trajectory,
            features,
            lower,
            upper,
            rejection_threshold: f64::INFINITY,
        })
    }

    /// Rebuild from exported features. The raw trajectory is not part of
    /// an export, so imported templates cannot be recalibrated.
    pub fn from_export(config: &MatcherConfig, export: TemplateExport) -> crate::Result<Self> {
        let expected = if config.inner_product {
            config.resample_count.saturating_sub(1)
        } else {
            config.resample_count
        };
        if export.vecs.len() != expected {
            return Err(crate::Error::Template(format!(
                "class {} export has {} feature vectors, matcher expects {}",
                export.class_id,
                export.vecs.len(),
                expected
            )));
        }

        let dim = export.abs.size();
        for vec in export.vecs.iter().chain(std::iter::once(&export.bb)) {
            if vec.size() != dim {
                return Err(crate::Error::DimensionMismatch {
                    expected: dim,
                    found: vec.size(),
                });
            }
        }
        if dim == 0 {
            return Err(crate::Error::Template(format!(
                "class {} export has zero-dimensional features",
                export.class_id
            )));
        }

        let (lower, upper) = envelopes(&export.vecs, config.radius);
        Ok(Self {
            class_id: export.class_id,
            name: export.name,
            length: export.length,
            trajectory: Vec::new(),
            features: Features {
                vecs: export.vecs,
                abs: export.abs,
                bb: export.bb,
            },
            lower,
            upper,
            rejection_threshold: export.rejection_threshold,
        })
    }

    pub fn export(&self) -> TemplateExport {
        TemplateExport {
            class_id: self.class_id,
            name: self.name.clone(),
            length: self.length,
            vecs: self.features.vecs.clone(),
            abs: self.features.abs.clone(),
            bb: self.features.bb.clone(),
            rejection_threshold: self.rejection_threshold,
        }
    }

    /// Raw exemplar points (empty for imported templates)
    pub fn trajectory(&self) -> &[Vector] {
        &self.trajectory
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Lower and upper envelopes, one per feature vector
    pub fn envelopes(&self) -> (&[Vector], &[Vector]) {
        (&self.lower, &self.upper)
    }

    pub fn dimension(&self) -> usize {
        self.features.abs.size()
    }
}
