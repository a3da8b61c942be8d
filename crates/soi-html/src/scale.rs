//! Per-table unit inference.
//!
//! HTML schedules carry no machine-readable unit. Filers report in thousands
//! or in millions; the median of a sample of positive amounts tells them apart.

use serde::{Deserialize, Serialize};
use soi_core::ExtractionConfig;

/// Unit a table's amounts are expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// Amounts in thousands of dollars.
    #[default]
    Thousands,
    /// Amounts in millions of dollars.
    Millions,
}

impl Scale {
    /// Factor converting a reported amount to dollars.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        match self {
            Self::Thousands => 1_000.0,
            Self::Millions => 1_000_000.0,
        }
    }
}

/// Outcome of [`infer_scale`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleInference {
    /// Chosen scale.
    pub scale: Scale,
    /// Number of samples used.
    pub samples: usize,
    /// Sample median, if any sample was available.
    pub median: Option<f64>,
    /// True when too few samples were available and thousands was assumed.
    pub low_confidence: bool,
}

/// Infers the scale of a table from sampled positive amounts.
///
/// Only the first `scale_sample_size` samples are used. A median below
/// `scale_threshold` means millions, otherwise thousands. Fewer than
/// `min_scale_samples` samples default to thousands with low confidence.
#[must_use]
pub fn infer_scale(samples: &[f64], config: &ExtractionConfig) -> ScaleInference {
    let mut sorted: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .take(config.scale_sample_size)
        .collect();
    sorted.sort_by(f64::total_cmp);

    let median = sorted.get(sorted.len() / 2).copied();
    if sorted.len() < config.min_scale_samples {
        return ScaleInference {
            scale: Scale::Thousands,
            samples: sorted.len(),
            median,
            low_confidence: true,
        };
    }

    let scale = match median {
        Some(m) if m < config.scale_threshold => Scale::Millions,
        _ => Scale::Thousands,
    };
    ScaleInference {
        scale,
        samples: sorted.len(),
        median,
        low_confidence: false,
    }
}
