//! Statistics Engine
//!
//! ## Responsibilities
//!
//! - Partition a Celsius sample set into valid and faulty pixels
//! - Compute descriptive statistics over the valid subset only
//!
//! Pixels below 0 C are not physically meaningful for this sensor family
//! (dead or saturated cells) and are excluded before aggregation. An
//! empty valid subset yields absent statistics, which callers must treat
//! as distinct from a genuine 0.0 C reading.

use serde::{Deserialize, Serialize};

/// Where a thermal aggregate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalSource {
    /// Decoded locally from a raw socket frame
    RawSocket,
    /// Computed locally from the camera's raw-pixel HTTP endpoint
    RawHttp,
    /// The camera's own pre-aggregated statistics (no local filtering,
    /// pixel counts unknown)
    Precomputed,
}

/// Descriptive statistics over one thermal frame, Celsius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<f64>,
    pub std_dev: Option<f64>,
    pub total_pixels: usize,
    pub filtered_pixels: usize,
    pub source: ThermalSource,
}

impl ThermalStatistics {
    /// Aggregate a Celsius sample set, filtering faulty (< 0 C) pixels.
    pub fn compute(samples: &[f64], source: ThermalSource) -> Self {
        let total_pixels = samples.len();
        let mut valid: Vec<f64> = samples.iter().copied().filter(|&t| t >= 0.0).collect();
        let filtered_pixels = total_pixels - valid.len();

        if filtered_pixels > 0 {
            tracing::debug!(
                filtered = filtered_pixels,
                total = total_pixels,
                "Filtered faulty thermal pixels"
            );
        }

        if valid.is_empty() {
            if total_pixels > 0 {
                tracing::warn!(total = total_pixels, "No valid thermal pixels after filtering");
            }
            return Self {
                min: None,
                max: None,
                mean: None,
                median: None,
                mode: None,
                std_dev: None,
                total_pixels,
                filtered_pixels,
                source,
            };
        }

        valid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = valid.len();
        let min = valid[0];
        let max = valid[n - 1];
        let mean = valid.iter().sum::<f64>() / n as f64;
        let median = median_of_sorted(&valid);
        let variance = valid.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n as f64;
        let mode = mode_of(&valid).unwrap_or(median);

        Self {
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
            median: Some(median),
            mode: Some(mode),
            std_dev: Some(variance.sqrt()),
            total_pixels,
            filtered_pixels,
            source,
        }
    }

    /// Number of pixels that contributed to the statistics
    pub fn valid_pixels(&self) -> usize {
        self.total_pixels - self.filtered_pixels
    }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value after rounding to one decimal place.
/// Returns `None` when no single rounded value has a strict majority of
/// occurrences (the caller substitutes the median).
fn mode_of(samples: &[f64]) -> Option<f64> {
    use std::collections::HashMap;

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &t in samples {
        let key = (t * 10.0).round() as i64;
        *counts.entry(key).or_insert(0) += 1;
    }

    let best_count = *counts.values().max()?;
    let mut winners = counts
        .into_iter()
        .filter(|(_, c)| *c == best_count)
        .map(|(k, _)| k);

    match (winners.next(), winners.next()) {
        (Some(key), None) => Some(key as f64 / 10.0),
        _ => None,
    }
}
