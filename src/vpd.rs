//! VPD Engine
//!
//! Pure vapor-pressure arithmetic, no I/O. Uses the Magnus-Tetens
//! approximation throughout. All deficits are clamped at zero: a canopy
//! cooler than the dew point is reported as 0 kPa, not a negative value.

use crate::thermal::stats::ThermalStatistics;
use serde::{Deserialize, Serialize};

/// Saturation vapor pressure in kPa for a temperature in Celsius
pub fn svp(temp_c: f64) -> f64 {
    0.6108 * (17.27 * temp_c / (temp_c + 237.3)).exp()
}

/// Actual vapor pressure in kPa for a temperature in Celsius and RH in %
pub fn avp(temp_c: f64, rh: f64) -> f64 {
    svp(temp_c) * (rh / 100.0)
}

/// Vapor pressure deficit in kPa for an arbitrary (temperature, humidity)
/// pair. The presentation layer feeds this with any of the thermal
/// statistics, so the pair is not hard-coded to a source.
pub fn vpd(temp_c: f64, rh: f64) -> f64 {
    (svp(temp_c) - avp(temp_c, rh)).max(0.0)
}

/// Which thermal statistic stands in for the canopy temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanopyStat {
    Max,
    Mean,
    Median,
    Mode,
}

impl CanopyStat {
    /// Pull the selected statistic out of a thermal aggregate
    pub fn select(&self, stats: &ThermalStatistics) -> Option<f64> {
        match self {
            CanopyStat::Max => stats.max,
            CanopyStat::Mean => stats.mean,
            CanopyStat::Median => stats.median,
            CanopyStat::Mode => stats.mode,
        }
    }
}

/// The physically-distinct deficit values computed each cycle.
/// Every field is independently optional: absent inputs yield an absent
/// deficit, never a fabricated one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpdResult {
    pub air_vpd: Option<f64>,
    pub canopy_vpd: Option<f64>,
    pub thermal_vpd: Option<f64>,
    pub enhanced_vpd: Option<f64>,
}

impl VpdResult {
    /// Combine air-sensor and canopy-thermal readings.
    ///
    /// - `air_vpd`: deficit at air temperature and humidity
    /// - `canopy_vpd`: canopy-side saturation minus air-side actual
    ///   pressure (leaf vs air comparison)
    /// - `thermal_vpd`: deficit at canopy temperature with air humidity
    /// - `enhanced_vpd`: mean of air and canopy deficits, or whichever
    ///   is present
    pub fn compute(
        air_temp: Option<f64>,
        air_humidity: Option<f64>,
        canopy_temp: Option<f64>,
    ) -> Self {
        let air_vpd = match (air_temp, air_humidity) {
            (Some(t), Some(rh)) => Some(vpd(t, rh)),
            _ => None,
        };

        let (canopy_vpd, thermal_vpd) = match (canopy_temp, air_temp, air_humidity) {
            (Some(canopy), Some(air), Some(rh)) => (
                Some((svp(canopy) - avp(air, rh)).max(0.0)),
                Some(vpd(canopy, rh)),
            ),
            _ => (None, None),
        };

        let enhanced_vpd = match (air_vpd, canopy_vpd) {
            (Some(a), Some(c)) => Some((a + c) / 2.0),
            (Some(a), None) => Some(a),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        };

        Self {
            air_vpd,
            canopy_vpd,
            thermal_vpd,
            enhanced_vpd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svp_reference_point() {
        // SVP at 20C is roughly 2.34 kPa
        let v = svp(20.0);
        assert!((v - 2.339).abs() < 0.01, "svp(20) = {}", v);
    }

    #[test]
    fn test_vpd_monotone_decreasing_in_humidity() {
        for t in [-20.0, 0.0, 15.0, 25.0, 40.0, 60.0] {
            let mut prev = f64::INFINITY;
            for rh in (0..=100).step_by(5) {
                let v = vpd(t, rh as f64);
                assert!(v <= prev, "vpd({}, {}) increased", t, rh);
                assert!(v >= 0.0);
                prev = v;
            }
        }
    }

    #[test]
    fn test_vpd_saturated_air_is_zero() {
        assert_eq!(vpd(25.0, 100.0), 0.0);
    }

    #[test]
    fn test_all_variants_present_with_full_inputs() {
        let r = VpdResult::compute(Some(25.0), Some(60.0), Some(27.0));
        assert!(r.air_vpd.is_some());
        assert!(r.canopy_vpd.is_some());
        assert!(r.thermal_vpd.is_some());
        // Warmer canopy -> canopy deficit exceeds air deficit
        assert!(r.canopy_vpd.unwrap() > r.air_vpd.unwrap());
        let expected = (r.air_vpd.unwrap() + r.canopy_vpd.unwrap()) / 2.0;
        assert!((r.enhanced_vpd.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_missing_canopy_leaves_air_only() {
        let r = VpdResult::compute(Some(25.0), Some(60.0), None);
        assert!(r.air_vpd.is_some());
        assert!(r.canopy_vpd.is_none());
        assert!(r.thermal_vpd.is_none());
        assert_eq!(r.enhanced_vpd, r.air_vpd);
    }

    #[test]
    fn test_missing_humidity_blanks_everything() {
        // All variants need air humidity; a node outage leaves the whole
        // result absent even when the camera delivered a canopy reading.
        let r = VpdResult::compute(None, None, Some(24.0));
        assert_eq!(r, VpdResult::default());
    }

    #[test]
    fn test_cold_canopy_clamps_to_zero() {
        // Canopy far below air temperature: canopy SVP < air AVP
        let r = VpdResult::compute(Some(30.0), Some(90.0), Some(5.0));
        assert_eq!(r.canopy_vpd, Some(0.0));
    }
}
