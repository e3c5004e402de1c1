//! Thermal Frame Decoder
//!
//! ## Responsibilities
//!
//! - Hold one acquisition cycle's raw radiometric frame
//! - Detect the frame geometry from the pixel count
//! - Convert centi-Kelvin raw units to Celsius
//!
//! The radiometric Lepton reports Kelvin x 100 per pixel, so the
//! conversion is `celsius = raw * 0.01 - 273.15`.

use crate::error::{Error, Result};

/// Lepton radiometric resolution in Kelvin per raw unit
const LEPTON_RESOLUTION: f64 = 0.01;

/// Known frame geometries: (pixel count, width, height)
const KNOWN_GEOMETRIES: &[(usize, usize, usize)] = &[(19_200, 160, 120), (4_800, 80, 60)];

/// One raw radiometric frame. Lifetime is a single acquisition cycle.
#[derive(Debug, Clone)]
pub struct ThermalFrame {
    pub width: usize,
    pub height: usize,
    /// Row-major raw values, centi-Kelvin
    pub raw: Vec<u16>,
}

impl ThermalFrame {
    /// Build a frame from a raw pixel buffer, detecting the geometry.
    ///
    /// Rejects buffers whose length matches no documented sensor
    /// geometry, since downstream reshaping assumes the split.
    pub fn from_raw(raw: Vec<u16>) -> Result<Self> {
        let (_, width, height) = KNOWN_GEOMETRIES
            .iter()
            .find(|(count, _, _)| *count == raw.len())
            .ok_or_else(|| {
                Error::Decode(format!(
                    "unrecognized thermal geometry: {} pixels",
                    raw.len()
                ))
            })?;

        Ok(Self {
            width: *width,
            height: *height,
            raw,
        })
    }

    /// Decode a little-endian 16-bit pixel buffer
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(Error::Decode(format!(
                "odd radiometric payload length: {} bytes",
                bytes.len()
            )));
        }

        let raw = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Self::from_raw(raw)
    }

    /// Convert every pixel to Celsius
    pub fn to_celsius(&self) -> Vec<f64> {
        self.raw
            .iter()
            .map(|&raw| f64::from(raw) * LEPTON_RESOLUTION - 273.15)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_frame_geometry_detected() {
        let frame = ThermalFrame::from_raw(vec![29_815; 19_200]).unwrap();
        assert_eq!(frame.width, 160);
        assert_eq!(frame.height, 120);
    }

    #[test]
    fn test_alternate_geometry_detected() {
        let frame = ThermalFrame::from_raw(vec![30_000; 4_800]).unwrap();
        assert_eq!(frame.width, 80);
        assert_eq!(frame.height, 60);
    }

    #[test]
    fn test_unrecognized_geometry_rejected() {
        let err = ThermalFrame::from_raw(vec![29_815; 1_000]).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_centikelvin_conversion() {
        // 29815 centi-Kelvin is exactly 0.00 C
        let frame = ThermalFrame::from_raw(vec![29_815; 19_200]).unwrap();
        let celsius = frame.to_celsius();
        assert_eq!(celsius.len(), 19_200);
        for t in celsius {
            assert!(t.abs() < 1e-9, "expected 0.0C, got {}", t);
        }
    }

    #[test]
    fn test_le_byte_decoding() {
        // 30015 = 0x753F -> LE bytes [0x3F, 0x75]; 30015 cK = 2.00 C
        let mut bytes = Vec::with_capacity(19_200 * 2);
        for _ in 0..19_200 {
            bytes.extend_from_slice(&30_015u16.to_le_bytes());
        }
        let frame = ThermalFrame::from_le_bytes(&bytes).unwrap();
        let celsius = frame.to_celsius();
        assert!((celsius[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_odd_payload_rejected() {
        let err = ThermalFrame::from_le_bytes(&[0x00; 3]).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
