//! Weighted n-dim vectors and color-space conversions.
//!
//! `rgb_to_lab`/`lab_to_rgb` use the standard D65, sRGB-gamma conversion.

use serde::{Deserialize, Serialize};

/// A point in n-dimensional space carrying a weight (for weighted averages)
/// and an opaque tag (the original RGB triple it was derived from).
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedVector {
    pub values: Vec<f64>,
    pub weight: f64,
    pub tag: [u8; 3],
}

impl WeightedVector {
    pub fn new(values: Vec<f64>, weight: f64, tag: [u8; 3]) -> Self {
        Self { values, weight, tag }
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Euclidean distance to another vector of the same dimensionality.
    pub fn distance_to(&self, other: &WeightedVector) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Weighted centroid `(sum w_i v_i) / (sum w_i)`. The resulting weight is
    /// the sum of all input weights. Errors on an empty slice.
    pub fn average(vectors: &[WeightedVector]) -> crate::error::Result<WeightedVector> {
        let first = vectors.first().ok_or_else(|| {
            crate::error::PbnError::NumericDegeneracy(
                "cannot average an empty set of vectors".to_string(),
            )
        })?;
        let dims = first.dimensions();
        let mut values = vec![0.0; dims];
        let mut weight_sum = 0.0;
        for v in vectors {
            weight_sum += v.weight;
            for (acc, val) in values.iter_mut().zip(v.values.iter()) {
                *acc += v.weight * val;
            }
        }
        for v in values.iter_mut() {
            *v /= weight_sum;
        }
        Ok(WeightedVector::new(values, weight_sum, first.tag))
    }
}

/// Which color space K-means clustering operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    Rgb,
    Hsl,
    Lab,
}

impl ColorSpace {
    /// Convert an 8-bit RGB triple into this color space's float values.
    pub fn to_values(self, rgb: [u8; 3]) -> Vec<f64> {
        match self {
            ColorSpace::Rgb => vec![rgb[0] as f64, rgb[1] as f64, rgb[2] as f64],
            ColorSpace::Hsl => {
                let (h, s, l) = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
                vec![h, s, l]
            }
            ColorSpace::Lab => {
                let (l, a, b) = rgb_to_lab(rgb[0], rgb[1], rgb[2]);
                vec![l as f64, a as f64, b as f64]
            }
        }
    }

    /// Convert this color space's float values back to an 8-bit RGB triple.
    pub fn to_rgb(self, values: &[f64]) -> [u8; 3] {
        match self {
            ColorSpace::Rgb => [
                values[0].round().clamp(0.0, 255.0) as u8,
                values[1].round().clamp(0.0, 255.0) as u8,
                values[2].round().clamp(0.0, 255.0) as u8,
            ],
            ColorSpace::Hsl => {
                let (r, g, b) = hsl_to_rgb(values[0], values[1], values[2]);
                [r, g, b]
            }
            ColorSpace::Lab => {
                let (r, g, b) = lab_to_rgb(values[0] as f32, values[1] as f32, values[2] as f32);
                [r, g, b]
            }
        }
    }
}

// ============================================================================
// RGB <-> LAB (D65, sRGB gamma)
// ============================================================================

/// Convert sRGB (0-255) to LAB color space.
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    fn srgb_to_linear(c: u8) -> f32 {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    let rl = srgb_to_linear(r);
    let gl = srgb_to_linear(g);
    let bl = srgb_to_linear(b);

    let x = rl * 0.4124564 + gl * 0.3575761 + bl * 0.1804375;
    let y = rl * 0.2126729 + gl * 0.7151522 + bl * 0.0721750;
    let z = rl * 0.0193339 + gl * 0.1191920 + bl * 0.9503041;

    const XN: f32 = 0.95047;
    const YN: f32 = 1.00000;
    const ZN: f32 = 1.08883;

    let xr = x / XN;
    let yr = y / YN;
    let zr = z / ZN;

    fn f(t: f32) -> f32 {
        if t > 0.008856 {
            t.powf(1.0 / 3.0)
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }

    let fx = f(xr);
    let fy = f(yr);
    let fz = f(zr);

    let l = (116.0 * fy - 16.0).max(0.0);
    let a = 500.0 * (fx - fy);
    let lab_b = 200.0 * (fy - fz);

    (l, a, lab_b)
}

/// Convert LAB color space back to sRGB (0-255).
pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> (u8, u8, u8) {
    const XN: f32 = 0.95047;
    const YN: f32 = 1.00000;
    const ZN: f32 = 1.08883;

    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;

    fn f_inv(t: f32) -> f32 {
        let t3 = t * t * t;
        if t3 > 0.008856 {
            t3
        } else {
            (t - 16.0 / 116.0) / 7.787
        }
    }

    let xr = f_inv(fx);
    let yr = f_inv(fy);
    let zr = f_inv(fz);

    let x = xr * XN;
    let y = yr * YN;
    let z = zr * ZN;

    let rl = x * 3.2404542 + y * -1.5371385 + z * -0.4985314;
    let gl = x * -0.9692660 + y * 1.8760108 + z * 0.0415560;
    let bl = x * 0.0556434 + y * -0.2040259 + z * 1.0572252;

    fn linear_to_srgb(c: f32) -> u8 {
        let c = c.clamp(0.0, 1.0);
        let v = if c <= 0.0031308 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    }

    (linear_to_srgb(rl), linear_to_srgb(gl), linear_to_srgb(bl))
}

// ============================================================================
// RGB <-> HSL
// ============================================================================

/// Convert sRGB (0-255) to HSL, hue in degrees `[0, 360)`, saturation and
/// lightness in `[0, 1]`.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let rf = r as f64 / 255.0;
    let gf = g as f64 / 255.0;
    let bf = b as f64 / 255.0;

    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == rf {
        (gf - bf) / d + if gf < bf { 6.0 } else { 0.0 }
    } else if max == gf {
        (bf - rf) / d + 2.0
    } else {
        (rf - gf) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL back to sRGB (0-255).
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round().clamp(0.0, 255.0) as u8;
        return (v, v, v);
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hn = h / 360.0;

    let r = hue_to_rgb(p, q, hn + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, hn);
    let b = hue_to_rgb(p, q, hn - 1.0 / 3.0);

    (
        (r * 255.0).round().clamp(0.0, 255.0) as u8,
        (g * 255.0).round().clamp(0.0, 255.0) as u8,
        (b * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_single_vector_equals_itself() {
        let v = WeightedVector::new(vec![1.0, 2.0, 3.0], 5.0, [1, 2, 3]);
        let avg = WeightedVector::average(&[v.clone()]).unwrap();
        assert_eq!(avg.values, v.values);
        assert_eq!(avg.weight, v.weight);
    }

    #[test]
    fn equal_weight_average_is_midpoint() {
        let a = WeightedVector::new(vec![0.0, 0.0], 1.0, [0, 0, 0]);
        let b = WeightedVector::new(vec![10.0, 10.0], 1.0, [0, 0, 0]);
        let avg = WeightedVector::average(&[a, b]).unwrap();
        assert_eq!(avg.values, vec![5.0, 5.0]);
        assert_eq!(avg.weight, 2.0);
    }

    #[test]
    fn average_of_empty_is_error() {
        let result = WeightedVector::average(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn distance_between_origin_and_3_4_is_5() {
        let a = WeightedVector::new(vec![0.0, 0.0], 1.0, [0, 0, 0]);
        let b = WeightedVector::new(vec![3.0, 4.0], 1.0, [0, 0, 0]);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn rgb_lab_roundtrip_within_rounding() {
        let test_colors = [
            (255, 0, 0),
            (0, 255, 0),
            (0, 0, 255),
            (255, 255, 255),
            (0, 0, 0),
            (128, 128, 128),
        ];
        for (r, g, b) in test_colors {
            let lab = rgb_to_lab(r, g, b);
            let (r2, g2, b2) = lab_to_rgb(lab.0, lab.1, lab.2);
            assert!((r as i16 - r2 as i16).abs() <= 1);
            assert!((g as i16 - g2 as i16).abs() <= 1);
            assert!((b as i16 - b2 as i16).abs() <= 1);
        }
    }

    #[test]
    fn rgb_hsl_roundtrip_within_rounding() {
        let test_colors = [(255, 0, 0), (0, 255, 0), (0, 0, 255), (128, 64, 200), (10, 10, 10)];
        for (r, g, b) in test_colors {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (r2, g2, b2) = hsl_to_rgb(h, s, l);
            assert!((r as i16 - r2 as i16).abs() <= 1);
            assert!((g as i16 - g2 as i16).abs() <= 1);
            assert!((b as i16 - b2 as i16).abs() <= 1);
        }
    }

    #[test]
    fn gray_has_zero_saturation() {
        let (_, s, _) = rgb_to_hsl(100, 100, 100);
        assert_eq!(s, 0.0);
    }
}
