//! Window functions applied to each frame before the FFT
//!
//! Every window is written as a function of the normalized position
//! `x = i / (n - 1)`, so the variant is resolved once per frame and the
//! inner loop only evaluates a plain `fn(f64) -> f64`.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Window kinds selectable from the settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowKind {
    /// w = 1
    Rectangular,

    /// w = 1 - |2x - 1|
    Triangular,

    /// w = 1 - (2x - 1)^2
    Welch,

    /// w = 0.5 - 0.5*cos(2πx)
    Hanning,

    /// w = 0.54 - 0.46*cos(2πx)
    Hamming,

    /// w = 0.42 - 0.5*cos(2πx) + 0.08*cos(4πx)
    Blackman,

    /// Four-term Nuttall, continuous first derivative
    Nuttall,

    /// Four-term Blackman-Nuttall
    BlackmanNuttall,

    /// Four-term Blackman-Harris, ~92 dB sidelobe attenuation
    BlackmanHarris,
}

/// Published coefficients (a0, a1, a2, a3) of the four-term cosine windows
const NUTTALL: [f64; 4] = [0.355768, 0.487396, 0.144232, 0.012604];
const BLACKMAN_NUTTALL: [f64; 4] = [0.3635819, 0.4891775, 0.1365995, 0.0106411];
const BLACKMAN_HARRIS: [f64; 4] = [0.35875, 0.48829, 0.14128, 0.01168];

#[inline]
fn four_term(a: &[f64; 4], x: f64) -> f64 {
    let angle = 2.0 * PI * x;
    a[0] - a[1] * angle.cos() + a[2] * (2.0 * angle).cos() - a[3] * (3.0 * angle).cos()
}

fn rectangular(_x: f64) -> f64 {
    1.0
}

fn triangular(x: f64) -> f64 {
    1.0 - (2.0 * x - 1.0).abs()
}

fn welch(x: f64) -> f64 {
    let t = 2.0 * x - 1.0;
    1.0 - t * t
}

fn hanning(x: f64) -> f64 {
    0.5 - 0.5 * (2.0 * PI * x).cos()
}

fn hamming(x: f64) -> f64 {
    0.54 - 0.46 * (2.0 * PI * x).cos()
}

fn blackman(x: f64) -> f64 {
    let angle = 2.0 * PI * x;
    0.42 - 0.5 * angle.cos() + 0.08 * (2.0 * angle).cos()
}

fn nuttall(x: f64) -> f64 {
    four_term(&NUTTALL, x)
}

fn blackman_nuttall(x: f64) -> f64 {
    four_term(&BLACKMAN_NUTTALL, x)
}

fn blackman_harris(x: f64) -> f64 {
    four_term(&BLACKMAN_HARRIS, x)
}

impl WindowKind {
    /// All kinds, in the order the settings screen lists them
    pub const ALL: [WindowKind; 9] = [
        WindowKind::Rectangular,
        WindowKind::Triangular,
        WindowKind::Welch,
        WindowKind::Hanning,
        WindowKind::Hamming,
        WindowKind::Blackman,
        WindowKind::Nuttall,
        WindowKind::BlackmanNuttall,
        WindowKind::BlackmanHarris,
    ];

    /// Settings name of the window
    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Rectangular => "Rectangular",
            WindowKind::Triangular => "Triangular",
            WindowKind::Welch => "Welch",
            WindowKind::Hanning => "Hanning",
            WindowKind::Hamming => "Hamming",
            WindowKind::Blackman => "Blackman",
            WindowKind::Nuttall => "Nuttall",
            WindowKind::BlackmanNuttall => "Blackman-Nuttall",
            WindowKind::BlackmanHarris => "Blackman-Harris",
        }
    }

    /// Window profile over the normalized position x in [0, 1]
    fn profile(&self) -> fn(f64) -> f64 {
        match self {
            WindowKind::Rectangular => rectangular,
            WindowKind::Triangular => triangular,
            WindowKind::Welch => welch,
            WindowKind::Hanning => hanning,
            WindowKind::Hamming => hamming,
            WindowKind::Blackman => blackman,
            WindowKind::Nuttall => nuttall,
            WindowKind::BlackmanNuttall => blackman_nuttall,
            WindowKind::BlackmanHarris => blackman_harris,
        }
    }

    /// Weight w(i, n) for sample `index` of an `length`-sample frame
    ///
    /// A window shorter than two samples has no shape and weighs 1.
    pub fn weight(&self, index: usize, length: usize) -> f64 {
        if length <= 1 {
            return 1.0;
        }
        let x = index as f64 / (length - 1) as f64;
        (self.profile())(x)
    }

    /// Multiply `buffer` in place by this window (n = buffer length)
    pub fn apply(&self, buffer: &mut [f64]) {
        let length = buffer.len();
        if length <= 1 || *self == WindowKind::Rectangular {
            return;
        }

        let profile = self.profile();
        let span = (length - 1) as f64;
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample *= profile(i as f64 / span);
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        WindowKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigError::UnknownWindow(s.to_string()))
    }
}

impl TryFrom<String> for WindowKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WindowKind> for String {
    fn from(kind: WindowKind) -> Self {
        kind.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_symmetry() {
        for kind in WindowKind::ALL {
            for &n in &[2usize, 7, 64, 1024] {
                for i in 0..n {
                    let a = kind.weight(i, n);
                    let b = kind.weight(n - 1 - i, n);
                    assert!((a - b).abs() < 1e-12, "{} asymmetric at {}/{}", kind, i, n);
                }
            }
        }
    }

    #[test]
    fn test_rectangular_leaves_samples_unchanged() {
        let original: Vec<f64> = (0..64).map(|i| i as f64 - 17.5).collect();
        let mut buffer = original.clone();
        WindowKind::Rectangular.apply(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_closed_forms() {
        let n = 65;
        let center = 32;

        // Hanning and Welch and Triangular taper to zero, peak at 1
        for kind in [WindowKind::Hanning, WindowKind::Welch, WindowKind::Triangular] {
            assert!(kind.weight(0, n).abs() < 1e-12);
            assert!((kind.weight(center, n) - 1.0).abs() < 1e-12);
        }

        // Hamming endpoints sit at 0.08
        assert!((WindowKind::Hamming.weight(0, n) - 0.08).abs() < 1e-12);
        assert!((WindowKind::Hamming.weight(center, n) - 1.0).abs() < 1e-12);

        // Blackman is ~0 at the edges, 1 in the middle
        assert!(WindowKind::Blackman.weight(0, n).abs() < 1e-12);
        assert!((WindowKind::Blackman.weight(center, n) - 1.0).abs() < 1e-12);

        // Four-term windows peak at a0 + a1 + a2 + a3
        let peak: f64 = BLACKMAN_HARRIS.iter().sum();
        assert!((WindowKind::BlackmanHarris.weight(center, n) - peak).abs() < 1e-12);
        let edge = NUTTALL[0] - NUTTALL[1] + NUTTALL[2] - NUTTALL[3];
        assert!((WindowKind::Nuttall.weight(0, n) - edge).abs() < 1e-12);
    }

    #[test]
    fn test_apply_matches_weight() {
        for kind in WindowKind::ALL {
            let mut buffer = vec![2.0; 128];
            kind.apply(&mut buffer);
            for (i, &w) in buffer.iter().enumerate() {
                assert_eq!(w, 2.0 * kind.weight(i, 128));
            }
        }
    }

    #[test]
    fn test_apply_is_deterministic() {
        let mut a: Vec<f64> = (0..256).map(|i| (i as f64 * 0.37).sin()).collect();
        let mut b = a.clone();
        WindowKind::BlackmanNuttall.apply(&mut a);
        WindowKind::BlackmanNuttall.apply(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_names() {
        for kind in WindowKind::ALL {
            assert_eq!(kind.name().parse::<WindowKind>().unwrap(), kind);
        }
        assert_eq!("blackman-harris".parse::<WindowKind>().unwrap(), WindowKind::BlackmanHarris);
        assert_eq!(
            "Kaiser".parse::<WindowKind>(),
            Err(ConfigError::UnknownWindow("Kaiser".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_settings_names() {
        let json = serde_json::to_string(&WindowKind::BlackmanNuttall).unwrap();
        assert_eq!(json, "\"Blackman-Nuttall\"");
        let kind: WindowKind = serde_json::from_str("\"Welch\"").unwrap();
        assert_eq!(kind, WindowKind::Welch);
        assert!(serde_json::from_str::<WindowKind>("\"Gaussian\"").is_err());
    }
}
