//! Finite-support window functions.
//!
//! Every window is whole-point symmetric and stored zero-delay: sample 0 is
//! the window centre, the right half follows, and the left half sits at the
//! end of the array. For even lengths the sample at `gl / 2` (the point
//! `-0.5` of the support) is forced to zero so the window stays symmetric.
//! Use [`fftshift`](super::array::fftshift) to get the usual centred layout.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VocoderError;

/// Window shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowShape {
    Hann,
    SqrtHann,
    Hamming,
    Nuttall01,
    Rect,
    Triangular,
    #[serde(rename = "sqrttria")]
    SqrtTriangular,
    Blackman,
    Blackman2,
    Nuttall,
    Ogg,
    Nuttall20,
    Nuttall11,
    Nuttall02,
    Nuttall30,
    Nuttall21,
    Nuttall03,
    TruncGauss01,
    TruncGauss005,
}

impl WindowShape {
    /// All shapes, in declaration order.
    pub const ALL: [WindowShape; 19] = [
        WindowShape::Hann,
        WindowShape::SqrtHann,
        WindowShape::Hamming,
        WindowShape::Nuttall01,
        WindowShape::Rect,
        WindowShape::Triangular,
        WindowShape::SqrtTriangular,
        WindowShape::Blackman,
        WindowShape::Blackman2,
        WindowShape::Nuttall,
        WindowShape::Ogg,
        WindowShape::Nuttall20,
        WindowShape::Nuttall11,
        WindowShape::Nuttall02,
        WindowShape::Nuttall30,
        WindowShape::Nuttall21,
        WindowShape::Nuttall03,
        WindowShape::TruncGauss01,
        WindowShape::TruncGauss005,
    ];

    /// Canonical lowercase name, accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            WindowShape::Hann => "hann",
            WindowShape::SqrtHann => "sqrthann",
            WindowShape::Hamming => "hamming",
            WindowShape::Nuttall01 => "nuttall01",
            WindowShape::Rect => "rect",
            WindowShape::Triangular => "triangular",
            WindowShape::SqrtTriangular => "sqrttria",
            WindowShape::Blackman => "blackman",
            WindowShape::Blackman2 => "blackman2",
            WindowShape::Nuttall => "nuttall",
            WindowShape::Ogg => "ogg",
            WindowShape::Nuttall20 => "nuttall20",
            WindowShape::Nuttall11 => "nuttall11",
            WindowShape::Nuttall02 => "nuttall02",
            WindowShape::Nuttall30 => "nuttall30",
            WindowShape::Nuttall21 => "nuttall21",
            WindowShape::Nuttall03 => "nuttall03",
            WindowShape::TruncGauss01 => "truncgauss01",
            WindowShape::TruncGauss005 => "truncgauss005",
        }
    }

    /// Window value at normalized position `x` in `[-0.5, 0.5]`.
    fn eval(self, x: f64) -> f64 {
        let c1 = (2.0 * PI * x).cos();
        let c2 = (4.0 * PI * x).cos();
        let c3 = (6.0 * PI * x).cos();
        match self {
            WindowShape::Hann => 0.5 + 0.5 * c1,
            WindowShape::SqrtHann => (0.5 + 0.5 * c1).max(0.0).sqrt(),
            WindowShape::Hamming => 0.54 + 0.46 * c1,
            WindowShape::Nuttall01 => 0.53836 + 0.46164 * c1,
            WindowShape::Rect => {
                if x.abs() < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            WindowShape::Triangular => 1.0 - 2.0 * x.abs(),
            WindowShape::SqrtTriangular => (1.0 - 2.0 * x.abs()).max(0.0).sqrt(),
            WindowShape::Blackman => 0.42 + 0.5 * c1 + 0.08 * c2,
            WindowShape::Blackman2 => (7938.0 + 9240.0 * c1 + 1430.0 * c2) / 18608.0,
            WindowShape::Nuttall => 0.355768 + 0.487396 * c1 + 0.144232 * c2 + 0.012604 * c3,
            WindowShape::Ogg => {
                let inner = (PI * x).cos();
                (PI / 2.0 * inner * inner).sin()
            }
            WindowShape::Nuttall20 => (3.0 + 4.0 * c1 + c2) / 8.0,
            WindowShape::Nuttall11 => 0.40897 + 0.5 * c1 + 0.09103 * c2,
            WindowShape::Nuttall02 => 0.4243801 + 0.4973406 * c1 + 0.0782793 * c2,
            WindowShape::Nuttall30 => (10.0 + 15.0 * c1 + 6.0 * c2 + c3) / 32.0,
            WindowShape::Nuttall21 => 0.338946 + 0.481973 * c1 + 0.161054 * c2 + 0.018027 * c3,
            WindowShape::Nuttall03 => {
                0.3635819 + 0.4891775 * c1 + 0.1365995 * c2 + 0.0106411 * c3
            }
            WindowShape::TruncGauss01 => (4.0 * 0.01f64.ln() * x * x).exp(),
            WindowShape::TruncGauss005 => (4.0 * 0.005f64.ln() * x * x).exp(),
        }
    }
}

impl fmt::Display for WindowShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WindowShape {
    type Err = VocoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" | "nuttall10" => WindowShape::Hann,
            "sqrthann" | "cosine" | "sine" => WindowShape::SqrtHann,
            "hamming" => WindowShape::Hamming,
            "nuttall01" => WindowShape::Nuttall01,
            "rect" | "square" => WindowShape::Rect,
            "triangular" | "tria" | "bartlett" => WindowShape::Triangular,
            "sqrttria" | "sqrttriangular" => WindowShape::SqrtTriangular,
            "blackman" => WindowShape::Blackman,
            "blackman2" => WindowShape::Blackman2,
            "nuttall" | "nuttall12" => WindowShape::Nuttall,
            "ogg" | "itersine" => WindowShape::Ogg,
            "nuttall20" => WindowShape::Nuttall20,
            "nuttall11" => WindowShape::Nuttall11,
            "nuttall02" => WindowShape::Nuttall02,
            "nuttall30" => WindowShape::Nuttall30,
            "nuttall21" => WindowShape::Nuttall21,
            "nuttall03" => WindowShape::Nuttall03,
            "truncgauss01" => WindowShape::TruncGauss01,
            "truncgauss005" => WindowShape::TruncGauss005,
            _ => return Err(VocoderError::UnknownWindow(s.to_string())),
        };
        Ok(shape)
    }
}

/// Signed time offset of zero-delay sample `i` in a window of length `gl`.
#[inline]
fn signed_offset(i: usize, gl: usize) -> f64 {
    if i < gl.div_ceil(2) {
        i as f64
    } else {
        i as f64 - gl as f64
    }
}

/// Zeroes the `-0.5` sample of even-length windows.
#[inline]
fn fix_symmetry(g: &mut [f64]) {
    let gl = g.len();
    if gl > 0 && gl % 2 == 0 {
        g[gl / 2] = 0.0;
    }
}

/// Generates a zero-delay window of the given shape and length.
pub fn generate_window(shape: WindowShape, gl: usize) -> Vec<f64> {
    let mut g: Vec<f64> = (0..gl)
        .map(|i| shape.eval(signed_offset(i, gl) / gl as f64))
        .collect();
    fix_symmetry(&mut g);
    g
}

/// Length of the truncated Gaussian matched to a lattice with hop `a` and
/// `m` channels, cut where it falls below `thr`.
///
/// Returns 0 for degenerate parameters.
pub fn mtgauss_length(a: usize, m: usize, thr: f64) -> usize {
    debug_check!(a > 0, "a must be positive");
    debug_check!(m > 0, "m must be positive");
    debug_check!(thr > 0.0 && thr <= 1.0, "thr must be in (0, 1]");
    if a == 0 || m == 0 || !(thr > 0.0 && thr <= 1.0) {
        return 0;
    }
    let half = (-(a as f64) * m as f64 * thr.ln() / PI).sqrt().round();
    2 * half as usize
}

/// Truncated Gaussian whose time-frequency spread matches the lattice
/// `(a, m)`, i.e. `exp(-pi * t^2 / (a * m))`, stored zero-delay.
pub fn mtgauss(a: usize, m: usize, thr: f64) -> Vec<f64> {
    let gl = mtgauss_length(a, m, thr);
    if gl == 0 {
        return Vec::new();
    }
    let scale = -PI / (a as f64 * m as f64);
    let mut g: Vec<f64> = (0..gl)
        .map(|i| {
            let t = signed_offset(i, gl);
            (scale * t * t).exp()
        })
        .collect();
    fix_symmetry(&mut g);
    g
}
