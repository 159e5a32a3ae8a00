//! Homogeneous 4x4 affine matrix payload.

use serde::{Deserialize, Serialize};

/// Row-major homogeneous affine matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineMatrix(pub [[f64; 4]; 4]);

impl AffineMatrix {
    pub fn identity() -> Self {
        Self::diagonal([1.0, 1.0, 1.0])
    }

    /// `diag(sx, sy, sz, 1)`.
    pub fn diagonal(scale: [f64; 3]) -> Self {
        Self::scale_offset(scale, [0.0; 3])
    }

    /// Per-axis scaling followed by a fixed offset: `x' = s * x + t`.
    pub fn scale_offset(scale: [f64; 3], offset: [f64; 3]) -> Self {
        let mut m = [[0.0; 4]; 4];
        for i in 0..3 {
            m[i][i] = scale[i];
            m[i][3] = offset[i];
        }
        m[3][3] = 1.0;
        Self(m)
    }

    pub fn is_diagonal(&self) -> bool {
        (0..4).all(|r| (0..4).all(|c| r == c || self.0[r][c] == 0.0))
    }

    pub fn scale(&self) -> [f64; 3] {
        [self.0[0][0], self.0[1][1], self.0[2][2]]
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.0[0][3], self.0[1][3], self.0[2][3]]
    }

    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        let mut out = [0.0; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = m[r][0] * p[0] + m[r][1] * p[1] + m[r][2] * p[2] + m[r][3];
        }
        out
    }

    /// All entries finite and the linear part non-singular.
    pub fn is_valid(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_finite()) && self.determinant3().abs() > f64::EPSILON
    }

    fn determinant3(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}
