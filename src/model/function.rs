//! Pure coordinate functions used as stages of composite pipelines.
//!
//! These are the calibration steps that no registration file can carry:
//! offset/voxel-pitch corrections between acquisition and template
//! conventions, stack flips along z, and reflections about a calibrated
//! plane of symmetry. They are declared here as data so the transform
//! engine can evaluate them and tests can check the arithmetic.

use serde::{Deserialize, Serialize};

/// Reflect `x` about the plane at `plane`: `2 * plane - x`.
pub fn reflect(x: f64, plane: f64) -> f64 {
    2.0 * plane - x
}

/// Flip `z` across a stack of `slices` slices with pitch `pitch`:
/// `(slices - 1) * pitch - z`. `z` and `pitch` share the same unit.
pub fn flip_stack(z: f64, slices: u32, pitch: f64) -> f64 {
    (f64::from(slices) - 1.0) * pitch - z
}

/// Cartesian axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Reflection about a fixed plane perpendicular to `axis`.
///
/// `plane` is a calibration constant of the space, not its geometric centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisReflection {
    pub axis: Axis,
    pub plane: f64,
}

impl AxisReflection {
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let mut out = p;
        let i = self.axis.index();
        out[i] = reflect(p[i], self.plane);
        out
    }
}

/// Flip of a z stack, expressed in the unit the pitch was calibrated in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StackFlip {
    pub slices: u32,
    pub pitch: f64,
}

/// Correction between a raw acquisition frame and the frame a core
/// registration method was fitted in.
///
/// Into the template frame, in order: subtract `offset`, divide by
/// `acquisition_pitch`, multiply by `template_pitch`, flip z (in the
/// template-pitch unit), divide by `output_scale`. The reverse applies the
/// inverse steps in reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionCorrection {
    pub offset: [f64; 3],
    pub acquisition_pitch: [f64; 3],
    pub template_pitch: [f64; 3],
    pub flip: StackFlip,
    /// e.g. 1000 to go from nanometres to microns.
    pub output_scale: f64,
}

impl AcquisitionCorrection {
    pub fn into_template(&self, p: [f64; 3]) -> [f64; 3] {
        let mut q = [0.0; 3];
        for i in 0..3 {
            q[i] = (p[i] - self.offset[i]) / self.acquisition_pitch[i] * self.template_pitch[i];
        }
        q[2] = flip_stack(q[2], self.flip.slices, self.flip.pitch);
        q.map(|v| v / self.output_scale)
    }

    pub fn from_template(&self, p: [f64; 3]) -> [f64; 3] {
        let mut q = p.map(|v| v * self.output_scale);
        q[2] = flip_stack(q[2], self.flip.slices, self.flip.pitch);
        for i in 0..3 {
            q[i] = q[i] / self.template_pitch[i] * self.acquisition_pitch[i] + self.offset[i];
        }
        q
    }
}

/// Which way an [`AcquisitionCorrection`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectionDirection {
    IntoTemplate,
    FromTemplate,
}

/// A named pure mapping over points. Not invertible by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordinateFunction {
    Correction {
        name: String,
        correction: AcquisitionCorrection,
        direction: CorrectionDirection,
    },
    Reflection {
        name: String,
        reflection: AxisReflection,
    },
}

impl CoordinateFunction {
    pub fn name(&self) -> &str {
        match self {
            CoordinateFunction::Correction { name, .. } => name,
            CoordinateFunction::Reflection { name, .. } => name,
        }
    }

    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        match self {
            CoordinateFunction::Correction { correction, direction, .. } => match direction {
                CorrectionDirection::IntoTemplate => correction.into_template(p),
                CorrectionDirection::FromTemplate => correction.from_template(p),
            },
            CoordinateFunction::Reflection { reflection, .. } => reflection.apply(p),
        }
    }

    pub fn apply_all(&self, points: &mut [[f64; 3]]) {
        for p in points.iter_mut() {
            *p = self.apply(*p);
        }
    }
}
