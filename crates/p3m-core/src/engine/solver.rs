use tracing::trace;

use super::error::P3mError;
use super::influence::InfluenceFunction;
use crate::core::fft::FourierTransform3d;
use crate::core::models::mesh::Mesh;

/// Reciprocal-space solve: forward transform, convolution with the
/// influence function, backward transform.
pub struct ReciprocalSolver<F: FourierTransform3d> {
    fft: F,
}

impl<F: FourierTransform3d> ReciprocalSolver<F> {
    pub fn new(fft: F) -> Self {
        Self { fft }
    }

    pub fn fft(&self) -> &F {
        &self.fft
    }

    /// Multiplies both parts of every mesh entry by the influence value at
    /// the same index, which convolves both interlaced grids at once.
    pub fn convolve(mesh: &mut Mesh, influence: &InfluenceFunction) -> Result<(), P3mError> {
        if mesh.size() != influence.size() {
            return Err(P3mError::MeshMismatch {
                expected: influence.size(),
                found: mesh.size(),
            });
        }
        for (value, &g) in mesh.data_mut().iter_mut().zip(influence.values()) {
            *value *= g;
        }
        Ok(())
    }

    /// Turns the assigned charge mesh into the (unnormalised) mesh potential
    /// in place.
    pub fn solve(&self, mesh: &mut Mesh, influence: &InfluenceFunction) -> Result<(), P3mError> {
        if mesh.size() != self.fft.size() {
            return Err(P3mError::MeshMismatch {
                expected: self.fft.size(),
                found: mesh.size(),
            });
        }
        self.fft.forward(mesh);
        Self::convolve(mesh, influence)?;
        self.fft.backward(mesh);
        trace!(mesh = mesh.size(), "Mesh potential solved.");
        Ok(())
    }
}
