use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::models::mesh::Mesh;

/// In-place complex-to-complex 3-D transform over a cubic [`Mesh`].
///
/// `forward` computes `Σ x·exp(-2πi n·j/M)`; `backward` uses the opposite
/// sign and is NOT normalised, so `backward(forward(x)) = M³·x`.
pub trait FourierTransform3d: Send + Sync {
    fn size(&self) -> usize;
    fn forward(&self, mesh: &mut Mesh);
    fn backward(&self, mesh: &mut Mesh);
}

/// Axis-by-axis 3-D transform built from one-dimensional `rustfft` plans.
pub struct RustFft3d {
    size: usize,
    fft_forward: Arc<dyn Fft<f64>>,
    fft_inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for RustFft3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustFft3d").field("size", &self.size).finish()
    }
}

impl RustFft3d {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        Self {
            size,
            fft_forward,
            fft_inverse,
        }
    }

    fn transform(&self, fft: &dyn Fft<f64>, mesh: &mut Mesh) {
        let m = self.size;
        let data = mesh.data_mut();

        // k is contiguous: rustfft processes every consecutive line in one call
        fft.process(data);

        let mut line = vec![Complex::new(0.0, 0.0); m];

        // j axis, stride m
        for i in 0..m {
            let plane = &mut data[i * m * m..(i + 1) * m * m];
            for k in 0..m {
                for j in 0..m {
                    line[j] = plane[j * m + k];
                }
                fft.process(&mut line);
                for j in 0..m {
                    plane[j * m + k] = line[j];
                }
            }
        }

        // i axis, stride m²
        for j in 0..m {
            for k in 0..m {
                let offset = j * m + k;
                for i in 0..m {
                    line[i] = data[i * m * m + offset];
                }
                fft.process(&mut line);
                for i in 0..m {
                    data[i * m * m + offset] = line[i];
                }
            }
        }
    }
}

impl FourierTransform3d for RustFft3d {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&self, mesh: &mut Mesh) {
        self.transform(self.fft_forward.as_ref(), mesh);
    }

    fn backward(&self, mesh: &mut Mesh) {
        self.transform(self.fft_inverse.as_ref(), mesh);
    }
}
