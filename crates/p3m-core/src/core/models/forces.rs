use nalgebra::Vector3;
use std::ops::{Index, IndexMut};

/// Caller-owned per-particle force buffer.
///
/// Force gather adds into this buffer and never overwrites it, so several
/// contributions (both interlaced grids, or other force terms computed by the
/// caller) can be accumulated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceAccumulator {
    forces: Vec<Vector3<f64>>,
}

impl ForceAccumulator {
    pub fn new(num_particles: usize) -> Self {
        Self {
            forces: vec![Vector3::zeros(); num_particles],
        }
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub fn reset(&mut self) {
        self.forces.fill(Vector3::zeros());
    }

    pub fn as_slice(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    pub fn as_mut_slice(&mut self) -> &mut [Vector3<f64>] {
        &mut self.forces
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vector3<f64>> {
        self.forces.iter()
    }

    /// Vector sum over all particles; vanishes for an exact pairwise method.
    pub fn net_force(&self) -> Vector3<f64> {
        self.forces.iter().sum()
    }

    /// Root mean square of the force magnitudes.
    pub fn rms(&self) -> f64 {
        if self.forces.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.forces.iter().map(|f| f.norm_squared()).sum();
        (sum_sq / self.forces.len() as f64).sqrt()
    }
}

impl Index<usize> for ForceAccumulator {
    type Output = Vector3<f64>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.forces[index]
    }
}

impl IndexMut<usize> for ForceAccumulator {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.forces[index]
    }
}
