use nalgebra::Point3;

/// A point charge in the periodic simulation cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Point3<f64>,
    pub charge: f64,
}

impl Particle {
    pub fn new(position: Point3<f64>, charge: f64) -> Self {
        Self { position, charge }
    }
}

/// Represents an ordered collection of point charges in a cubic periodic box.
///
/// The system is owned by the caller; the mesh algorithms only read from it.
/// Positions may lie anywhere in real space, they are folded back into the
/// primary cell whenever they are mapped onto the mesh. The particle order is
/// the order of every per-particle buffer produced from the system (assignment
/// caches and force accumulators).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
}

impl ParticleSystem {
    /// Creates a new, empty particle system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty system with room for `capacity` particles.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
        }
    }

    /// Appends a particle and returns its index.
    ///
    /// # Arguments
    ///
    /// * `position` - Cartesian position, in the same length unit as the box.
    /// * `charge` - Charge in elementary units.
    ///
    /// # Return
    ///
    /// The index of the new particle, which is also its slot in every force
    /// buffer computed for this system.
    pub fn add_particle(&mut self, position: Point3<f64>, charge: f64) -> usize {
        self.particles.push(Particle::new(position, charge));
        self.particles.len() - 1
    }

    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Sum of squared charges, Σq², which scales every RMS error estimate.
    pub fn sum_q2(&self) -> f64 {
        self.particles.iter().map(|p| p.charge * p.charge).sum()
    }

    /// Net charge of the system. A non-neutral system is implicitly
    /// neutralised by the uniform background the zero frequency drops.
    pub fn total_charge(&self) -> f64 {
        self.particles.iter().map(|p| p.charge).sum()
    }
}

impl FromIterator<Particle> for ParticleSystem {
    fn from_iter<I: IntoIterator<Item = Particle>>(iter: I) -> Self {
        Self {
            particles: iter.into_iter().collect(),
        }
    }
}
