pub mod forces;
pub mod tune;

use crate::config::SystemConfig;
use nalgebra::Point3;
use p3m::core::models::system::ParticleSystem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Uniformly placed unit charges of alternating sign inside `[0, L)³`.
///
/// An odd particle count leaves a net charge of `+1`.
pub fn generate_system(config: &SystemConfig, box_length: f64) -> ParticleSystem {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut system = ParticleSystem::with_capacity(config.particles);
    for i in 0..config.particles {
        let position = Point3::new(
            rng.random_range(0.0..box_length),
            rng.random_range(0.0..box_length),
            rng.random_range(0.0..box_length),
        );
        let charge = if i % 2 == 0 { 1.0 } else { -1.0 };
        system.add_particle(position, charge);
    }

    if system.total_charge() != 0.0 {
        warn!(
            net_charge = system.total_charge(),
            "Generated system is not charge neutral."
        );
    }
    debug!(
        particles = system.len(),
        seed = config.seed,
        "Generated random test system."
    );
    system
}
