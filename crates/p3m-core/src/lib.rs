//! # P3M Core Library
//!
//! Reciprocal-space Coulomb forces for periodic, cubic particle systems with
//! the particle-particle particle-mesh (P3M) method in its analytically
//! differentiated variant, at `O(N + M³ log M)` cost.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`ParticleSystem`, `Mesh`,
//!   `ForceAccumulator`), spectral helper math and the two numerical seams: the
//!   interpolation weights and the 3-D Fourier transform.
//!
//! - **[`engine`]: The Logic Core.** Charge assignment, the optimal influence
//!   function, the reciprocal solver, the self-force and real-space error seams and
//!   the analytic error estimators, each usable on its own.
//!
//! - **[`workflows`]: The Public API.** [`workflows::forces::P3mAd`] sequences one
//!   force evaluation per step; [`workflows::tune`] ranks candidate parameter sets.
//!
//! Units are Gaussian with a unit Coulomb constant: the forces returned are
//! `q_i · E(r_i)` for charges in elementary units and lengths in box units.

pub mod core;
pub mod engine;
pub mod workflows;
