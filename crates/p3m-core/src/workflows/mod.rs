//! # Workflows Module
//!
//! User-facing entry points that tie the engine stages together.
//!
//! ## Architecture
//!
//! - **Force Evaluation** ([`forces`]) - [`forces::P3mAd`], the per-step reciprocal-space
//!   force driver that owns the mesh, influence function and collaborators
//! - **Parameter Tuning** ([`tune`]) - Ranking candidate `(mesh, cao, alpha)` triples by
//!   their estimated RMS force error

pub mod forces;
pub mod tune;
