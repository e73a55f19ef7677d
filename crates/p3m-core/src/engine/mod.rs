//! # Engine Module
//!
//! The numerical pipeline of one reciprocal-space force evaluation, plus the
//! analytic error estimates used to pick its parameters.
//!
//! ## Overview
//!
//! A force evaluation spreads charges onto the mesh, solves for the mesh
//! potential in Fourier space with the optimal influence function and gathers
//! forces back with the analytically differentiated assignment weights. The
//! engine exposes each of these stages separately; the ordering lives in the
//! workflows.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated method parameters and their builder
//! - **Error Handling** ([`error`]) - Engine-wide error type
//! - **Progress Monitoring** ([`progress`]) - Callback based progress reporting
//! - **Charge Assignment** ([`assignment`]) - Spread and gather with per-step caches
//! - **Influence Function** ([`influence`]) - Optimal lattice Green's function
//! - **Solver** ([`solver`]) - Transform, convolution and back-transform
//! - **Collaborators** ([`collaborators`]) - Self-force and real-space error seams
//! - **Tuning** ([`tuning`]) - RMS error estimates and the Hockney–Eastwood functional

pub mod assignment;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod influence;
pub mod progress;
pub mod solver;
pub mod tuning;
