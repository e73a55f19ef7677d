//! # Core Module
//!
//! Stateless building blocks of the particle-particle particle-mesh method.
//!
//! ## Overview
//!
//! Nothing in this module knows about a simulation step. It provides the data
//! the engine operates on and the two numerical seams the engine is generic
//! over: the assignment kernel and the 3-D Fourier transform.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Particle systems, the periodic complex mesh and
//!   per-particle force buffers
//! - **Interpolation** ([`interpolation`]) - The [`interpolation::InterpolationWeights`]
//!   seam and its tabulated B-spline implementation
//! - **Transforms** ([`fft`]) - The [`fft::FourierTransform3d`] seam and its `rustfft`
//!   backed implementation
//! - **Spectral Helpers** ([`utils`]) - `sinc`, frequency shifts and closed-form
//!   aliasing sums shared by the influence function and the error estimators

pub mod fft;
pub mod interpolation;
pub mod models;
pub mod utils;
