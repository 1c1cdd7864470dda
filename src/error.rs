//! Error types for particle simulation setup and integration.
//!
//! Contact resolution itself never fails; degenerate contacts are skipped.

use thiserror::Error;

use crate::particle::Real;

/// Errors raised by particle construction, integration and world setup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParticleError {
    /// Mass was zero or not finite. Use an inverse mass of 0 for immovable particles.
    #[error("Invalid mass: {0} (must be finite and non-zero)")]
    InvalidMass(Real),

    /// Integration step was not strictly positive.
    #[error("Invalid duration: {0} (must be finite and greater than zero)")]
    InvalidDuration(Real),

    /// World configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A handle did not refer to a particle in the set.
    #[error("Unknown particle handle: {0}")]
    UnknownParticle(usize),
}

/// Convenience alias for `Result<T, ParticleError>`.
pub type ParticleResult<T> = Result<T, ParticleError>;
