//! Rein particle physics
//!
//! Mass-aggregate particle simulation with an iterative contact resolver.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **particle** - Point masses and the `ParticleSet` arena
//! 2. **contact** - Per-contact impulse and interpenetration resolution
//! 3. **resolver** - Iterative worst-first contact scheduling
//! 4. **generator** - Contact generators (ground plane, cables, rods)
//! 5. **force** - Force generators and registry
//! 6. **world** - Frame pipeline with fixed timestep stepping
//! 7. **ecs** - hecs ECS integration (feature = "ecs")

pub mod contact;
pub mod error;
pub mod force;
pub mod generator;
pub mod particle;
pub mod resolver;
pub mod world;

#[cfg(feature = "ecs")]
pub mod ecs;

// Re-export commonly used types
pub use contact::{ParticleContact, ParticleMovement};
pub use error::{ParticleError, ParticleResult};
pub use force::{
    ParticleAnchoredBungee, ParticleAnchoredSpring, ParticleBungee, ParticleBuoyancy, ParticleDrag,
    ParticleFakeSpring, ParticleForceGenerator, ParticleForceRegistry, ParticleGravity,
    ParticleSpring,
};
pub use generator::{GroundContacts, ParticleCable, ParticleContactGenerator, ParticleRod};
pub use particle::{Particle, ParticleHandle, ParticleSet, Real};
pub use resolver::{find_worst_contact, ParticleContactResolver};
pub use world::{ParticleWorld, ParticleWorldConfig};

#[cfg(feature = "ecs")]
pub use ecs::{gather_particles, write_back, ParticleBody};

// Re-export glam for convenience
pub use glam;
