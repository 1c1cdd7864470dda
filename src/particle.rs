//! Point-mass particles and the arena that owns them.

use std::ops::{Index, IndexMut};

use glam::Vec3;

use crate::error::{ParticleError, ParticleResult};

/// Scalar type used throughout the simulation.
pub type Real = f32;

/// Default per-second velocity retention.
pub const DEFAULT_DAMPING: Real = 0.999;

/// A point mass with no orientation.
///
/// An inverse mass of 0 marks the particle as immovable: it is never
/// integrated and contact resolution never moves it.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    position: Vec3,
    velocity: Vec3,
    /// Constant acceleration (typically gravity). Also read by the contact
    /// solver to detect resting contacts.
    acceleration: Vec3,
    force_accumulator: Vec3,
    /// Fraction of velocity kept after one second of integration.
    damping: Real,
    inverse_mass: Real,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            damping: DEFAULT_DAMPING,
            inverse_mass: 1.0,
        }
    }
}

impl Particle {
    /// Create a movable particle with the given mass.
    pub fn new(position: Vec3, mass: Real) -> ParticleResult<Self> {
        let mut particle = Self {
            position,
            ..Self::default()
        };
        particle.set_mass(mass)?;
        Ok(particle)
    }

    /// Create an immovable particle (infinite mass).
    pub fn fixed(position: Vec3) -> Self {
        Self {
            position,
            inverse_mass: 0.0,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec3) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn with_damping(mut self, damping: Real) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_inverse_mass(mut self, inverse_mass: Real) -> Self {
        self.inverse_mass = inverse_mass;
        self
    }

    /// Set the mass. Zero or non-finite masses are rejected; use
    /// [`set_inverse_mass`](Self::set_inverse_mass) with 0 for immovable particles.
    pub fn set_mass(&mut self, mass: Real) -> ParticleResult<()> {
        if mass == 0.0 || !mass.is_finite() {
            return Err(ParticleError::InvalidMass(mass));
        }
        self.inverse_mass = 1.0 / mass;
        Ok(())
    }

    /// Mass of the particle, `Real::MAX` when immovable.
    pub fn mass(&self) -> Real {
        if self.inverse_mass == 0.0 {
            Real::MAX
        } else {
            1.0 / self.inverse_mass
        }
    }

    pub fn set_inverse_mass(&mut self, inverse_mass: Real) {
        self.inverse_mass = inverse_mass;
    }

    pub fn inverse_mass(&self) -> Real {
        self.inverse_mass
    }

    /// True when the particle can be moved by forces and contacts.
    pub fn has_finite_mass(&self) -> bool {
        self.inverse_mass > 0.0
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn set_acceleration(&mut self, acceleration: Vec3) {
        self.acceleration = acceleration;
    }

    pub fn damping(&self) -> Real {
        self.damping
    }

    pub fn set_damping(&mut self, damping: Real) {
        self.damping = damping;
    }

    /// Forces accumulated since the last integration.
    pub fn accumulated_force(&self) -> Vec3 {
        self.force_accumulator
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.force_accumulator += force;
    }

    pub fn clear_accumulator(&mut self) {
        self.force_accumulator = Vec3::ZERO;
    }

    /// Advance the particle by `duration` seconds using semi-implicit Euler
    /// with damping, then clear the force accumulator.
    pub fn integrate(&mut self, duration: Real) -> ParticleResult<()> {
        if !self.has_finite_mass() {
            return Ok(());
        }
        if duration <= 0.0 || !duration.is_finite() {
            return Err(ParticleError::InvalidDuration(duration));
        }

        self.position += self.velocity * duration;

        let resulting_acc = self.acceleration + self.force_accumulator * self.inverse_mass;
        self.velocity += resulting_acc * duration;

        // Drag
        self.velocity *= self.damping.powf(duration);

        self.clear_accumulator();
        Ok(())
    }
}

/// Non-owning reference to a particle in a [`ParticleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleHandle(pub usize);

impl ParticleHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Contiguous arena of particles addressed by [`ParticleHandle`].
#[derive(Debug, Clone, Default)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
        }
    }

    /// Add a particle and return its handle.
    pub fn insert(&mut self, particle: Particle) -> ParticleHandle {
        self.particles.push(particle);
        ParticleHandle(self.particles.len() - 1)
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.particles.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.particles.get_mut(handle.0)
    }

    pub fn contains(&self, handle: ParticleHandle) -> bool {
        handle.0 < self.particles.len()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParticleHandle, &Particle)> {
        self.particles
            .iter()
            .enumerate()
            .map(|(i, p)| (ParticleHandle(i), p))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Particle> {
        self.particles.iter_mut()
    }

    pub fn handles(&self) -> impl Iterator<Item = ParticleHandle> {
        (0..self.particles.len()).map(ParticleHandle)
    }
}

impl Index<ParticleHandle> for ParticleSet {
    type Output = Particle;

    fn index(&self, handle: ParticleHandle) -> &Particle {
        &self.particles[handle.0]
    }
}

impl IndexMut<ParticleHandle> for ParticleSet {
    fn index_mut(&mut self, handle: ParticleHandle) -> &mut Particle {
        &mut self.particles[handle.0]
    }
}

impl FromIterator<Particle> for ParticleSet {
    fn from_iter<I: IntoIterator<Item = Particle>>(iter: I) -> Self {
        Self {
            particles: iter.into_iter().collect(),
        }
    }
}
