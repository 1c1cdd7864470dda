//! Force generators and the registry that applies them each frame.

use glam::Vec3;

use crate::particle::{ParticleHandle, ParticleSet, Real};

/// Adds a force to one particle each frame.
pub trait ParticleForceGenerator {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, duration: Real);
}

/// Constant gravitational acceleration, applied as a mass-scaled force.
#[derive(Debug, Clone, Copy)]
pub struct ParticleGravity {
    pub gravity: Vec3,
}

impl ParticleGravity {
    pub fn new(gravity: Vec3) -> Self {
        Self { gravity }
    }
}

impl ParticleForceGenerator for ParticleGravity {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let particle = &mut particles[target];
        if !particle.has_finite_mass() {
            return;
        }
        let force = self.gravity * particle.mass();
        particle.add_force(force);
    }
}

/// Drag with linear (`k1`) and quadratic (`k2`) speed terms.
#[derive(Debug, Clone, Copy)]
pub struct ParticleDrag {
    pub k1: Real,
    pub k2: Real,
}

impl ParticleForceGenerator for ParticleDrag {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let particle = &mut particles[target];
        let velocity = particle.velocity();
        let speed = velocity.length();
        let drag_coeff = self.k1 * speed + self.k2 * speed * speed;
        particle.add_force(velocity.normalize_or_zero() * -drag_coeff);
    }
}

/// Hooke's law along `offset`: pulls in when stretched past `rest_length`,
/// pushes out when compressed.
fn spring_force(offset: Vec3, spring_constant: Real, rest_length: Real) -> Vec3 {
    let magnitude = (rest_length - offset.length()) * spring_constant;
    offset.normalize_or_zero() * magnitude
}

/// Pull-only variant of [`spring_force`]; zero while not stretched.
fn bungee_force(offset: Vec3, spring_constant: Real, rest_length: Real) -> Vec3 {
    let length = offset.length();
    if length <= rest_length {
        return Vec3::ZERO;
    }
    offset.normalize_or_zero() * -(spring_constant * (length - rest_length))
}

/// Spring between the target and another particle.
#[derive(Debug, Clone, Copy)]
pub struct ParticleSpring {
    pub other: ParticleHandle,
    pub spring_constant: Real,
    pub rest_length: Real,
}

impl ParticleForceGenerator for ParticleSpring {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let offset = particles[target].position() - particles[self.other].position();
        particles[target].add_force(spring_force(offset, self.spring_constant, self.rest_length));
    }
}

/// Spring between the target and a fixed point in space.
#[derive(Debug, Clone, Copy)]
pub struct ParticleAnchoredSpring {
    pub anchor: Vec3,
    pub spring_constant: Real,
    pub rest_length: Real,
}

impl ParticleForceGenerator for ParticleAnchoredSpring {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let offset = particles[target].position() - self.anchor;
        particles[target].add_force(spring_force(offset, self.spring_constant, self.rest_length));
    }
}

/// Spring that only pulls: no force while the pair is closer than `rest_length`.
#[derive(Debug, Clone, Copy)]
pub struct ParticleBungee {
    pub other: ParticleHandle,
    pub spring_constant: Real,
    pub rest_length: Real,
}

impl ParticleForceGenerator for ParticleBungee {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let offset = particles[target].position() - particles[self.other].position();
        particles[target].add_force(bungee_force(offset, self.spring_constant, self.rest_length));
    }
}

/// Bungee between the target and a fixed point in space.
#[derive(Debug, Clone, Copy)]
pub struct ParticleAnchoredBungee {
    pub anchor: Vec3,
    pub spring_constant: Real,
    pub rest_length: Real,
}

impl ParticleForceGenerator for ParticleAnchoredBungee {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let offset = particles[target].position() - self.anchor;
        particles[target].add_force(bungee_force(offset, self.spring_constant, self.rest_length));
    }
}

/// Stiff anchored spring, faked by predicting where a damped harmonic
/// oscillator would put the particle after `duration` and applying the force
/// that gets it there.
///
/// Only underdamped springs (`4 * spring_constant > damping * damping`) are
/// simulated; anything else, or a non-positive `duration`, adds no force.
#[derive(Debug, Clone, Copy)]
pub struct ParticleFakeSpring {
    pub anchor: Vec3,
    pub spring_constant: Real,
    pub damping: Real,
}

impl ParticleForceGenerator for ParticleFakeSpring {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, duration: Real) {
        let particle = &mut particles[target];
        if !particle.has_finite_mass() || duration <= 0.0 || !duration.is_finite() {
            return;
        }

        let discriminant = 4.0 * self.spring_constant - self.damping * self.damping;
        if discriminant <= 0.0 || discriminant.is_nan() {
            return;
        }
        let gamma = 0.5 * discriminant.sqrt();

        let position = particle.position() - self.anchor;
        let velocity = particle.velocity();
        let c = position * (self.damping / (2.0 * gamma)) + velocity * (1.0 / gamma);

        let target_position = (position * (gamma * duration).cos()
            + c * (gamma * duration).sin())
            * (-0.5 * duration * self.damping).exp();

        let acceleration =
            (target_position - position) / (duration * duration) - velocity / duration;
        let force = acceleration * particle.mass();
        particle.add_force(force);
    }
}

/// Buoyancy for a liquid plane parallel to XZ at `water_height`.
#[derive(Debug, Clone, Copy)]
pub struct ParticleBuoyancy {
    /// Submersion depth at which the maximum force is reached.
    pub max_depth: Real,
    pub volume: Real,
    pub water_height: Real,
    pub liquid_density: Real,
}

impl ParticleBuoyancy {
    /// Buoyancy in water (density 1000).
    pub fn new(max_depth: Real, volume: Real, water_height: Real) -> Self {
        Self {
            max_depth,
            volume,
            water_height,
            liquid_density: 1000.0,
        }
    }
}

impl ParticleForceGenerator for ParticleBuoyancy {
    fn update_force(&self, target: ParticleHandle, particles: &mut ParticleSet, _duration: Real) {
        let depth = particles[target].position().y;

        // Out of the water
        if depth >= self.water_height + self.max_depth {
            return;
        }

        let max_force = self.liquid_density * self.volume;
        let force_y = if depth <= self.water_height - self.max_depth {
            max_force
        } else {
            // Partly submerged: scale linearly with the submerged fraction
            max_force * (self.water_height + self.max_depth - depth) / (2.0 * self.max_depth)
        };
        particles[target].add_force(Vec3::new(0.0, force_y, 0.0));
    }
}

struct ParticleForceRegistration {
    particle: ParticleHandle,
    generator: Box<dyn ParticleForceGenerator>,
}

/// Pairs particles with the force generators that act on them.
#[derive(Default)]
pub struct ParticleForceRegistry {
    registrations: Vec<ParticleForceRegistration>,
}

impl std::fmt::Debug for ParticleForceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleForceRegistry")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

impl ParticleForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, particle: ParticleHandle, generator: Box<dyn ParticleForceGenerator>) {
        self.registrations.push(ParticleForceRegistration {
            particle,
            generator,
        });
    }

    /// Remove every registration for `particle`. Returns how many were removed.
    pub fn remove(&mut self, particle: ParticleHandle) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.particle != particle);
        before - self.registrations.len()
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Run every generator, in registration order.
    pub fn update_forces(&self, particles: &mut ParticleSet, duration: Real) {
        for registration in &self.registrations {
            registration
                .generator
                .update_force(registration.particle, particles, duration);
        }
    }
}
