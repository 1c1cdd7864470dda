//! Particle world: owns the particles and runs the simulation pipeline.
//!
//! # Frame
//!
//! 1. Apply force generators
//! 2. Integrate particles
//! 3. Generate contacts
//! 4. Resolve contacts

use tracing::warn;

use crate::contact::ParticleContact;
use crate::error::{ParticleError, ParticleResult};
use crate::force::{ParticleForceGenerator, ParticleForceRegistry};
use crate::generator::ParticleContactGenerator;
use crate::particle::{Particle, ParticleHandle, ParticleSet, Real};
use crate::resolver::ParticleContactResolver;

/// Configuration for the particle simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleWorldConfig {
    /// Maximum contacts generated per frame. Default: 256.
    pub max_contacts: usize,
    /// Contact resolver passes per frame. `None` uses twice the number of
    /// contacts generated that frame. Default: `None`.
    pub solver_iterations: Option<u32>,
    /// Fixed timestep for [`ParticleWorld::step`] in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per [`ParticleWorld::step`]. Default: 4.
    pub max_substeps: u32,
}

impl Default for ParticleWorldConfig {
    fn default() -> Self {
        Self {
            max_contacts: 256,
            solver_iterations: None,
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
        }
    }
}

impl ParticleWorldConfig {
    pub fn validate(&self) -> ParticleResult<()> {
        if self.max_contacts == 0 {
            return Err(ParticleError::InvalidConfig(
                "max_contacts must be greater than zero".into(),
            ));
        }
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(ParticleError::InvalidConfig(format!(
                "fixed_timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_substeps == 0 {
            return Err(ParticleError::InvalidConfig(
                "max_substeps must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// A set of particles with their force and contact generators.
pub struct ParticleWorld {
    config: ParticleWorldConfig,
    accumulator: f64,
    particles: ParticleSet,
    registry: ParticleForceRegistry,
    contact_generators: Vec<Box<dyn ParticleContactGenerator>>,
    resolver: ParticleContactResolver,
    contacts: Vec<ParticleContact>,
}

impl ParticleWorld {
    /// Create a new particle world with the given configuration.
    pub fn new(config: ParticleWorldConfig) -> ParticleResult<Self> {
        config.validate()?;
        Ok(Self {
            resolver: ParticleContactResolver::new(config.solver_iterations.unwrap_or(0)),
            contacts: Vec::with_capacity(config.max_contacts),
            config,
            accumulator: 0.0,
            particles: ParticleSet::new(),
            registry: ParticleForceRegistry::new(),
            contact_generators: Vec::new(),
        })
    }

    pub fn config(&self) -> &ParticleWorldConfig {
        &self.config
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSet {
        &mut self.particles
    }

    pub fn add_particle(&mut self, particle: Particle) -> ParticleHandle {
        self.particles.insert(particle)
    }

    /// Register a force generator for an existing particle.
    pub fn add_force(
        &mut self,
        particle: ParticleHandle,
        generator: Box<dyn ParticleForceGenerator>,
    ) -> ParticleResult<()> {
        if !self.particles.contains(particle) {
            return Err(ParticleError::UnknownParticle(particle.index()));
        }
        self.registry.add(particle, generator);
        Ok(())
    }

    pub fn force_registry(&self) -> &ParticleForceRegistry {
        &self.registry
    }

    pub fn force_registry_mut(&mut self) -> &mut ParticleForceRegistry {
        &mut self.registry
    }

    pub fn add_contact_generator(&mut self, generator: Box<dyn ParticleContactGenerator>) {
        self.contact_generators.push(generator);
    }

    pub fn contact_generators_mut(&mut self) -> &mut Vec<Box<dyn ParticleContactGenerator>> {
        &mut self.contact_generators
    }

    pub fn resolver(&self) -> &ParticleContactResolver {
        &self.resolver
    }

    /// Contacts generated by the last frame, after resolution.
    pub fn contacts(&self) -> &[ParticleContact] {
        &self.contacts
    }

    /// Clear every particle's force accumulator. Forces for the frame can
    /// be added after this.
    pub fn start_frame(&mut self) {
        for particle in self.particles.iter_mut() {
            particle.clear_accumulator();
        }
    }

    /// Ask every contact generator, in registration order, for contacts.
    /// Returns the number generated.
    pub fn generate_contacts(&mut self) -> usize {
        self.contacts.clear();
        let max_contacts = self.config.max_contacts;
        let mut limit = max_contacts;

        for generator in &self.contact_generators {
            let used = generator.add_contact(&self.particles, &mut self.contacts, limit);
            limit = limit.saturating_sub(used);

            if limit == 0 {
                // Generators after this one are not consulted
                warn!(max_contacts, "particle contact buffer full");
                break;
            }
        }

        self.contacts.truncate(max_contacts);
        self.contacts.len()
    }

    /// Integrate every particle forward by `duration`.
    pub fn integrate(&mut self, duration: Real) -> ParticleResult<()> {
        for particle in self.particles.iter_mut() {
            particle.integrate(duration)?;
        }
        Ok(())
    }

    /// Run one frame of physics. Returns the number of contacts resolved.
    pub fn run_physics(&mut self, duration: Real) -> ParticleResult<usize> {
        self.registry.update_forces(&mut self.particles, duration);

        self.integrate(duration)?;

        let used_contacts = self.generate_contacts();

        if used_contacts > 0 {
            if self.config.solver_iterations.is_none() {
                let iterations = u32::try_from(used_contacts.saturating_mul(2)).unwrap_or(u32::MAX);
                self.resolver.set_iterations(iterations);
            }
            self.resolver
                .resolve_contacts(&mut self.contacts, &mut self.particles, duration);
        }

        Ok(used_contacts)
    }

    /// Step the simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator; returns the number of sub-steps run.
    pub fn step(&mut self, delta_time: f64) -> ParticleResult<u32> {
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.start_frame();
            self.run_physics(self.config.fixed_timestep as Real)?;
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }

        Ok(substeps)
    }
}
