//! hecs integration: particles stored as entity components.
//!
//! Contact resolution works on a contiguous [`ParticleSet`], so bodies are
//! gathered into one, resolved, then written back.

use crate::particle::{Particle, ParticleHandle, ParticleSet};

/// Particle component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBody(pub Particle);

/// Collect every [`ParticleBody`] into a set.
///
/// Handle `i` of the returned set belongs to entity `i` of the returned list.
pub fn gather_particles(world: &hecs::World) -> (ParticleSet, Vec<hecs::Entity>) {
    let mut particles = ParticleSet::new();
    let mut entities = Vec::new();

    for (entity, body) in world.query::<&ParticleBody>().iter() {
        particles.insert(body.0.clone());
        entities.push(entity);
    }

    (particles, entities)
}

/// Copy particles back onto the entities they were gathered from.
///
/// Entities that were despawned or lost their body in the meantime are skipped.
pub fn write_back(world: &mut hecs::World, particles: &ParticleSet, entities: &[hecs::Entity]) {
    for (i, entity) in entities.iter().enumerate() {
        let Some(particle) = particles.get(ParticleHandle(i)) else {
            continue;
        };
        if let Ok(mut body) = world.get::<&mut ParticleBody>(*entity) {
            body.0 = particle.clone();
        }
    }
}
