//! Shared setup helpers for rein-particle benchmarks.
//!
//! ## Running
//!
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench contacts
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench contacts -- resolver

use glam::Vec3;
use rein_particle::{
    GroundContacts, Particle, ParticleContact, ParticleRod, ParticleSet, ParticleWorld,
    ParticleWorldConfig,
};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

// ---------------------------------------------------------------------------
// Contact batches
// ---------------------------------------------------------------------------

/// `n` independent particles sunk into the ground, each with a scenery contact.
pub fn setup_ground_contacts(n: usize) -> (ParticleSet, Vec<ParticleContact>) {
    let mut particles = ParticleSet::with_capacity(n);
    let mut contacts = Vec::with_capacity(n);

    for i in 0..n {
        let depth = 0.01 + (i % 7) as f32 * 0.01;
        let handle = particles.insert(
            Particle::default()
                .with_position(Vec3::new(i as f32, -depth, 0.0))
                .with_velocity(Vec3::new(0.0, -1.0 - (i % 5) as f32, 0.0))
                .with_acceleration(GRAVITY),
        );
        contacts.push(ParticleContact::against_scenery(handle, Vec3::Y, 0.3, depth));
    }

    (particles, contacts)
}

/// A vertical chain of `n` overlapping particles resting on the ground, so
/// each resolution perturbs its neighbours.
pub fn setup_stack_contacts(n: usize) -> (ParticleSet, Vec<ParticleContact>) {
    let mut particles = ParticleSet::with_capacity(n);
    let mut contacts = Vec::with_capacity(n);

    let handles: Vec<_> = (0..n)
        .map(|i| {
            particles.insert(
                Particle::default()
                    .with_position(Vec3::new(0.0, i as f32 * 0.9 - 0.1, 0.0))
                    .with_acceleration(GRAVITY),
            )
        })
        .collect();

    if let Some(&bottom) = handles.first() {
        contacts.push(ParticleContact::against_scenery(bottom, Vec3::Y, 0.0, 0.1));
    }
    for pair in handles.windows(2) {
        contacts.push(ParticleContact::new(pair[1], Some(pair[0]), Vec3::Y, 0.0, 0.1));
    }

    (particles, contacts)
}

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

/// `n` falling particles over the ground, linked in pairs by rods.
pub fn setup_world(n: usize) -> ParticleWorld {
    let config = ParticleWorldConfig {
        max_contacts: (n * 2).max(1),
        ..Default::default()
    };
    let mut world =
        ParticleWorld::new(config).unwrap_or_else(|e| panic!("benchmark config rejected: {e}"));

    let cols = (n as f32).sqrt().ceil() as usize;
    let mut previous = None;
    for i in 0..n {
        let x = (i % cols) as f32 * 1.5;
        let z = (i / cols) as f32 * 1.5;
        let handle = world.add_particle(
            Particle::default()
                .with_position(Vec3::new(x, 1.0 + (i % 3) as f32, z))
                .with_acceleration(GRAVITY),
        );

        match previous.take() {
            None => previous = Some(handle),
            Some(first) => world.add_contact_generator(Box::new(ParticleRod {
                particles: [first, handle],
                length: 1.5,
            })),
        }
    }
    world.add_contact_generator(Box::new(GroundContacts::new()));
    world
}
