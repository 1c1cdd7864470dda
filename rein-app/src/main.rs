//! Headless particle demo: a bouncing ball, a rope of cables hanging from a
//! fixed anchor and a rod-linked pair, all dropped onto the ground.
//!
//! Run with `RUST_LOG=debug cargo run --manifest-path rein-app/Cargo.toml`.

use anyhow::Result;
use glam::Vec3;
use log::info;
use rein_particle::{
    GroundContacts, Particle, ParticleCable, ParticleDrag, ParticleHandle, ParticleRod,
    ParticleWorld, ParticleWorldConfig,
};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
const SECONDS: u32 = 5;
const FRAME_TIME: f64 = 1.0 / 60.0;

struct Scene {
    world: ParticleWorld,
    ball: ParticleHandle,
    rope_end: ParticleHandle,
    rod: [ParticleHandle; 2],
}

fn build_scene() -> Result<Scene> {
    let mut world = ParticleWorld::new(ParticleWorldConfig::default())?;

    // Ball
    let ball = world.add_particle(
        Particle::new(Vec3::new(0.0, 4.0, 0.0), 1.0)?.with_acceleration(GRAVITY),
    );
    world.add_force(ball, Box::new(ParticleDrag { k1: 0.1, k2: 0.01 }))?;

    // Rope: a fixed anchor with three links swinging from it
    let anchor = world.add_particle(Particle::fixed(Vec3::new(3.0, 5.0, 0.0)));
    let mut previous = anchor;
    for i in 1..=3 {
        let link = world.add_particle(
            Particle::new(Vec3::new(3.0 + i as f32, 5.0, 0.0), 0.5)?.with_acceleration(GRAVITY),
        );
        world.add_contact_generator(Box::new(ParticleCable {
            particles: [link, previous],
            max_length: 1.0,
            restitution: 0.3,
        }));
        previous = link;
    }

    // Rod-linked pair
    let rod_a = world.add_particle(
        Particle::new(Vec3::new(-3.0, 2.0, 0.0), 2.0)?.with_acceleration(GRAVITY),
    );
    let rod_b = world.add_particle(
        Particle::new(Vec3::new(-2.0, 3.0, 0.0), 1.0)?.with_acceleration(GRAVITY),
    );
    world.add_contact_generator(Box::new(ParticleRod {
        particles: [rod_a, rod_b],
        length: 1.5,
    }));

    world.add_contact_generator(Box::new(GroundContacts::new()));

    Ok(Scene {
        world,
        ball,
        rope_end: previous,
        rod: [rod_a, rod_b],
    })
}

fn main() -> Result<()> {
    env_logger::init();

    let mut scene = build_scene()?;
    info!(
        "Simulating {} particles for {} seconds",
        scene.world.particles().len(),
        SECONDS
    );

    let frames = (SECONDS as f64 / FRAME_TIME).round() as u32;
    for frame in 1..=frames {
        scene.world.step(FRAME_TIME)?;

        if frame % 60 == 0 {
            let particles = scene.world.particles();
            let rod_length =
                (particles[scene.rod[0]].position() - particles[scene.rod[1]].position()).length();
            info!(
                "t={:.1}s ball={:.3} rope_end={:.3} rod_length={:.3} contacts={} iterations={}",
                frame as f64 * FRAME_TIME,
                particles[scene.ball].position(),
                particles[scene.rope_end].position(),
                rod_length,
                scene.world.contacts().len(),
                scene.world.resolver().iterations_used(),
            );
        }
    }

    Ok(())
}
