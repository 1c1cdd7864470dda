//! Particle contact data and per-contact resolution.
//!
//! A contact is resolved in two steps: an impulse that fixes the closing
//! velocity along the normal, then a positional correction that removes the
//! interpenetration. Both are weighted by inverse mass.

use glam::Vec3;

use crate::particle::{ParticleHandle, ParticleSet, Real};

/// Distance each participant was moved by interpenetration resolution.
///
/// Slot 0 belongs to [`ParticleContact::particle`], slot 1 to
/// [`ParticleContact::other`] and is zero when there is no second particle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleMovement(pub [Vec3; 2]);

impl ParticleMovement {
    pub const ZERO: Self = Self([Vec3::ZERO; 2]);

    pub fn first(&self) -> Vec3 {
        self.0[0]
    }

    pub fn second(&self) -> Vec3 {
        self.0[1]
    }
}

/// Two particles in contact, or one particle against immovable scenery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleContact {
    /// First participant. The normal points towards the side it should move.
    pub particle: ParticleHandle,
    /// Second participant, `None` for contacts with the scenery.
    pub other: Option<ParticleHandle>,
    /// Unit separation direction, from `other` towards `particle`.
    /// Must arrive normalized.
    pub contact_normal: Vec3,
    /// Normal restitution coefficient in `[0, 1]`.
    pub restitution: Real,
    /// Overlap depth along the normal. Zero or negative means no overlap.
    pub penetration: Real,
}

impl ParticleContact {
    pub fn new(
        particle: ParticleHandle,
        other: Option<ParticleHandle>,
        contact_normal: Vec3,
        restitution: Real,
        penetration: Real,
    ) -> Self {
        Self {
            particle,
            other,
            contact_normal,
            restitution,
            penetration,
        }
    }

    /// Contact between a particle and the immovable environment.
    pub fn against_scenery(
        particle: ParticleHandle,
        contact_normal: Vec3,
        restitution: Real,
        penetration: Real,
    ) -> Self {
        Self::new(particle, None, contact_normal, restitution, penetration)
    }

    /// Relative velocity of the pair projected onto the contact normal.
    ///
    /// Positive when separating, negative when closing.
    pub fn calculate_separating_velocity(&self, particles: &ParticleSet) -> Real {
        let mut relative_velocity = particles[self.particle].velocity();
        if let Some(other) = self.other {
            relative_velocity -= particles[other].velocity();
        }
        relative_velocity.dot(self.contact_normal)
    }

    /// Resolve velocity then interpenetration, in that order.
    pub fn resolve(&self, particles: &mut ParticleSet, duration: Real) -> ParticleMovement {
        self.resolve_velocity(particles, duration);
        self.resolve_interpenetration(particles, duration)
    }

    fn total_inverse_mass(&self, particles: &ParticleSet) -> Real {
        let mut total = particles[self.particle].inverse_mass();
        if let Some(other) = self.other {
            total += particles[other].inverse_mass();
        }
        total
    }

    /// Apply the impulse that turns the closing velocity into the
    /// restitution-scaled separating velocity.
    pub fn resolve_velocity(&self, particles: &mut ParticleSet, duration: Real) {
        let separating_velocity = self.calculate_separating_velocity(particles);
        if separating_velocity > 0.0 {
            return;
        }

        let mut new_sep_velocity = -separating_velocity * self.restitution;

        // Closing velocity built up by acceleration over this step alone is a
        // resting contact, not a collision. Remove it from the bounce.
        let mut acc_caused_velocity = particles[self.particle].acceleration();
        if let Some(other) = self.other {
            acc_caused_velocity -= particles[other].acceleration();
        }
        let acc_caused_sep_velocity = acc_caused_velocity.dot(self.contact_normal) * duration;

        if acc_caused_sep_velocity < 0.0 {
            new_sep_velocity += self.restitution * acc_caused_sep_velocity;
            new_sep_velocity = new_sep_velocity.max(0.0);
        }

        let delta_velocity = new_sep_velocity - separating_velocity;

        let total_inverse_mass = self.total_inverse_mass(particles);
        if total_inverse_mass <= 0.0 {
            return;
        }

        let impulse = delta_velocity / total_inverse_mass;
        let impulse_per_imass = self.contact_normal * impulse;

        let first = &mut particles[self.particle];
        let velocity = first.velocity() + impulse_per_imass * first.inverse_mass();
        first.set_velocity(velocity);

        if let Some(other) = self.other {
            // Opposite direction: the normal is relative to the first particle
            let second = &mut particles[other];
            let velocity = second.velocity() + impulse_per_imass * -second.inverse_mass();
            second.set_velocity(velocity);
        }
    }

    /// Move the particles apart along the normal, lighter ones further.
    ///
    /// `_duration` takes no part in the correction; it is kept so the
    /// signature matches [`resolve_velocity`](Self::resolve_velocity).
    /// Returns [`ParticleMovement::ZERO`] when nothing was moved.
    pub fn resolve_interpenetration(
        &self,
        particles: &mut ParticleSet,
        _duration: Real,
    ) -> ParticleMovement {
        if self.penetration <= 0.0 {
            return ParticleMovement::ZERO;
        }

        let total_inverse_mass = self.total_inverse_mass(particles);
        if total_inverse_mass <= 0.0 {
            return ParticleMovement::ZERO;
        }

        let move_per_imass = self.contact_normal * (self.penetration / total_inverse_mass);

        let first_move = move_per_imass * particles[self.particle].inverse_mass();
        let second_move = match self.other {
            Some(other) => move_per_imass * -particles[other].inverse_mass(),
            None => Vec3::ZERO,
        };

        let first = &mut particles[self.particle];
        first.set_position(first.position() + first_move);

        if let Some(other) = self.other {
            let second = &mut particles[other];
            second.set_position(second.position() + second_move);
        }

        ParticleMovement([first_move, second_move])
    }
}
