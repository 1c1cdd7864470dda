//! Contact generators: produce the contacts the resolver works on.

use glam::Vec3;

use crate::contact::ParticleContact;
use crate::particle::{ParticleHandle, ParticleSet, Real};

/// Default restitution for ground contacts.
pub const GROUND_RESTITUTION: Real = 0.2;

/// Source of particle contacts for one simulation step.
pub trait ParticleContactGenerator {
    /// Push at most `limit` contacts into `contacts` and return how many
    /// were pushed.
    fn add_contact(
        &self,
        particles: &ParticleSet,
        contacts: &mut Vec<ParticleContact>,
        limit: usize,
    ) -> usize;
}

/// Collides particles against the horizontal plane `y = ground_height`.
#[derive(Debug, Clone)]
pub struct GroundContacts {
    pub ground_height: Real,
    pub restitution: Real,
    /// Particles to test; every particle in the set when `None`.
    pub targets: Option<Vec<ParticleHandle>>,
}

impl Default for GroundContacts {
    fn default() -> Self {
        Self {
            ground_height: 0.0,
            restitution: GROUND_RESTITUTION,
            targets: None,
        }
    }
}

impl GroundContacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_particles(targets: Vec<ParticleHandle>) -> Self {
        Self {
            targets: Some(targets),
            ..Self::default()
        }
    }

    fn contact_for(
        &self,
        handle: ParticleHandle,
        particles: &ParticleSet,
    ) -> Option<ParticleContact> {
        let particle = particles.get(handle)?;
        // Immovable particles below the ground can never be pushed out
        if !particle.has_finite_mass() {
            return None;
        }
        let y = particle.position().y;
        if y < self.ground_height {
            Some(ParticleContact::against_scenery(
                handle,
                Vec3::Y,
                self.restitution,
                self.ground_height - y,
            ))
        } else {
            None
        }
    }
}

impl ParticleContactGenerator for GroundContacts {
    fn add_contact(
        &self,
        particles: &ParticleSet,
        contacts: &mut Vec<ParticleContact>,
        limit: usize,
    ) -> usize {
        let handles: Box<dyn Iterator<Item = ParticleHandle> + '_> = match &self.targets {
            Some(targets) => Box::new(targets.iter().copied()),
            None => Box::new(particles.handles()),
        };

        let mut count = 0;
        for handle in handles {
            if count >= limit {
                break;
            }
            if let Some(contact) = self.contact_for(handle, particles) {
                contacts.push(contact);
                count += 1;
            }
        }
        count
    }
}

/// Offset from the first particle to the second, or `None` if either handle
/// is not in the set.
fn pair_offset(particles: &ParticleSet, pair: [ParticleHandle; 2]) -> Option<Vec3> {
    let first = particles.get(pair[0])?;
    let second = particles.get(pair[1])?;
    Some(second.position() - first.position())
}

/// Links two particles and generates a contact when they stray farther
/// apart than `max_length`.
#[derive(Debug, Clone)]
pub struct ParticleCable {
    pub particles: [ParticleHandle; 2],
    pub max_length: Real,
    /// Bounciness of the cable when it snaps taut.
    pub restitution: Real,
}

impl ParticleContactGenerator for ParticleCable {
    fn add_contact(
        &self,
        particles: &ParticleSet,
        contacts: &mut Vec<ParticleContact>,
        limit: usize,
    ) -> usize {
        if limit == 0 {
            return 0;
        }
        let Some(offset) = pair_offset(particles, self.particles) else {
            return 0;
        };

        let length = offset.length();
        if length < self.max_length {
            return 0;
        }

        contacts.push(ParticleContact::new(
            self.particles[0],
            Some(self.particles[1]),
            offset.normalize_or_zero(),
            self.restitution,
            length - self.max_length,
        ));
        1
    }
}

/// Keeps two particles at a fixed distance, generating a contact
/// whenever they are stretched or squashed.
#[derive(Debug, Clone)]
pub struct ParticleRod {
    pub particles: [ParticleHandle; 2],
    pub length: Real,
}

impl ParticleContactGenerator for ParticleRod {
    fn add_contact(
        &self,
        particles: &ParticleSet,
        contacts: &mut Vec<ParticleContact>,
        limit: usize,
    ) -> usize {
        if limit == 0 {
            return 0;
        }
        let Some(offset) = pair_offset(particles, self.particles) else {
            return 0;
        };

        let current = offset.length();
        if current == self.length {
            return 0;
        }

        let normal = offset.normalize_or_zero();
        let (contact_normal, penetration) = if current > self.length {
            (normal, current - self.length)
        } else {
            (-normal, self.length - current)
        };

        // Rods never bounce
        contacts.push(ParticleContact::new(
            self.particles[0],
            Some(self.particles[1]),
            contact_normal,
            0.0,
            penetration,
        ));
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;

    const EPS: Real = 1e-5;

    fn set_with(positions: &[Vec3]) -> ParticleSet {
        positions
            .iter()
            .map(|p| Particle::default().with_position(*p))
            .collect()
    }

    #[test]
    fn test_ground_contacts_only_below_plane() {
        let set = set_with(&[
            Vec3::new(0.0, -0.25, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ]);
        let mut contacts = Vec::new();

        let count = GroundContacts::new().add_contact(&set, &mut contacts, 10);

        assert_eq!(count, 2);
        assert_eq!(contacts[0].particle, ParticleHandle(0));
        assert_eq!(contacts[1].particle, ParticleHandle(2));
        assert!((contacts[0].penetration - 0.25).abs() < EPS);
        assert_eq!(contacts[0].contact_normal, Vec3::Y);
        assert_eq!(contacts[0].other, None);
        assert_eq!(contacts[0].restitution, GROUND_RESTITUTION);
    }

    #[test]
    fn test_ground_contacts_respect_limit() {
        let set = set_with(&[Vec3::NEG_Y; 5]);
        let mut contacts = Vec::new();

        assert_eq!(GroundContacts::new().add_contact(&set, &mut contacts, 3), 3);
        assert_eq!(contacts.len(), 3);
        assert_eq!(GroundContacts::new().add_contact(&set, &mut contacts, 0), 0);
        assert_eq!(contacts.len(), 3);
    }

    #[test]
    fn test_ground_contacts_targets_and_fixed() {
        let mut set = set_with(&[Vec3::NEG_Y, Vec3::NEG_Y]);
        set.insert(Particle::fixed(Vec3::NEG_Y));
        let mut contacts = Vec::new();

        let ground = GroundContacts::for_particles(vec![ParticleHandle(1), ParticleHandle(2)]);
        assert_eq!(ground.add_contact(&set, &mut contacts, 10), 1);
        assert_eq!(contacts[0].particle, ParticleHandle(1));
    }

    #[test]
    fn test_cable_slack_and_taut() {
        let set = set_with(&[Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)]);
        let mut contacts = Vec::new();

        let slack = ParticleCable {
            particles: [ParticleHandle(0), ParticleHandle(1)],
            max_length: 4.0,
            restitution: 0.5,
        };
        assert_eq!(slack.add_contact(&set, &mut contacts, 1), 0);

        let taut = ParticleCable {
            max_length: 2.0,
            ..slack
        };
        assert_eq!(taut.add_contact(&set, &mut contacts, 1), 1);
        assert!((contacts[0].penetration - 1.0).abs() < EPS);
        assert!((contacts[0].contact_normal - Vec3::X).length() < EPS);
        assert_eq!(contacts[0].restitution, 0.5);
    }

    #[test]
    fn test_rod_stretched_and_squashed() {
        let set = set_with(&[Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0)]);
        let pair = [ParticleHandle(0), ParticleHandle(1)];
        let mut contacts = Vec::new();

        let short = ParticleRod { particles: pair, length: 2.0 };
        assert_eq!(short.add_contact(&set, &mut contacts, 1), 1);
        assert!((contacts[0].contact_normal - Vec3::Y).length() < EPS);
        assert!((contacts[0].penetration - 1.0).abs() < EPS);

        let long = ParticleRod { particles: pair, length: 5.0 };
        assert_eq!(long.add_contact(&set, &mut contacts, 1), 1);
        assert!((contacts[1].contact_normal + Vec3::Y).length() < EPS);
        assert!((contacts[1].penetration - 2.0).abs() < EPS);
        assert_eq!(contacts[1].restitution, 0.0);

        let exact = ParticleRod { particles: pair, length: 3.0 };
        assert_eq!(exact.add_contact(&set, &mut contacts, 1), 0);
    }

    #[test]
    fn test_links_skip_missing_particles() {
        let set = set_with(&[Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]);
        let stale = [ParticleHandle(0), ParticleHandle(7)];
        let mut contacts = Vec::new();

        let cable = ParticleCable {
            particles: stale,
            max_length: 1.0,
            restitution: 0.0,
        };
        let rod = ParticleRod {
            particles: stale,
            length: 1.0,
        };
        let ground = GroundContacts::for_particles(vec![ParticleHandle(7)]);

        assert_eq!(cable.add_contact(&set, &mut contacts, 4), 0);
        assert_eq!(rod.add_contact(&set, &mut contacts, 4), 0);
        assert_eq!(ground.add_contact(&set, &mut contacts, 4), 0);
        assert!(contacts.is_empty());
    }

    #[test]
    fn test_rod_contact_resolves_to_length() {
        use crate::resolver::ParticleContactResolver;

        let mut set = set_with(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]);
        let rod = ParticleRod {
            particles: [ParticleHandle(0), ParticleHandle(1)],
            length: 2.0,
        };
        let mut contacts = Vec::new();
        rod.add_contact(&set, &mut contacts, 1);

        let mut resolver = ParticleContactResolver::new(4);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        let length = pair_offset(&set, rod.particles).unwrap().length();
        assert!((length - 2.0).abs() < EPS);
    }
}
