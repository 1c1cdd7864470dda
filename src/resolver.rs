//! Iterative particle contact resolver.
//!
//! Each pass picks the contact with the most negative separating velocity
//! (among those still closing or still penetrating), resolves it and then
//! corrects the penetration of every contact that shares a particle with it.
//! Fast, but can need many passes when contacts are tightly coupled.

use tracing::{debug, trace};

use crate::contact::{ParticleContact, ParticleMovement};
use crate::particle::{ParticleSet, Real};

/// Contact resolution routine for particle contacts. One instance can be
/// shared by the whole simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleContactResolver {
    /// Maximum number of passes per call.
    iterations: u32,
    /// Passes performed by the last call.
    iterations_used: u32,
}

impl ParticleContactResolver {
    /// Create a resolver with the given pass budget. The budget should be at
    /// least the number of contacts expected per call.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations,
            iterations_used: 0,
        }
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations;
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Passes performed by the most recent [`resolve_contacts`](Self::resolve_contacts).
    ///
    /// Equal to [`iterations`](Self::iterations) when the budget ran out,
    /// which may leave contacts unresolved.
    pub fn iterations_used(&self) -> u32 {
        self.iterations_used
    }

    /// Resolve a batch of contacts for both velocity and interpenetration.
    ///
    /// Contacts that cannot interact should go in separate calls: the cost
    /// grows much faster with the size of a batch than with the number of
    /// batches.
    pub fn resolve_contacts(
        &mut self,
        contacts: &mut [ParticleContact],
        particles: &mut ParticleSet,
        duration: Real,
    ) {
        self.iterations_used = 0;

        while self.iterations_used < self.iterations {
            let Some(index) = find_worst_contact(contacts, particles) else {
                trace!(
                    iterations_used = self.iterations_used,
                    "particle contacts resolved"
                );
                return;
            };

            trace!(index, "resolving particle contact");
            let resolved = contacts[index];
            let movement = resolved.resolve(particles, duration);
            propagate_movement(contacts, &resolved, &movement);

            self.iterations_used += 1;
        }

        // The last allowed pass may have resolved everything
        if find_worst_contact(contacts, particles).is_some() {
            debug!(
                iterations = self.iterations,
                contacts = contacts.len(),
                "particle contact resolver exhausted its iteration budget"
            );
        }
    }
}

/// Index of the contact that most needs resolving, if any.
///
/// Picks the lowest separating velocity among contacts that are closing or
/// penetrating. Ties go to the earliest contact.
pub fn find_worst_contact(contacts: &[ParticleContact], particles: &ParticleSet) -> Option<usize> {
    let mut max = Real::MAX;
    let mut max_index = None;

    for (i, contact) in contacts.iter().enumerate() {
        let sep_vel = contact.calculate_separating_velocity(particles);
        if sep_vel < max && (sep_vel < 0.0 || contact.penetration > 0.0) {
            max = sep_vel;
            max_index = Some(i);
        }
    }

    max_index
}

/// Update the penetration of every contact touching a particle that
/// `resolved` just moved. This includes `resolved` itself, whose
/// penetration drops to zero.
fn propagate_movement(
    contacts: &mut [ParticleContact],
    resolved: &ParticleContact,
    movement: &ParticleMovement,
) {
    let [first_move, second_move] = movement.0;

    for contact in contacts.iter_mut() {
        if contact.particle == resolved.particle {
            contact.penetration -= first_move.dot(contact.contact_normal);
        } else if Some(contact.particle) == resolved.other {
            contact.penetration -= second_move.dot(contact.contact_normal);
        }

        if let Some(other) = contact.other {
            if other == resolved.particle {
                contact.penetration += first_move.dot(contact.contact_normal);
            } else if Some(other) == resolved.other {
                contact.penetration += second_move.dot(contact.contact_normal);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{Particle, ParticleHandle};
    use glam::Vec3;

    const EPS: Real = 1e-5;

    fn body(
        set: &mut ParticleSet,
        position: Vec3,
        velocity: Vec3,
        inverse_mass: Real,
    ) -> ParticleHandle {
        set.insert(
            Particle::default()
                .with_position(position)
                .with_velocity(velocity)
                .with_inverse_mass(inverse_mass)
                .with_damping(1.0),
        )
    }

    #[test]
    fn test_empty_batch() {
        let mut set = ParticleSet::new();
        let mut resolver = ParticleContactResolver::new(10);
        resolver.resolve_contacts(&mut [], &mut set, 1.0 / 60.0);
        assert_eq!(resolver.iterations_used(), 0);
    }

    #[test]
    fn test_zero_iterations_does_nothing() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0), 1.0);
        let mut contacts = [ParticleContact::against_scenery(a, Vec3::Y, 0.5, 0.1)];

        let mut resolver = ParticleContactResolver::new(0);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        assert_eq!(resolver.iterations_used(), 0);
        assert_eq!(set[a].velocity(), Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(contacts[0].penetration, 0.1);
    }

    #[test]
    fn test_worst_contact_selected_first() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0), 1.0);
        let b = body(&mut set, Vec3::X, Vec3::new(0.0, -5.0, 0.0), 1.0);
        let c = body(&mut set, Vec3::Z, Vec3::new(0.0, 2.0, 0.0), 1.0);

        let mut contacts = [
            ParticleContact::against_scenery(a, Vec3::Y, 0.5, 0.0),
            ParticleContact::against_scenery(b, Vec3::Y, 0.5, 0.0),
            ParticleContact::against_scenery(c, Vec3::Y, 0.5, 0.0),
        ];
        assert_eq!(find_worst_contact(&contacts, &set), Some(1));

        let mut resolver = ParticleContactResolver::new(1);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        assert_eq!(resolver.iterations_used(), 1);
        assert_eq!(set[a].velocity(), Vec3::new(0.0, -1.0, 0.0));
        assert!((set[b].velocity().y - 2.5).abs() < EPS);
        assert_eq!(set[c].velocity(), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_tie_goes_to_first_contact() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::ZERO, Vec3::new(0.0, -3.0, 0.0), 1.0);
        let b = body(&mut set, Vec3::X, Vec3::new(0.0, -3.0, 0.0), 1.0);
        let contacts = [
            ParticleContact::against_scenery(a, Vec3::Y, 0.5, 0.0),
            ParticleContact::against_scenery(b, Vec3::Y, 0.5, 0.0),
        ];
        assert_eq!(find_worst_contact(&contacts, &set), Some(0));
    }

    #[test]
    fn test_separating_penetrating_contact_still_selected() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0), 1.0);
        let contacts = [ParticleContact::against_scenery(a, Vec3::Y, 0.5, 0.2)];
        assert_eq!(find_worst_contact(&contacts, &set), Some(0));

        let resting = [ParticleContact::against_scenery(a, Vec3::Y, 0.5, 0.0)];
        assert_eq!(find_worst_contact(&resting, &set), None);
    }

    #[test]
    fn test_converges_before_budget() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::new(0.0, -0.1, 0.0), Vec3::new(0.0, -2.0, 0.0), 1.0);
        let b = body(&mut set, Vec3::new(5.0, -0.2, 0.0), Vec3::new(0.0, -1.0, 0.0), 1.0);
        let mut contacts = [
            ParticleContact::against_scenery(a, Vec3::Y, 0.0, 0.1),
            ParticleContact::against_scenery(b, Vec3::Y, 0.0, 0.2),
        ];

        let mut resolver = ParticleContactResolver::new(10);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        assert_eq!(resolver.iterations_used(), 2);
        assert!(contacts[0].penetration.abs() < EPS);
        assert!(contacts[1].penetration.abs() < EPS);
        assert!(set[a].position().y.abs() < EPS);
        assert!(set[b].position().y.abs() < EPS);
        assert!(set[a].velocity().y.abs() < EPS);
    }

    #[test]
    fn test_iteration_budget_respected() {
        let mut set = ParticleSet::new();
        // Two fixed particles can never be separated, so the contact keeps
        // qualifying every pass.
        let a = body(&mut set, Vec3::ZERO, Vec3::ZERO, 0.0);
        let b = body(&mut set, Vec3::ZERO, Vec3::ZERO, 0.0);
        let mut contacts = [ParticleContact::new(a, Some(b), Vec3::Y, 0.5, 1.0)];

        for budget in [1, 3, 7] {
            let mut resolver = ParticleContactResolver::new(budget);
            resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);
            assert_eq!(resolver.iterations_used(), budget);
        }
        assert_eq!(contacts[0].penetration, 1.0);
    }

    #[test]
    fn test_budget_used_up_by_final_resolving_pass() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0), 1.0);
        let mut contacts = [ParticleContact::against_scenery(a, Vec3::Y, 0.0, 0.1)];

        let mut resolver = ParticleContactResolver::new(1);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        // Every pass was spent, yet nothing is left to resolve
        assert_eq!(resolver.iterations_used(), resolver.iterations());
        assert_eq!(find_worst_contact(&contacts, &set), None);
    }

    #[test]
    fn test_iterations_used_reset_each_call() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0), 1.0);
        let mut contacts = [ParticleContact::against_scenery(a, Vec3::Y, 0.0, 0.0)];

        let mut resolver = ParticleContactResolver::new(5);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);
        assert_eq!(resolver.iterations_used(), 1);

        // Now at rest and not penetrating
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);
        assert_eq!(resolver.iterations_used(), 0);
    }

    #[test]
    fn test_shared_particle_penetration_propagates() {
        let mut set = ParticleSet::new();
        // Chain along x: C <- B <- A, normals point from "other" to "particle"
        let a = body(&mut set, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, 1.0);
        let b = body(&mut set, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 1.0);
        let c = body(&mut set, Vec3::ZERO, Vec3::ZERO, 1.0);

        let ab = ParticleContact::new(a, Some(b), Vec3::X, 0.0, 0.4);
        let bc = ParticleContact::new(b, Some(c), Vec3::X, 0.0, 0.1);
        let mut contacts = [ab, bc];

        // A-B is the deepest but both are equally "closing" (zero), so the
        // first one wins.
        assert_eq!(find_worst_contact(&contacts, &set), Some(0));

        let mut resolver = ParticleContactResolver::new(1);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        // B moved by -0.2 along x; B is particle 0 of B-C
        let movement_b = Vec3::new(-0.2, 0.0, 0.0);
        let expected = 0.1 - movement_b.dot(Vec3::X);
        assert!((contacts[1].penetration - expected).abs() < EPS);
        assert!((contacts[1].penetration - 0.3).abs() < EPS);
        // The resolved contact itself is now exactly touching
        assert!(contacts[0].penetration.abs() < EPS);
    }

    #[test]
    fn test_shared_particle_in_second_slot() {
        let mut set = ParticleSet::new();
        let a = body(&mut set, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, 1.0);
        let b = body(&mut set, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 1.0);
        let c = body(&mut set, Vec3::new(1.0, 1.0, 0.0), Vec3::ZERO, 1.0);

        // B is particle 0 in the first contact, particle 1 in the second
        let ba = ParticleContact::new(b, Some(a), -Vec3::X, 0.0, 0.4);
        let cb = ParticleContact::new(c, Some(b), Vec3::Y, 0.0, 0.1);
        let mut contacts = [ba, cb];

        let mut resolver = ParticleContactResolver::new(1);
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        // B moved along -x, orthogonal to the C-B normal
        assert!((contacts[1].penetration - 0.1).abs() < EPS);

        // Now push B along y through a scenery contact
        let mut contacts = [
            ParticleContact::against_scenery(b, -Vec3::Y, 0.0, 0.5),
            ParticleContact::new(c, Some(b), Vec3::Y, 0.0, 0.1),
        ];
        resolver.resolve_contacts(&mut contacts, &mut set, 1.0 / 60.0);

        // B moved by (0, -0.5, 0); as slot 1 of C-B the penetration grows
        let movement_b = Vec3::new(0.0, -0.5, 0.0);
        let expected = 0.1 + movement_b.dot(Vec3::Y);
        assert!((contacts[1].penetration - expected).abs() < EPS);
        assert!((contacts[1].penetration + 0.4).abs() < EPS);
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let mut set = ParticleSet::new();
            let a = body(&mut set, Vec3::new(0.0, -0.3, 0.0), Vec3::new(0.1, -2.0, 0.0), 1.0);
            let b = body(&mut set, Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, -3.0, 0.0), 2.0);
            let contacts = vec![
                ParticleContact::against_scenery(a, Vec3::Y, 0.3, 0.3),
                ParticleContact::new(b, Some(a), Vec3::Y, 0.6, 0.2),
            ];
            (set, contacts)
        };

        let (mut set_1, mut contacts_1) = build();
        let (mut set_2, mut contacts_2) = build();
        let mut resolver = ParticleContactResolver::new(8);
        resolver.resolve_contacts(&mut contacts_1, &mut set_1, 0.01);
        let used = resolver.iterations_used();
        resolver.resolve_contacts(&mut contacts_2, &mut set_2, 0.01);

        assert_eq!(used, resolver.iterations_used());
        assert_eq!(contacts_1, contacts_2);
        for (h, p) in set_1.iter() {
            assert_eq!(p, &set_2[h]);
        }
    }
}
