use rapier2d::prelude::ColliderHandle;

use crate::entity::EntityId;
use crate::physics::FixtureTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    Begin,
    End,
}

/// Two fixtures that started or stopped overlapping during a physics step.
///
/// Delivered once to the owner of each fixture and then dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub phase: ContactPhase,
    pub collider_a: ColliderHandle,
    pub collider_b: ColliderHandle,
    pub fixture_a: FixtureTag,
    pub fixture_b: FixtureTag,
    /// At least one of the fixtures is a sensor.
    pub sensor: bool,
}

impl Contact {
    /// Owning entities, in fixture order.
    pub fn owners(&self) -> [EntityId; 2] {
        [self.fixture_a.owner, self.fixture_b.owner]
    }

    /// The fixture on the other side of the contact from `me`, if `me` is
    /// part of it.
    pub fn other(&self, me: EntityId) -> Option<&FixtureTag> {
        if self.fixture_a.owner == me {
            Some(&self.fixture_b)
        } else if self.fixture_b.owner == me {
            Some(&self.fixture_a)
        } else {
            None
        }
    }

    /// Swap sides so the lower owner id comes first.
    pub(crate) fn normalized(mut self) -> Self {
        if self.fixture_b.owner < self.fixture_a.owner {
            std::mem::swap(&mut self.fixture_a, &mut self.fixture_b);
            std::mem::swap(&mut self.collider_a, &mut self.collider_b);
        }
        self
    }
}

/// Order contacts deterministically by owner pair. Stable, so the solver's
/// order is kept within a pair.
pub(crate) fn sort_contacts(contacts: &mut [Contact]) {
    contacts.sort_by_key(|c| (c.fixture_a.owner, c.fixture_b.owner));
}
