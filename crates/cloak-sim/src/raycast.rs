//! Ray-cast visitor protocol used by [`PhysicsWorld::ray_cast`].
//!
//! [`PhysicsWorld::ray_cast`]: crate::physics::PhysicsWorld::ray_cast

use glam::Vec2;
use rapier2d::prelude::ColliderHandle;

use crate::entity::EntityId;
use crate::physics::FixtureTag;

/// A fixture crossed by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub tag: FixtureTag,
    pub sensor: bool,
    pub point: Vec2,
    pub normal: Vec2,
    /// Position of the hit along the ray, 0 at the start and 1 at the end.
    pub fraction: f32,
}

/// What the ray cast does after a visitor has seen a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayCastControl {
    /// Stop reporting further fixtures.
    Stop,
    /// Keep reporting every remaining fixture on the ray.
    Continue,
}

pub trait RayCastVisitor {
    fn report(&mut self, hit: &RayHit) -> RayCastControl;
}

/// Keeps the nearest accepted hit, skipping sensors. Ties keep the first one
/// reported.
#[derive(Debug, Clone, Default)]
pub struct ClosestHit {
    exclude: Option<EntityId>,
    hit: Option<RayHit>,
}

impl ClosestHit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore every fixture owned by `owner`.
    pub fn excluding(owner: EntityId) -> Self {
        Self {
            exclude: Some(owner),
            ..Self::default()
        }
    }

    pub fn accepts(&self, hit: &RayHit) -> bool {
        !hit.sensor && Some(hit.tag.owner) != self.exclude
    }

    pub fn hit(&self) -> Option<&RayHit> {
        self.hit.as_ref()
    }

    pub fn into_hit(self) -> Option<RayHit> {
        self.hit
    }
}

impl RayCastVisitor for ClosestHit {
    fn report(&mut self, hit: &RayHit) -> RayCastControl {
        let closer = self.hit.is_none_or(|best| hit.fraction < best.fraction);
        if closer && self.accepts(hit) {
            self.hit = Some(*hit);
        }
        RayCastControl::Continue
    }
}
