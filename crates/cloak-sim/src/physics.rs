//! rapier2d boundary: bodies, fixtures, the fixed step, contacts and rays.
//!
//! Every collider carries a [`FixtureTag`] naming its owning entity (and, for
//! level geometry, the tile it was built from). Contacts and ray hits are
//! resolved back to entities through these tags.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use cloak_core::tiles::TileCoord;
use glam::Vec2;
use rapier2d::prelude::*;

use crate::config::WorldConfig;
use crate::contact::{Contact, ContactPhase, sort_contacts};
use crate::entity::EntityId;
use crate::raycast::{RayCastControl, RayCastVisitor, RayHit};

/// Back-reference stored for every fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureTag {
    pub owner: EntityId,
    /// Originating tile coordinate and symbol, for level geometry.
    pub tile: Option<(TileCoord, char)>,
}

impl FixtureTag {
    pub fn new(owner: EntityId) -> Self {
        Self { owner, tile: None }
    }

    pub fn tile(owner: EntityId, coord: TileCoord, symbol: char) -> Self {
        Self {
            owner,
            tile: Some((coord, symbol)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    /// Simulated body with rotation locked.
    Dynamic,
}

/// How a fixture is attached to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixtureDef {
    pub tag: FixtureTag,
    pub sensor: bool,
    pub density: f32,
}

impl FixtureDef {
    pub fn solid(tag: FixtureTag) -> Self {
        Self {
            tag,
            sensor: false,
            density: 0.0,
        }
    }

    pub fn sensor(tag: FixtureTag, density: f32) -> Self {
        Self {
            tag,
            sensor: true,
            density,
        }
    }
}

/// World-space outline of a fixture, for debug drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeOutline {
    Polygon(Vec<Vec2>),
    Circle { center: Vec2, radius: f32, angle: f32 },
}

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_point(v: Vec2) -> Point<Real> {
    point![v.x, v.y]
}

fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    queries_stale: bool,
    fixture_tags: HashMap<ColliderHandle, FixtureTag>,
    /// Tags of removed fixtures, kept until the next step has reported their
    /// end contacts.
    retired_tags: HashMap<ColliderHandle, FixtureTag>,
    body_owners: HashMap<RigidBodyHandle, EntityId>,
}

impl PhysicsWorld {
    /// Create an empty world with the configured gravity and solver precision.
    pub fn new(config: &WorldConfig) -> Self {
        let integration_params = IntegrationParameters {
            dt: config.dt(),
            num_solver_iterations: NonZeroUsize::new(config.velocity_iterations)
                .unwrap_or(NonZeroUsize::MIN),
            num_internal_stabilization_iterations: config.position_iterations,
            ..IntegrationParameters::default()
        };
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, config.gravity],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            queries_stale: false,
            fixture_tags: HashMap::new(),
            retired_tags: HashMap::new(),
            body_owners: HashMap::new(),
        }
    }

    pub fn create_body(&mut self, owner: EntityId, kind: BodyKind, position: Vec2) -> RigidBodyHandle {
        let rb = match kind {
            BodyKind::Static => RigidBodyBuilder::fixed().translation(to_vector(position)),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .translation(to_vector(position))
                .lock_rotations()
                .can_sleep(false),
        };
        let handle = self.rigid_body_set.insert(rb.build());
        self.body_owners.insert(handle, owner);
        handle
    }

    /// Attach a convex polygon given in body-local coordinates. Returns `None`
    /// if the points do not span a polygon.
    pub fn attach_polygon(
        &mut self,
        body: RigidBodyHandle,
        points: &[Vec2],
        def: FixtureDef,
    ) -> Option<ColliderHandle> {
        let shape = SharedShape::convex_polyline(points.iter().copied().map(to_point).collect())?;
        Some(self.attach(body, shape, def))
    }

    pub fn attach_circle(&mut self, body: RigidBodyHandle, radius: f32, def: FixtureDef) -> ColliderHandle {
        let handle = self.attach(body, SharedShape::ball(radius), def);
        if def.density > 0.0
            && let Some(rb) = self.rigid_body_set.get_mut(body)
            && rb.is_dynamic()
        {
            // Sensors may not contribute mass; keep the body massive so
            // gravity integrates.
            let mass = def.density * std::f32::consts::PI * radius * radius;
            rb.set_additional_mass(mass, true);
        }
        handle
    }

    fn attach(&mut self, body: RigidBodyHandle, shape: SharedShape, def: FixtureDef) -> ColliderHandle {
        let collider = ColliderBuilder::new(shape)
            .sensor(def.sensor)
            .density(def.density)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let handle = self
            .collider_set
            .insert_with_parent(collider, body, &mut self.rigid_body_set);
        self.fixture_tags.insert(handle, def.tag);
        self.queries_stale = true;
        handle
    }

    /// Remove a body and every fixture attached to it.
    pub fn remove_body(&mut self, body: RigidBodyHandle) -> bool {
        let Some(rb) = self.rigid_body_set.get(body) else {
            return false;
        };
        for collider in rb.colliders() {
            if let Some(tag) = self.fixture_tags.remove(collider) {
                self.retired_tags.insert(*collider, tag);
            }
        }
        self.body_owners.remove(&body);
        self.queries_stale = true;
        self.rigid_body_set
            .remove(
                body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    fn body(&self, handle: RigidBodyHandle) -> &RigidBody {
        self.rigid_body_set
            .get(handle)
            .unwrap_or_else(|| panic!("body {handle:?} is not in the physics world"))
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> &mut RigidBody {
        self.rigid_body_set
            .get_mut(handle)
            .unwrap_or_else(|| panic!("body {handle:?} is not in the physics world"))
    }

    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Vec2 {
        to_vec2(self.body(handle).translation())
    }

    pub fn set_translation(&mut self, handle: RigidBodyHandle, position: Vec2) {
        self.body_mut(handle).set_translation(to_vector(position), true);
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec2 {
        to_vec2(self.body(handle).linvel())
    }

    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        self.body_mut(handle).set_linvel(to_vector(velocity), true);
    }

    pub fn body_owner(&self, handle: RigidBodyHandle) -> Option<EntityId> {
        self.body_owners.get(&handle).copied()
    }

    pub fn fixture_tag(&self, handle: ColliderHandle) -> Option<&FixtureTag> {
        self.fixture_tags.get(&handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn fixture_count(&self) -> usize {
        self.collider_set.len()
    }

    /// Number of fixtures attached to one body.
    pub fn fixtures_of(&self, handle: RigidBodyHandle) -> usize {
        self.rigid_body_set
            .get(handle)
            .map_or(0, |rb| rb.colliders().len())
    }

    /// Bring ray queries up to date with fixtures added or removed since the
    /// last step. Stepping does this on its own.
    pub fn update_queries(&mut self) {
        if self.queries_stale {
            self.query_pipeline.update(&self.collider_set);
            self.queries_stale = false;
        }
    }

    /// Advance the world by exactly `dt` and return the contacts that began
    /// or ended, ordered by owner pair. Contacts with fixtures removed since
    /// the last step are reported as ended.
    pub fn step(&mut self, dt: f32) -> Vec<Contact> {
        self.integration_params.dt = dt;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &event_handler,
        );

        let mut contacts = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            let (phase, h1, h2, flags) = match event {
                CollisionEvent::Started(h1, h2, flags) => (ContactPhase::Begin, h1, h2, flags),
                CollisionEvent::Stopped(h1, h2, flags) => (ContactPhase::End, h1, h2, flags),
            };
            let (Some(a), Some(b)) = (self.tag_for_event(h1), self.tag_for_event(h2)) else {
                continue;
            };
            contacts.push(
                Contact {
                    phase,
                    collider_a: h1,
                    collider_b: h2,
                    fixture_a: a,
                    fixture_b: b,
                    sensor: flags.contains(CollisionEventFlags::SENSOR),
                }
                .normalized(),
            );
        }
        self.retired_tags.clear();
        self.queries_stale = false;
        sort_contacts(&mut contacts);
        contacts
    }

    fn tag_for_event(&self, handle: ColliderHandle) -> Option<FixtureTag> {
        self.fixture_tags
            .get(&handle)
            .or_else(|| self.retired_tags.get(&handle))
            .copied()
    }

    /// Cast a ray from `from` to `to`, reporting every fixture it crosses
    /// and `filter` admits to `visitor` until the visitor stops. Hits arrive
    /// in no particular order.
    ///
    /// A fixture that contains `from` is not reported. Queries see fixtures as
    /// of the last step or [`update_queries`](Self::update_queries).
    pub fn ray_cast(
        &self,
        from: Vec2,
        to: Vec2,
        filter: QueryFilter<'_>,
        visitor: &mut impl RayCastVisitor,
    ) {
        let dir = to - from;
        if dir.length_squared() == 0.0 {
            return;
        }
        let ray = Ray::new(to_point(from), to_vector(dir));
        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            1.0,
            true,
            filter,
            |handle, intersection| {
                if intersection.time_of_impact <= 0.0 {
                    return true;
                }
                let (Some(&tag), Some(collider)) =
                    (self.fixture_tags.get(&handle), self.collider_set.get(handle))
                else {
                    return true;
                };
                let point = ray.point_at(intersection.time_of_impact);
                let hit = RayHit {
                    collider: handle,
                    tag,
                    sensor: collider.is_sensor(),
                    point: Vec2::new(point.x, point.y),
                    normal: to_vec2(&intersection.normal),
                    fraction: intersection.time_of_impact,
                };
                visitor.report(&hit) == RayCastControl::Continue
            },
        );
    }

    /// Outlines of every polygon and circle fixture in world space.
    pub fn shape_outlines(&self) -> Vec<ShapeOutline> {
        let mut outlines = Vec::with_capacity(self.collider_set.len());
        for (_, collider) in self.collider_set.iter() {
            let iso = collider.position();
            match collider.shape().as_typed_shape() {
                TypedShape::ConvexPolygon(poly) => {
                    let points = poly
                        .points()
                        .iter()
                        .map(|p| {
                            let world = iso * p;
                            Vec2::new(world.x, world.y)
                        })
                        .collect();
                    outlines.push(ShapeOutline::Polygon(points));
                },
                TypedShape::Ball(ball) => outlines.push(ShapeOutline::Circle {
                    center: to_vec2(&iso.translation.vector),
                    radius: ball.radius,
                    angle: iso.rotation.angle(),
                }),
                _ => {},
            }
        }
        outlines
    }
}
