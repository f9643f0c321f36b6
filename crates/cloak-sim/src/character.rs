//! Character controller: a closed state machine plus the kinematic rules that
//! drive one dynamic body.
//!
//! Physics integrates gravity; everything horizontal, the jump impulse and
//! landing are decided here. Landing uses a downward ray instead of solid
//! collision: the body only carries a sensor circle.

use cloak_core::input::{Intent, KeyEvent};
use cloak_core::render::{Color, Renderer};
use glam::Vec2;
use rapier2d::prelude::{QueryFilter, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorContext};
use crate::ai::WanderAi;
use crate::config::MovementConfig;
use crate::controls::KeyboardControls;
use crate::entity::EntityId;
use crate::physics::{BodyKind, FixtureDef, FixtureTag, PhysicsWorld};
use crate::raycast::ClosestHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterState {
    Climb,
    Crawl,
    Crouch,
    Dead,
    Dive,
    Hang,
    Jump,
    Push,
    Run,
    Slide,
    Stand,
    Swim,
    Walk,
}

/// States in which the character is supported by the ground.
pub const GROUND_STATES: [CharacterState; 6] = [
    CharacterState::Crawl,
    CharacterState::Crouch,
    CharacterState::Push,
    CharacterState::Run,
    CharacterState::Stand,
    CharacterState::Walk,
];

/// States in which the character is not standing on anything. `Jump` doubles
/// as falling.
pub const AIR_STATES: [CharacterState; 3] = [
    CharacterState::Climb,
    CharacterState::Hang,
    CharacterState::Jump,
];

impl CharacterState {
    pub const ALL: [CharacterState; 13] = [
        Self::Climb,
        Self::Crawl,
        Self::Crouch,
        Self::Dead,
        Self::Dive,
        Self::Hang,
        Self::Jump,
        Self::Push,
        Self::Run,
        Self::Slide,
        Self::Stand,
        Self::Swim,
        Self::Walk,
    ];

    pub fn is_ground(self) -> bool {
        GROUND_STATES.contains(&self)
    }

    pub fn is_air(self) -> bool {
        AIR_STATES.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Climb => "CLIMB",
            Self::Crawl => "CRAWL",
            Self::Crouch => "CROUCH",
            Self::Dead => "DEAD",
            Self::Dive => "DIVE",
            Self::Hang => "HANG",
            Self::Jump => "JUMP",
            Self::Push => "PUSH",
            Self::Run => "RUN",
            Self::Slide => "SLIDE",
            Self::Stand => "STAND",
            Self::Swim => "SWIM",
            Self::Walk => "WALK",
        }
    }
}

impl std::fmt::Display for CharacterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// -1, 0 or 1.
fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Vertical take-off velocity. Faster runs give lower jumps: the blend
/// weight is the squared fraction of walking speed, clamped to 1.
pub fn jump_velocity(vx: f32, params: &MovementConfig) -> f32 {
    let ratio = (vx.abs() / params.max_walk_velocity).min(1.0).powi(2);
    ratio * params.min_jump_velocity + (1.0 - ratio) * params.max_jump_velocity
}

/// Accelerate toward `face` and clamp to walking speed.
pub fn walk_velocity(vx: f32, face: f32, dt: f32, params: &MovementConfig) -> f32 {
    let vx = vx + face * dt * params.walk_acceleration;
    sign(vx) * vx.abs().min(params.max_walk_velocity)
}

/// Decelerate toward zero without crossing it.
pub fn stand_velocity(vx: f32, dt: f32, params: &MovementConfig) -> f32 {
    let sx = sign(vx);
    let slowed = vx - sx * dt * params.walk_acceleration;
    if sign(slowed) != sx { 0.0 } else { slowed }
}

/// Air control toward `dir` (-1 or 1).
///
/// Moving along `dir` already, drift never slows the character and only
/// accelerates it up to the drift ceiling. Against `dir`, full drift
/// acceleration applies.
pub fn drift_velocity(vx: f32, dir: f32, dt: f32, params: &MovementConfig) -> f32 {
    if sign(vx) == dir {
        let drifted = vx + dir * dt * params.drift_acceleration;
        let drifted = sign(drifted) * drifted.abs().min(params.max_drift_velocity);
        sign(vx) * vx.abs().max(drifted.abs())
    } else {
        vx + dir * dt * params.drift_acceleration
    }
}

/// Result of the post-physics ground probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundContact {
    /// Nothing below within the probe.
    None,
    /// Surface found; `surface_y` is the hit point height.
    Surface { surface_y: f32, distance: f32 },
}

/// What the ground rule decides for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundResponse {
    Keep,
    /// Leave the ground.
    Fall,
    /// Rest the lower edge on the surface and stop vertical motion.
    Stick { y: f32 },
}

/// The landing rule. Sticks when grounded already, or when falling
/// (`vy < 0`) and strictly closer than `radius` to the surface.
pub fn ground_response(state: CharacterState, vy: f32, radius: f32, contact: GroundContact) -> GroundResponse {
    match contact {
        GroundContact::None if state.is_ground() => GroundResponse::Fall,
        GroundContact::None => GroundResponse::Keep,
        GroundContact::Surface {
            surface_y,
            distance,
        } => {
            if state.is_ground() || (state.is_air() && vy < 0.0 && distance < radius) {
                GroundResponse::Stick {
                    y: surface_y + radius,
                }
            } else {
                GroundResponse::Keep
            }
        },
    }
}

/// Serializable view of a character for logs and determinism checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub id: EntityId,
    pub name: String,
    pub state: CharacterState,
    pub position: Vec2,
    pub velocity: Vec2,
    pub face: i32,
}

const CROUCH_HALF_EXTENT: f32 = 0.4;
const FACING_NUB: f32 = 0.2;

#[derive(Debug)]
pub struct Character {
    id: EntityId,
    name: String,
    body: RigidBodyHandle,
    params: MovementConfig,
    radius: f32,
    state: CharacterState,
    face: i32,
    intent: Intent,
    controls: Option<KeyboardControls>,
    ai: Option<WanderAi>,
    color: Color,
}

impl Character {
    /// Create the character's dynamic body at `position`, with a sensor
    /// circle of radius `max(half_width, half_height)`.
    pub fn spawn(
        id: EntityId,
        physics: &mut PhysicsWorld,
        name: impl Into<String>,
        position: Vec2,
        params: MovementConfig,
    ) -> Self {
        let radius = params.radius();
        let body = physics.create_body(id, BodyKind::Dynamic, position);
        physics.attach_circle(body, radius, FixtureDef::sensor(FixtureTag::new(id), params.density));
        Self {
            id,
            name: name.into(),
            body,
            params,
            radius,
            state: CharacterState::Stand,
            face: 1,
            intent: Intent::default(),
            controls: None,
            ai: None,
            color: Color::DEFAULT_ACTOR,
        }
    }

    pub fn with_controls(mut self, controls: KeyboardControls) -> Self {
        self.controls = Some(controls);
        self
    }

    pub fn with_ai(mut self, ai: WanderAi) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn body_handle(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn params(&self) -> &MovementConfig {
        &self.params
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn set_state(&mut self, state: CharacterState) {
        if state != self.state {
            tracing::debug!(
                character = %self.name,
                from = %self.state,
                to = %state,
                "Character changes state"
            );
        }
        self.state = state;
    }

    pub fn face(&self) -> i32 {
        self.face
    }

    pub fn facing_left(&self) -> bool {
        self.face < 0
    }

    pub fn facing_right(&self) -> bool {
        self.face > 0
    }

    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    pub fn intent_mut(&mut self) -> &mut Intent {
        &mut self.intent
    }

    pub fn ai(&self) -> Option<&WanderAi> {
        self.ai.as_ref()
    }

    pub fn has_controls(&self) -> bool {
        self.controls.is_some()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Facing follows net horizontal intent and holds when it is zero.
    pub fn step_face(&mut self) {
        let dir = self.intent.horizontal();
        if dir != 0 {
            self.face = dir;
        }
    }

    fn step_idle_walk(&mut self) {
        let moving = self.intent.horizontal() != 0;
        if self.state == CharacterState::Stand && moving {
            self.set_state(CharacterState::Walk);
        }
        if self.state == CharacterState::Walk && !moving {
            self.set_state(CharacterState::Stand);
        }
    }

    fn step_jump(&mut self, physics: &mut PhysicsWorld) {
        if self.intent.jump && self.state.is_ground() {
            self.set_state(CharacterState::Jump);
            let v = physics.linvel(self.body);
            physics.set_linvel(self.body, Vec2::new(v.x, jump_velocity(v.x, &self.params)));
        }
    }

    fn step_velocity(&mut self, physics: &mut PhysicsWorld, dt: f32) {
        let v = physics.linvel(self.body);
        let vx = match self.state {
            CharacterState::Walk => walk_velocity(v.x, self.face as f32, dt, &self.params),
            CharacterState::Stand => stand_velocity(v.x, dt, &self.params),
            CharacterState::Jump if self.intent.any_horizontal() => {
                drift_velocity(v.x, self.intent.horizontal() as f32, dt, &self.params)
            },
            _ => return,
        };
        physics.set_linvel(self.body, Vec2::new(vx, v.y));
    }

    /// Pre-physics update: facing, idle/walk, jump, then per-state velocity.
    pub fn step_motion(&mut self, physics: &mut PhysicsWorld, dt: f32) {
        self.step_face();
        self.step_idle_walk();
        self.step_jump(physics);
        self.step_velocity(physics, dt);
    }

    /// Cast the ground probe straight down, ignoring this character's own
    /// fixture and sensors.
    pub fn probe_ground(&self, physics: &PhysicsWorld) -> GroundContact {
        let origin = physics.translation(self.body);
        let length = self.radius + self.params.ground_probe;
        let filter = QueryFilter::default()
            .exclude_sensors()
            .exclude_rigid_body(self.body);
        let mut closest = ClosestHit::excluding(self.id);
        physics.ray_cast(origin, origin - Vec2::new(0.0, length), filter, &mut closest);
        match closest.into_hit() {
            Some(hit) => GroundContact::Surface {
                surface_y: hit.point.y,
                distance: hit.fraction * length,
            },
            None => GroundContact::None,
        }
    }

    /// Post-physics ground correction.
    pub fn step_ground(&mut self, physics: &mut PhysicsWorld) {
        let contact = self.probe_ground(physics);
        let velocity = physics.linvel(self.body);
        match ground_response(self.state, velocity.y, self.radius, contact) {
            GroundResponse::Keep => {},
            GroundResponse::Fall => self.set_state(CharacterState::Jump),
            GroundResponse::Stick { y } => {
                let position = physics.translation(self.body);
                physics.set_translation(self.body, Vec2::new(position.x, y));
                physics.set_linvel(self.body, Vec2::new(velocity.x, 0.0));
                if self.state.is_air() {
                    self.set_state(CharacterState::Stand);
                }
            },
        }
    }

    fn half_extents(&self) -> Vec2 {
        if self.state == CharacterState::Crouch {
            Vec2::splat(CROUCH_HALF_EXTENT)
        } else {
            Vec2::new(self.params.half_width, self.params.half_height)
        }
    }

    fn body_quad(&self, center: Vec2) -> [Vec2; 4] {
        let min = center - self.half_extents();
        let max = center + self.half_extents();
        [
            Vec2::new(min.x, min.y),
            Vec2::new(max.x, min.y),
            Vec2::new(max.x, max.y),
            Vec2::new(min.x, max.y),
        ]
    }

    /// Small square at the top corner on the facing side.
    fn facing_nub(&self, center: Vec2) -> [Vec2; 4] {
        let min = center - self.half_extents();
        let max = center + self.half_extents();
        let (x0, x1) = if self.facing_left() {
            (min.x - FACING_NUB, min.x)
        } else {
            (max.x, max.x + FACING_NUB)
        };
        [
            Vec2::new(x0, max.y - FACING_NUB),
            Vec2::new(x1, max.y - FACING_NUB),
            Vec2::new(x1, max.y),
            Vec2::new(x0, max.y),
        ]
    }

    pub fn snapshot(&self, physics: &PhysicsWorld) -> CharacterSnapshot {
        CharacterSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            position: physics.translation(self.body),
            velocity: physics.linvel(self.body),
            face: self.face,
        }
    }
}

impl Actor for Character {
    fn name(&self) -> &str {
        &self.name
    }

    fn body(&self) -> Option<RigidBodyHandle> {
        Some(self.body)
    }

    fn begin_step(&mut self, ctx: &mut ActorContext<'_>, dt: f32) {
        self.step_motion(ctx.physics, dt);
    }

    fn end_step(&mut self, ctx: &mut ActorContext<'_>, _dt: f32) {
        self.step_ground(ctx.physics);
    }

    fn think(&mut self, ctx: &mut ActorContext<'_>) {
        if let Some(ai) = self.ai.as_mut() {
            ai.think(ctx.time, &mut self.intent, &mut *ctx.rng);
        }
    }

    fn on_key_press(&mut self, event: KeyEvent) {
        if let Some(controls) = &self.controls {
            controls.apply(&mut self.intent, event);
        }
    }

    fn on_key_release(&mut self, event: KeyEvent) {
        if let Some(controls) = &self.controls {
            controls.apply(&mut self.intent, event);
        }
    }

    fn debug_draw(&self, physics: &PhysicsWorld, renderer: &mut dyn Renderer) {
        let center = physics.translation(self.body);
        renderer.set_color(self.color);
        renderer.fill_quad(self.body_quad(center));
        renderer.fill_quad(self.facing_nub(center));
    }

    fn snapshot(&self, physics: &PhysicsWorld) -> Option<CharacterSnapshot> {
        Some(Character::snapshot(self, physics))
    }

    fn as_character(&self) -> Option<&Character> {
        Some(self)
    }

    fn as_character_mut(&mut self) -> Option<&mut Character> {
        Some(self)
    }
}
