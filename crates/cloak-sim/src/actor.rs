use cloak_core::input::KeyEvent;
use cloak_core::render::Renderer;
use rand::rngs::StdRng;
use rapier2d::prelude::RigidBodyHandle;

use crate::character::{Character, CharacterSnapshot};
use crate::contact::Contact;
use crate::entity::EntityId;
use crate::physics::PhysicsWorld;

/// Builds an actor once its id has been reserved.
pub type ActorBuilder = Box<dyn FnOnce(EntityId, &mut PhysicsWorld) -> Box<dyn Actor>>;

/// World mutation requested from inside an actor callback. Applied right
/// after the callback returns.
pub enum WorldCommand {
    Spawn {
        build: ActorBuilder,
        stepping: bool,
        drawing: bool,
    },
    Despawn(EntityId),
    SetStepping(EntityId, bool),
    SetDrawing(EntityId, bool),
}

/// Everything an actor may touch while the world runs one of its callbacks.
pub struct ActorContext<'a> {
    pub id: EntityId,
    pub physics: &'a mut PhysicsWorld,
    pub rng: &'a mut StdRng,
    /// Simulation time in seconds.
    pub time: f64,
    pub(crate) commands: &'a mut Vec<WorldCommand>,
}

impl ActorContext<'_> {
    pub fn spawn(&mut self, build: ActorBuilder, stepping: bool, drawing: bool) {
        self.commands.push(WorldCommand::Spawn {
            build,
            stepping,
            drawing,
        });
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.commands.push(WorldCommand::Despawn(id));
    }

    pub fn set_stepping(&mut self, id: EntityId, on: bool) {
        self.commands.push(WorldCommand::SetStepping(id, on));
    }

    pub fn set_drawing(&mut self, id: EntityId, on: bool) {
        self.commands.push(WorldCommand::SetDrawing(id, on));
    }
}

/// A simulated object owned by the [`World`](crate::world::World).
///
/// Every hook defaults to a no-op.
pub trait Actor {
    fn name(&self) -> &str {
        "ACTOR"
    }

    /// The body this actor owns; removed together with the actor.
    fn body(&self) -> Option<RigidBodyHandle> {
        None
    }

    /// Pre-physics logic for one tick.
    fn begin_step(&mut self, _ctx: &mut ActorContext<'_>, _dt: f32) {}

    /// Post-physics correction for one tick.
    fn end_step(&mut self, _ctx: &mut ActorContext<'_>, _dt: f32) {}

    fn begin_contact(&mut self, _ctx: &mut ActorContext<'_>, _contact: &Contact) {}

    fn end_contact(&mut self, _ctx: &mut ActorContext<'_>, _contact: &Contact) {}

    /// Decision making, called for one randomly chosen actor per tick.
    fn think(&mut self, _ctx: &mut ActorContext<'_>) {}

    fn on_key_press(&mut self, _event: KeyEvent) {}

    fn on_key_release(&mut self, _event: KeyEvent) {}

    fn draw(&self, _physics: &PhysicsWorld, _renderer: &mut dyn Renderer) {}

    fn debug_draw(&self, _physics: &PhysicsWorld, _renderer: &mut dyn Renderer) {}

    fn snapshot(&self, _physics: &PhysicsWorld) -> Option<CharacterSnapshot> {
        None
    }

    fn as_character(&self) -> Option<&Character> {
        None
    }

    fn as_character_mut(&mut self) -> Option<&mut Character> {
        None
    }
}
