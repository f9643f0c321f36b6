//! The simulation world: entity lifecycle, the fixed tick and input routing.

use cloak_core::input::KeyEvent;
use cloak_core::render::Renderer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actor::{Actor, ActorBuilder, ActorContext, WorldCommand};
use crate::character::{Character, CharacterSnapshot};
use crate::config::WorldConfig;
use crate::contact::{Contact, ContactPhase};
use crate::entity::{EntityId, EntityRegistry};
use crate::physics::PhysicsWorld;

/// Owns every actor, the physics world and the simulation clock.
pub struct World {
    pub(crate) registry: EntityRegistry<Box<dyn Actor>>,
    pub(crate) physics: PhysicsWorld,
    rng: StdRng,
    time: f64,
    ticks: u64,
    focus: Option<EntityId>,
    commands: Vec<WorldCommand>,
}

impl World {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            registry: EntityRegistry::new(),
            physics: PhysicsWorld::new(config),
            rng: StdRng::seed_from_u64(config.seed),
            time: 0.0,
            ticks: 0,
            focus: None,
            commands: Vec::new(),
        }
    }

    /// Register an actor. `build` receives the new id and the physics world
    /// so the actor can create and tag its body. New actors are neither
    /// stepping nor drawing.
    pub fn add_entity<A, F>(&mut self, build: F) -> EntityId
    where
        A: Actor + 'static,
        F: FnOnce(EntityId, &mut PhysicsWorld) -> A,
    {
        let id = self.registry.allocate();
        let actor = build(id, &mut self.physics);
        self.registry.insert(id, Box::new(actor));
        tracing::trace!(%id, "Entity added");
        id
    }

    fn add_boxed(&mut self, build: ActorBuilder) -> EntityId {
        let id = self.registry.allocate();
        let actor = build(id, &mut self.physics);
        self.physics.update_queries();
        self.registry.insert(id, actor);
        tracing::trace!(%id, "Entity added");
        id
    }

    /// Deregister an actor and delete its body.
    ///
    /// # Panics
    /// If the entity is not registered.
    pub fn remove_entity(&mut self, id: EntityId) {
        let actor = self.registry.remove(id);
        if let Some(body) = actor.body() {
            self.physics.remove_body(body);
            self.physics.update_queries();
        }
        if self.focus == Some(id) {
            self.focus = None;
        }
        tracing::trace!(%id, name = actor.name(), "Entity removed");
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.registry.contains(id)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Returns whether the flag changed.
    pub fn set_stepping(&mut self, id: EntityId, on: bool) -> bool {
        self.registry.set_stepping(id, on)
    }

    /// Returns whether the flag changed.
    pub fn set_drawing(&mut self, id: EntityId, on: bool) -> bool {
        self.registry.set_drawing(id, on)
    }

    pub fn is_stepping(&self, id: EntityId) -> bool {
        self.registry.is_stepping(id)
    }

    pub fn is_drawing(&self, id: EntityId) -> bool {
        self.registry.is_drawing(id)
    }

    pub fn stepping_count(&self) -> usize {
        self.registry.stepping_len()
    }

    pub fn drawing_count(&self) -> usize {
        self.registry.drawing_len()
    }

    pub fn actor(&self, id: EntityId) -> Option<&dyn Actor> {
        self.registry.get(id).map(|a| a.as_ref())
    }

    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.registry.get(id).and_then(|a| a.as_character())
    }

    pub fn character_mut(&mut self, id: EntityId) -> Option<&mut Character> {
        self.registry.get_mut(id).and_then(|a| a.as_character_mut())
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Simulation time in seconds. Only [`step`](Self::step) advances it.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The entity receiving key events.
    pub fn focus(&self) -> Option<EntityId> {
        self.focus
    }

    pub fn set_focus(&mut self, id: Option<EntityId>) {
        if let Some(id) = id {
            assert!(self.registry.contains(id), "focus on unknown entity {id}");
        }
        self.focus = id;
    }

    /// Run `f` against one actor with a context borrowing the rest of the
    /// world, then apply whatever the actor queued. Stale ids are skipped.
    fn with_actor(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut dyn Actor, &mut ActorContext<'_>),
    ) {
        let Some(actor) = self.registry.get_mut(id) else {
            return;
        };
        let mut ctx = ActorContext {
            id,
            physics: &mut self.physics,
            rng: &mut self.rng,
            time: self.time,
            commands: &mut self.commands,
        };
        f(actor.as_mut(), &mut ctx);
        self.apply_commands();
    }

    fn apply_commands(&mut self) {
        while !self.commands.is_empty() {
            for command in std::mem::take(&mut self.commands) {
                match command {
                    WorldCommand::Spawn {
                        build,
                        stepping,
                        drawing,
                    } => {
                        let id = self.add_boxed(build);
                        self.registry.set_stepping(id, stepping);
                        self.registry.set_drawing(id, drawing);
                    },
                    WorldCommand::Despawn(id) if self.registry.contains(id) => {
                        self.remove_entity(id);
                    },
                    WorldCommand::SetStepping(id, on) if self.registry.contains(id) => {
                        self.registry.set_stepping(id, on);
                    },
                    WorldCommand::SetDrawing(id, on) if self.registry.contains(id) => {
                        self.registry.set_drawing(id, on);
                    },
                    WorldCommand::Despawn(id)
                    | WorldCommand::SetStepping(id, _)
                    | WorldCommand::SetDrawing(id, _) => {
                        tracing::warn!(%id, "Command for unknown entity ignored");
                    },
                }
            }
        }
    }

    /// Advance the simulation by one fixed tick of `dt` seconds.
    ///
    /// One randomly chosen actor thinks, every stepping actor runs its
    /// pre-physics logic, physics advances by exactly `dt` with contacts
    /// dispatched to both owners, then every stepping actor runs its
    /// post-physics correction. Both passes walk the stepping set as it was
    /// when the tick began; actors removed meanwhile are skipped and actors
    /// added meanwhile wait for the next tick.
    pub fn step(&mut self, dt: f32) {
        self.time += f64::from(dt);
        self.ticks += 1;

        let ids = self.registry.ids();
        if !ids.is_empty() {
            let thinker = ids[self.rng.random_range(0..ids.len())];
            self.with_actor(thinker, |actor, ctx| actor.think(ctx));
        }

        let stepping = self.registry.stepping_snapshot();
        for &id in &stepping {
            self.with_actor(id, |actor, ctx| actor.begin_step(ctx, dt));
        }

        let contacts = self.physics.step(dt);
        self.dispatch_contacts(&contacts);

        for &id in &stepping {
            self.with_actor(id, |actor, ctx| actor.end_step(ctx, dt));
        }
    }

    /// Deliver each contact to the owners of both fixtures.
    fn dispatch_contacts(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            tracing::trace!(
                phase = ?contact.phase,
                a = %contact.fixture_a.owner,
                b = %contact.fixture_b.owner,
                "Contact"
            );
            for owner in contact.owners() {
                self.with_actor(owner, |actor, ctx| match contact.phase {
                    ContactPhase::Begin => actor.begin_contact(ctx, contact),
                    ContactPhase::End => actor.end_contact(ctx, contact),
                });
            }
        }
    }

    /// Draw every drawing actor. With `debug_overlay`, physics shape outlines
    /// and every actor's debug figure follow on top.
    pub fn draw(&self, renderer: &mut dyn Renderer, debug_overlay: bool) {
        for id in self.registry.drawing_snapshot() {
            if let Some(actor) = self.registry.get(id) {
                actor.draw(&self.physics, renderer);
            }
        }
        if debug_overlay {
            self.debug_draw(renderer);
        }
    }

    pub fn on_key_press(&mut self, event: KeyEvent) {
        if let Some(actor) = self.focus.and_then(|id| self.registry.get_mut(id)) {
            actor.on_key_press(event);
        }
    }

    pub fn on_key_release(&mut self, event: KeyEvent) {
        if let Some(actor) = self.focus.and_then(|id| self.registry.get_mut(id)) {
            actor.on_key_release(event);
        }
    }

    /// State of every character, in entity order.
    pub fn snapshot(&self) -> Vec<CharacterSnapshot> {
        self.registry
            .iter()
            .filter_map(|(_, actor)| actor.snapshot(&self.physics))
            .collect()
    }

    /// Remove every entity and its body.
    pub fn shutdown(&mut self) {
        for id in self.registry.ids() {
            self.remove_entity(id);
        }
        assert!(self.registry.is_empty(), "entities left after shutdown");
        assert_eq!(self.registry.stepping_len(), 0);
        assert_eq!(self.registry.drawing_len(), 0);
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use cloak_core::render::DrawList;
    use glam::Vec2;
    use rapier2d::prelude::RigidBodyHandle;

    use super::*;
    use crate::physics::{BodyKind, FixtureDef, FixtureTag};

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every callback it receives.
    struct Recorder {
        label: &'static str,
        log: Log,
        body: Option<RigidBodyHandle>,
        on_begin: Vec<Scripted>,
    }

    #[derive(Clone, Copy)]
    enum Scripted {
        Despawn(EntityId),
        SpawnRecorder(&'static str),
    }

    impl Recorder {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                log: Rc::clone(log),
                body: None,
                on_begin: Vec::new(),
            }
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.label));
        }
    }

    impl Actor for Recorder {
        fn name(&self) -> &str {
            self.label
        }

        fn body(&self) -> Option<RigidBodyHandle> {
            self.body
        }

        fn begin_step(&mut self, ctx: &mut ActorContext<'_>, _dt: f32) {
            self.push("begin");
            for scripted in self.on_begin.drain(..) {
                match scripted {
                    Scripted::Despawn(id) => ctx.despawn(id),
                    Scripted::SpawnRecorder(label) => {
                        let log = Rc::clone(&self.log);
                        let build: ActorBuilder = Box::new(
                            move |_: EntityId, _: &mut PhysicsWorld| -> Box<dyn Actor> {
                                Box::new(Recorder::new(label, &log))
                            },
                        );
                        ctx.spawn(build, true, true);
                    },
                }
            }
        }

        fn end_step(&mut self, _ctx: &mut ActorContext<'_>, _dt: f32) {
            self.push("end");
        }

        fn think(&mut self, _ctx: &mut ActorContext<'_>) {
            self.push("think");
        }

        fn begin_contact(&mut self, _ctx: &mut ActorContext<'_>, _contact: &Contact) {
            self.push("contact");
        }

        fn end_contact(&mut self, _ctx: &mut ActorContext<'_>, _contact: &Contact) {
            self.push("separate");
        }

        fn on_key_press(&mut self, _event: KeyEvent) {
            self.push("key");
        }

        fn draw(&self, _physics: &PhysicsWorld, _renderer: &mut dyn Renderer) {
            self.push("draw");
        }

        fn debug_draw(&self, _physics: &PhysicsWorld, _renderer: &mut dyn Renderer) {
            self.push("debug");
        }
    }

    fn world() -> World {
        World::new(&WorldConfig::default())
    }

    fn entries(log: &Log, suffix: &str) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|e| e.ends_with(suffix))
            .cloned()
            .collect()
    }

    #[test]
    fn only_stepping_actors_are_stepped() {
        let log = Log::default();
        let mut world = world();
        let a = world.add_entity(|_, _| Recorder::new("a", &log));
        let _b = world.add_entity(|_, _| Recorder::new("b", &log));
        world.set_stepping(a, true);
        world.step(1.0 / 60.0);
        assert_eq!(entries(&log, ":begin"), vec!["a:begin"]);
        assert_eq!(entries(&log, ":end"), vec!["a:end"]);
        assert_eq!(world.ticks(), 1);
        assert!((world.time() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn exactly_one_actor_thinks_per_tick() {
        let log = Log::default();
        let mut world = world();
        for label in ["a", "b", "c"] {
            world.add_entity(|_, _| Recorder::new(label, &log));
        }
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(entries(&log, ":think").len(), 10);
    }

    #[test]
    fn mid_tick_removal_is_skipped_and_spawn_waits() {
        let log = Log::default();
        let mut world = world();
        let victim = world.add_entity(|_, _| Recorder::new("victim", &log));
        let killer = world.add_entity(|_, _| {
            let mut recorder = Recorder::new("killer", &log);
            recorder.on_begin = vec![
                Scripted::Despawn(victim),
                Scripted::SpawnRecorder("child"),
            ];
            recorder
        });
        world.set_stepping(victim, true);
        world.set_stepping(killer, true);
        // Ids order the snapshot: victim was allocated first, so it begins
        // before the killer removes it but never reaches end_step.
        world.step(1.0 / 60.0);
        assert_eq!(entries(&log, ":begin"), vec!["victim:begin", "killer:begin"]);
        assert_eq!(entries(&log, ":end"), vec!["killer:end"]);
        assert!(!world.contains(victim));
        assert_eq!(world.len(), 2);

        log.borrow_mut().clear();
        world.step(1.0 / 60.0);
        let mut begun = entries(&log, ":begin");
        begun.sort();
        assert_eq!(begun, vec!["child:begin", "killer:begin"]);
    }

    #[test]
    fn draw_then_overlay() {
        let log = Log::default();
        let mut world = world();
        let a = world.add_entity(|_, _| Recorder::new("a", &log));
        world.add_entity(|_, _| Recorder::new("b", &log));
        world.set_drawing(a, true);
        let mut list = DrawList::new();
        world.draw(&mut list, false);
        assert_eq!(*log.borrow(), vec!["a:draw"]);
        log.borrow_mut().clear();
        world.draw(&mut list, true);
        assert_eq!(*log.borrow(), vec!["a:draw", "a:debug", "b:debug"]);
    }

    #[test]
    fn keys_go_to_focus_only() {
        let log = Log::default();
        let mut world = world();
        let a = world.add_entity(|_, _| Recorder::new("a", &log));
        world.add_entity(|_, _| Recorder::new("b", &log));
        let event = KeyEvent::Pressed(cloak_core::input::Key::Left, Default::default());
        world.on_key_press(event);
        assert!(log.borrow().is_empty());
        world.set_focus(Some(a));
        world.on_key_press(event);
        assert_eq!(*log.borrow(), vec!["a:key"]);
    }

    #[test]
    fn contacts_reach_both_owners() {
        let log = Log::default();
        let mut world = world();
        let floor = world.add_entity(|id, physics| {
            let body = physics.create_body(id, BodyKind::Static, Vec2::ZERO);
            let square = [
                Vec2::new(-2.0, -0.5),
                Vec2::new(2.0, -0.5),
                Vec2::new(2.0, 0.5),
                Vec2::new(-2.0, 0.5),
            ];
            physics
                .attach_polygon(body, &square, FixtureDef::solid(FixtureTag::new(id)))
                .unwrap();
            let mut recorder = Recorder::new("floor", &log);
            recorder.body = Some(body);
            recorder
        });
        let ball = world.add_entity(|id, physics| {
            let body = physics.create_body(id, BodyKind::Dynamic, Vec2::new(0.0, 0.6));
            physics.attach_circle(body, 0.5, FixtureDef::sensor(FixtureTag::new(id), 1.0));
            let mut recorder = Recorder::new("ball", &log);
            recorder.body = Some(body);
            recorder
        });
        world.step(1.0 / 60.0);
        let contacts = entries(&log, ":contact");
        assert!(contacts.contains(&"floor:contact".to_string()));
        assert!(contacts.contains(&"ball:contact".to_string()));

        world.remove_entity(ball);
        assert_eq!(world.physics().body_count(), 1);
        assert!(entries(&log, ":separate").is_empty());
        // The survivor hears about the removed body on the next step.
        world.step(1.0 / 60.0);
        assert_eq!(entries(&log, ":separate"), vec!["floor:separate".to_string()]);

        world.remove_entity(floor);
        assert_eq!(world.physics().body_count(), 0);
    }

    #[test]
    fn shutdown_empties_everything() {
        let log = Log::default();
        let mut world = world();
        for label in ["a", "b"] {
            let id = world.add_entity(|_, _| Recorder::new(label, &log));
            world.set_stepping(id, true);
            world.set_drawing(id, true);
        }
        world.set_focus(world.registry.ids().first().copied());
        world.shutdown();
        assert!(world.is_empty());
        assert_eq!(world.stepping_count(), 0);
        assert_eq!(world.drawing_count(), 0);
        assert_eq!(world.focus(), None);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn removing_twice_panics() {
        let log = Log::default();
        let mut world = world();
        let a = world.add_entity(|_, _| Recorder::new("a", &log));
        world.remove_entity(a);
        world.remove_entity(a);
    }
}
