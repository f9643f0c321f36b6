//! Assembles a playable world from a tile map: level, thief and guards.

use cloak_core::input::KeyEvent;
use cloak_core::render::{Camera, Color, Projected, Renderer};
use cloak_core::tiles::TileMap;
use glam::Vec2;
use rand::Rng;

use crate::ai::WanderAi;
use crate::character::{Character, CharacterSnapshot};
use crate::config::SimConfig;
use crate::controls::KeyboardControls;
use crate::entity::EntityId;
use crate::level::LevelActor;
use crate::world::World;

pub const PLAYER_NAME: &str = "THIEF";

pub fn guard_name(index: usize) -> String {
    format!("GUARD_{index}")
}

pub struct Game {
    world: World,
    level: EntityId,
    player: EntityId,
    guards: Vec<EntityId>,
    config: SimConfig,
}

impl Game {
    /// Build the level, the keyboard-controlled thief at the start marker and
    /// one wandering guard per guard marker.
    pub fn new(config: SimConfig, tiles: TileMap) -> Self {
        let mut world = World::new(&config.world);

        let mut start = Vec2::ZERO;
        let mut guard_spawns = Vec::new();
        let level = world.add_entity(|id, physics| {
            let level = LevelActor::build(id, physics, tiles, &config.level);
            start = level.start_position();
            guard_spawns = level.guard_positions().to_vec();
            level
        });
        world.set_drawing(level, true);

        let player_params = config.player.clone();
        let player = world.add_entity(|id, physics| {
            Character::spawn(id, physics, PLAYER_NAME, start, player_params)
                .with_controls(KeyboardControls::default())
                .with_color(Color::THIEF)
        });
        world.set_stepping(player, true);
        world.set_drawing(player, true);
        world.set_focus(Some(player));

        let mut guards = Vec::with_capacity(guard_spawns.len());
        for (i, position) in guard_spawns.into_iter().enumerate() {
            let walk_left = world.rng_mut().random_bool(0.5);
            let now = world.time();
            let ai = WanderAi::new(&config.ai, now, world.rng_mut());
            let params = config.guard.clone();
            let guard = world.add_entity(|id, physics| {
                let mut guard = Character::spawn(id, physics, guard_name(i), position, params)
                    .with_ai(ai)
                    .with_color(Color::GUARD);
                let intent = guard.intent_mut();
                intent.left = walk_left;
                intent.right = !walk_left;
                guard
            });
            world.set_stepping(guard, true);
            world.set_drawing(guard, true);
            guards.push(guard);
        }

        tracing::info!(%player, guards = guards.len(), "Game assembled");

        Self {
            world,
            level,
            player,
            guards,
            config,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn level(&self) -> EntityId {
        self.level
    }

    pub fn player(&self) -> EntityId {
        self.player
    }

    pub fn guards(&self) -> &[EntityId] {
        &self.guards
    }

    /// Advance one tick of the configured length.
    pub fn step(&mut self) {
        self.world.step(self.config.world.dt());
    }

    /// Camera for a viewport, centered on the player while it exists.
    pub fn camera(&self, view_width: f32, view_height: f32) -> Camera {
        let camera = Camera::new(view_width, view_height, self.config.view.world_view_units);
        match self.world.character(self.player) {
            Some(player) => camera.look_at(self.world.physics().translation(player.body_handle())),
            None => camera,
        }
    }

    /// Draw the world through the player camera.
    pub fn draw(&self, view_width: f32, view_height: f32, renderer: &mut dyn Renderer) {
        let mut projected = Projected::new(self.camera(view_width, view_height), renderer);
        self.world.draw(&mut projected, self.config.view.debug_overlay);
    }

    pub fn on_key_press(&mut self, event: KeyEvent) {
        self.world.on_key_press(event);
    }

    pub fn on_key_release(&mut self, event: KeyEvent) {
        self.world.on_key_release(event);
    }

    pub fn snapshot(&self) -> Vec<CharacterSnapshot> {
        self.world.snapshot()
    }

    pub(crate) fn shutdown(&mut self) {
        self.world.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use cloak_core::input::Key;
    use cloak_core::render::{DrawCommand, DrawList};
    use cloak_core::test_helpers::{MIXED_LEVEL, count_commands, level, press};

    use super::*;
    use crate::actor::Actor;

    fn game(text: &str) -> Game {
        Game::new(SimConfig::default(), level(text))
    }

    #[test]
    fn assembles_thief_and_guards() {
        let game = game("@  %  %\n=======");
        assert_eq!(game.guards().len(), 2);
        assert_eq!(game.world().len(), 4);
        assert_eq!(game.world().focus(), Some(game.player()));

        let thief = game.world().character(game.player()).unwrap();
        assert_eq!(thief.name(), PLAYER_NAME);
        assert!(thief.has_controls());
        assert_eq!(thief.color(), Color::THIEF);

        for (i, &id) in game.guards().iter().enumerate() {
            let guard = game.world().character(id).unwrap();
            assert_eq!(guard.name(), guard_name(i));
            assert!(guard.ai().is_some());
            assert!(!guard.has_controls());
            assert_eq!(guard.color(), Color::GUARD);
            assert_eq!(guard.params().max_walk_velocity, 3.0);
            assert!(guard.intent().left != guard.intent().right);
            assert!(game.world().is_stepping(id));
        }

        assert!(game.world().is_drawing(game.level()));
        assert!(!game.world().is_stepping(game.level()));
    }

    #[test]
    fn guards_in_tile_order() {
        let game = game(MIXED_LEVEL);
        assert_eq!(game.guards().len(), 1);
        let guard = game.world().character(game.guards()[0]).unwrap();
        let position = game.world().physics().translation(guard.body_handle());
        assert_eq!(position, Vec2::new(6.0, -1.0));
    }

    #[test]
    fn camera_follows_player() {
        let game = game("@\n===");
        let camera = game.camera(800.0, 600.0);
        assert_eq!(camera.scale, 30.0);
        assert_eq!(camera.target, Vec2::ZERO);
    }

    #[test]
    fn keys_reach_only_the_thief() {
        let mut game = game("@ %\n===");
        game.on_key_press(press(Key::Left));
        assert!(game.world().character(game.player()).unwrap().intent().left);
    }

    #[test]
    fn draw_projects_into_screen_space() {
        let game = game("@\n===");
        let mut list = DrawList::new();
        game.draw(800.0, 600.0, &mut list);
        // Three terrain quads, then the overlay: outlines, thief body and nub.
        assert_eq!(list.quads().count(), 5);
        assert!(list.line_loops().count() >= 4);
        let center = list.quads().nth(3).unwrap();
        let mid = (center[0] + center[2]) * 0.5;
        assert!((mid - Vec2::new(400.0, 300.0)).length() < 1e-3);
    }

    #[test]
    fn characters_are_hidden_without_the_overlay() {
        let mut config = SimConfig::default();
        config.view.debug_overlay = false;
        let game = Game::new(config, level("@\n==="));
        let mut list = DrawList::new();
        game.draw(800.0, 600.0, &mut list);
        assert_eq!(list.quads().count(), 3);
        let thief_colors = count_commands(&list, |c| *c == DrawCommand::Color(Color::THIEF));
        assert_eq!(thief_colors, 0);
    }
}
