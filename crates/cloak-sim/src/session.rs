//! Timer-driven session: feeds wall time through the fixed-step clock, routes
//! draw and key callbacks, and tears the game down on close.

use cloak_core::input::{Key, KeyEvent};
use cloak_core::render::Renderer;
use cloak_core::tiles::TileMap;
use cloak_core::time::FixedStepClock;

use crate::config::{ConfigError, SimConfig};
use crate::game::Game;

pub struct Session {
    game: Option<Game>,
    clock: FixedStepClock,
    timer_registered: bool,
    view_width: f32,
    view_height: f32,
}

impl Session {
    /// Validate `config`, assemble the game and register the timer.
    pub fn open(
        config: SimConfig,
        tiles: TileMap,
        view_width: f32,
        view_height: f32,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = FixedStepClock::new(f64::from(config.world.dt()));
        let game = Game::new(config, tiles);
        tracing::info!(
            tick = clock.tick(),
            timer_interval = clock.callback_interval(),
            view_width,
            view_height,
            "Session opened"
        );
        Ok(Self {
            game: Some(game),
            clock,
            timer_registered: true,
            view_width,
            view_height,
        })
    }

    /// Period at which the host should call [`on_timer`](Self::on_timer).
    pub fn timer_interval(&self) -> f64 {
        self.clock.callback_interval()
    }

    pub fn is_open(&self) -> bool {
        self.game.is_some()
    }

    pub fn is_timer_registered(&self) -> bool {
        self.timer_registered
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn game_mut(&mut self) -> Option<&mut Game> {
        self.game.as_mut()
    }

    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    /// Feed `elapsed` wall seconds. Steps the game at most once; returns
    /// whether it did.
    pub fn on_timer(&mut self, elapsed: f64) -> bool {
        if !self.timer_registered {
            return false;
        }
        let Some(game) = self.game.as_mut() else {
            return false;
        };
        let advance = self.clock.advance(elapsed);
        if advance.step {
            game.step();
        }
        advance.step
    }

    pub fn on_draw(&self, renderer: &mut dyn Renderer) {
        if let Some(game) = &self.game {
            game.draw(self.view_width, self.view_height, renderer);
        }
    }

    /// Escape closes the session; everything else goes to the focused entity.
    pub fn on_key_press(&mut self, event: KeyEvent) {
        if let KeyEvent::Pressed(Key::Escape, _) = event {
            self.close();
            return;
        }
        if let Some(game) = self.game.as_mut() {
            game.on_key_press(event);
        }
    }

    pub fn on_key_release(&mut self, event: KeyEvent) {
        if let KeyEvent::Released(Key::Escape, _) = event {
            return;
        }
        if let Some(game) = self.game.as_mut() {
            game.on_key_release(event);
        }
    }

    /// Unregister the timer, then delete every entity. Idempotent.
    pub fn close(&mut self) {
        self.timer_registered = false;
        let Some(mut game) = self.game.take() else {
            return;
        };
        let ticks = game.world().ticks();
        game.shutdown();
        tracing::info!(ticks, "Session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
