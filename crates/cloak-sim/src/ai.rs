use cloak_core::input::Intent;
use rand::Rng;

use crate::config::AiConfig;

/// Minimal guard behavior: every few seconds either stop or start walking in
/// a random direction.
#[derive(Debug, Clone, PartialEq)]
pub struct WanderAi {
    min_turn_delay: f32,
    max_turn_delay: f32,
    turn_time: f64,
}

impl WanderAi {
    pub fn new(config: &AiConfig, now: f64, rng: &mut impl Rng) -> Self {
        let mut ai = Self {
            min_turn_delay: config.min_turn_delay,
            max_turn_delay: config.max_turn_delay,
            turn_time: now,
        };
        ai.update_turn_time(now, rng);
        ai
    }

    /// Simulation time after which the next decision is made.
    pub fn turn_time(&self) -> f64 {
        self.turn_time
    }

    fn update_turn_time(&mut self, now: f64, rng: &mut impl Rng) {
        let delay = rng.random_range(self.min_turn_delay..=self.max_turn_delay);
        self.turn_time = now + f64::from(delay);
    }

    pub fn think(&mut self, now: f64, intent: &mut Intent, rng: &mut impl Rng) {
        if now <= self.turn_time {
            return;
        }
        self.update_turn_time(now, rng);
        if intent.left || intent.right {
            intent.left = false;
            intent.right = false;
        } else if rng.random_bool(0.5) {
            intent.left = true;
        } else {
            intent.right = true;
        }
    }
}
