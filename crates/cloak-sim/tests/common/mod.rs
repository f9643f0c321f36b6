use cloak_core::test_helpers::level;
use cloak_sim::character::{Character, CharacterSnapshot};
use cloak_sim::config::SimConfig;
use cloak_sim::game::Game;

pub fn game(text: &str) -> Game {
    Game::new(SimConfig::default(), level(text))
}

pub fn seeded_game(text: &str, seed: u64) -> Game {
    let mut config = SimConfig::default();
    config.world.seed = seed;
    Game::new(config, level(text))
}

pub fn run(game: &mut Game, ticks: usize) {
    for _ in 0..ticks {
        game.step();
    }
}

pub fn player(game: &Game) -> &Character {
    game.world()
        .character(game.player())
        .expect("player is alive")
}

pub fn player_snapshot(game: &Game) -> CharacterSnapshot {
    player(game).snapshot(game.world().physics())
}
