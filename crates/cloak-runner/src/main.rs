mod autopilot;

use cloak_core::input::{Key, KeyEvent, Modifiers};
use cloak_core::render::DrawList;
use cloak_core::tiles::TileMap;
use cloak_sim::config::SimConfig;
use cloak_sim::session::Session;
use tracing_subscriber::EnvFilter;

use autopilot::Autopilot;

const DEFAULT_LEVEL: &str = "resources/levels/level.txt";
const VIEW_WIDTH: f32 = 800.0;
const VIEW_HEIGHT: f32 = 600.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let level_path = std::env::args()
        .nth(1)
        .and_then(|a| a.strip_prefix("--level=").map(String::from))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    let seconds = std::env::args()
        .nth(2)
        .and_then(|a| a.strip_prefix("--seconds=").map(String::from))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(8.0);

    let config = SimConfig::load();
    let tick_rate_hz = config.world.tick_rate_hz;

    let text = match std::fs::read_to_string(&level_path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to read level {level_path}: {e}");
            std::process::exit(1);
        },
    };
    let tiles = match TileMap::parse_str(&text) {
        Ok(tiles) => tiles,
        Err(e) => {
            tracing::error!("Invalid level {level_path}: {e}");
            std::process::exit(1);
        },
    };

    let mut session = match Session::open(config, tiles, VIEW_WIDTH, VIEW_HEIGHT) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        },
    };

    let interval = session.timer_interval();
    let callbacks = (seconds / interval).ceil() as u64;
    let report_every = tick_rate_hz.round().max(1.0) as u64;
    let mut pilot = Autopilot::demo(tick_rate_hz);
    let mut frame = DrawList::new();

    tracing::info!("Running {level_path} for {seconds}s ({callbacks} timer callbacks)");

    for _ in 0..callbacks {
        if !session.on_timer(interval) {
            continue;
        }
        let Some(ticks) = session.game().map(|g| g.world().ticks()) else {
            break;
        };
        for &(_, event) in pilot.due(ticks) {
            match event {
                KeyEvent::Pressed(..) => session.on_key_press(event),
                KeyEvent::Released(..) => session.on_key_release(event),
            }
        }
        if ticks % report_every == 0 {
            frame.clear();
            session.on_draw(&mut frame);
            report(&session, ticks, frame.len());
        }
    }

    session.on_key_press(KeyEvent::Pressed(Key::Escape, Modifiers::NONE));
}

fn report(session: &Session, ticks: u64, draw_calls: usize) {
    let Some(game) = session.game() else {
        return;
    };
    match serde_json::to_string(&game.snapshot()) {
        Ok(json) => tracing::info!(ticks, draw_calls, "{json}"),
        Err(e) => tracing::warn!("Failed to serialize snapshot: {e}"),
    }
}
