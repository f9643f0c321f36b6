use serde::{Deserialize, Deserializer, Serialize};

/// World gravity (units/s^2, downward).
pub const GRAVITY: f32 = -13.0;
/// Simulation tick rate.
pub const TICK_RATE_HZ: f32 = 60.0;
/// Solver velocity iterations per step.
pub const VELOCITY_ITERATIONS: usize = 10;
/// Solver position iterations per step.
pub const POSITION_ITERATIONS: usize = 10;
/// Half extent of a tile on both axes.
pub const HALF_TILE: f32 = 0.5;
/// Extra ray length below a character's radius when probing for ground.
pub const GROUND_PROBE: f32 = 0.75;
/// Vertical world units visible on screen.
pub const WORLD_VIEW_UNITS: f32 = 20.0;

/// Physics world and tick settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: f32,
    pub tick_rate_hz: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    /// Seed for every random choice the simulation makes.
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            tick_rate_hz: TICK_RATE_HZ,
            velocity_iterations: VELOCITY_ITERATIONS,
            position_iterations: POSITION_ITERATIONS,
            seed: 0,
        }
    }
}

impl WorldConfig {
    /// Fixed tick size in seconds.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate_hz
    }
}

/// Tile sizing. Tiles are laid out edge to edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub half_tile_width: f32,
    pub half_tile_height: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            half_tile_width: HALF_TILE,
            half_tile_height: HALF_TILE,
        }
    }
}

/// Movement tuning of a single character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub walk_acceleration: f32,
    pub max_walk_velocity: f32,
    pub drift_acceleration: f32,
    pub max_drift_velocity: f32,
    /// Jump velocity at full walking speed.
    pub min_jump_velocity: f32,
    /// Jump velocity from a standstill.
    pub max_jump_velocity: f32,
    pub half_width: f32,
    pub half_height: f32,
    pub ground_probe: f32,
    pub density: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_acceleration: 10.0,
            max_walk_velocity: 5.0,
            drift_acceleration: 5.0,
            max_drift_velocity: 2.0,
            min_jump_velocity: 7.0,
            max_jump_velocity: 9.0,
            half_width: 0.3,
            half_height: 0.8,
            ground_probe: GROUND_PROBE,
            density: 1.0,
        }
    }
}

impl MovementConfig {
    /// Guards walk slower than the player.
    pub fn guard() -> Self {
        Self {
            walk_acceleration: 5.0,
            max_walk_velocity: 3.0,
            ..Self::default()
        }
    }

    /// Radius of the character's circle and of the ground-stick window.
    pub fn radius(&self) -> f32 {
        self.half_width.max(self.half_height)
    }
}

/// A `[guard]` section: every key it leaves out keeps the guard tuning.
#[derive(Deserialize)]
struct MovementOverrides {
    walk_acceleration: Option<f32>,
    max_walk_velocity: Option<f32>,
    drift_acceleration: Option<f32>,
    max_drift_velocity: Option<f32>,
    min_jump_velocity: Option<f32>,
    max_jump_velocity: Option<f32>,
    half_width: Option<f32>,
    half_height: Option<f32>,
    ground_probe: Option<f32>,
    density: Option<f32>,
}

impl MovementOverrides {
    fn apply(self, base: MovementConfig) -> MovementConfig {
        MovementConfig {
            walk_acceleration: self.walk_acceleration.unwrap_or(base.walk_acceleration),
            max_walk_velocity: self.max_walk_velocity.unwrap_or(base.max_walk_velocity),
            drift_acceleration: self.drift_acceleration.unwrap_or(base.drift_acceleration),
            max_drift_velocity: self.max_drift_velocity.unwrap_or(base.max_drift_velocity),
            min_jump_velocity: self.min_jump_velocity.unwrap_or(base.min_jump_velocity),
            max_jump_velocity: self.max_jump_velocity.unwrap_or(base.max_jump_velocity),
            half_width: self.half_width.unwrap_or(base.half_width),
            half_height: self.half_height.unwrap_or(base.half_height),
            ground_probe: self.ground_probe.unwrap_or(base.ground_probe),
            density: self.density.unwrap_or(base.density),
        }
    }
}

fn guard_movement<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MovementConfig, D::Error> {
    Ok(MovementOverrides::deserialize(deserializer)?.apply(MovementConfig::guard()))
}

/// Wander behavior of guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub min_turn_delay: f32,
    pub max_turn_delay: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            min_turn_delay: 1.0,
            max_turn_delay: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub world_view_units: f32,
    pub debug_overlay: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            world_view_units: WORLD_VIEW_UNITS,
            debug_overlay: true,
        }
    }
}

/// Top-level simulation configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub level: LevelConfig,
    pub player: MovementConfig,
    #[serde(default = "MovementConfig::guard", deserialize_with = "guard_movement")]
    pub guard: MovementConfig,
    pub ai: AiConfig,
    pub view: ViewConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            level: LevelConfig::default(),
            player: MovementConfig::default(),
            guard: MovementConfig::guard(),
            ai: AiConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositive(&'static str),
    ZeroIterations(&'static str),
    InvertedRange(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositive(field) => write!(f, "{field} must be > 0"),
            Self::ZeroIterations(field) => write!(f, "{field} must be at least 1"),
            Self::InvertedRange(field) => write!(f, "{field}: minimum exceeds maximum"),
        }
    }
}

impl std::error::Error for ConfigError {}

fn positive(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive(field))
    }
}

impl MovementConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive(self.max_walk_velocity, "max_walk_velocity")?;
        positive(self.half_width, "half_width")?;
        positive(self.half_height, "half_height")?;
        positive(self.density, "density")?;
        if self.ground_probe < 0.0 {
            return Err(ConfigError::NonPositive("ground_probe"));
        }
        Ok(())
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive(self.world.tick_rate_hz, "world.tick_rate_hz")?;
        if self.world.velocity_iterations == 0 {
            return Err(ConfigError::ZeroIterations("world.velocity_iterations"));
        }
        if self.world.position_iterations == 0 {
            return Err(ConfigError::ZeroIterations("world.position_iterations"));
        }
        positive(self.level.half_tile_width, "level.half_tile_width")?;
        positive(self.level.half_tile_height, "level.half_tile_height")?;
        self.player.validate()?;
        self.guard.validate()?;
        if self.ai.min_turn_delay < 0.0 {
            return Err(ConfigError::NonPositive("ai.min_turn_delay"));
        }
        if self.ai.min_turn_delay > self.ai.max_turn_delay {
            return Err(ConfigError::InvertedRange("ai.turn_delay"));
        }
        positive(self.view.world_view_units, "view.world_view_units")?;
        Ok(())
    }

    /// Load config from `CLOAK_CONFIG` or `config/cloak.toml`. Falls back to
    /// defaults if the file is missing or unparseable.
    pub fn load() -> Self {
        let path =
            std::env::var("CLOAK_CONFIG").unwrap_or_else(|_| "config/cloak.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<SimConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    SimConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                SimConfig::default()
            },
        };

        if let Ok(val) = std::env::var("CLOAK_SEED")
            && let Ok(seed) = val.parse::<u64>()
        {
            config.world.seed = seed;
        }

        config
    }
}
