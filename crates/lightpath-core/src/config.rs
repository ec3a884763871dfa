use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::KeyCode;
use crate::state::{PLAYER_COUNT, Player};

/// Environment variable naming a TOML config file.
pub const CONFIG_PATH_ENV: &str = "LIGHTPATH_CONFIG";
/// Config file consulted when `LIGHTPATH_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/lightpath.toml";

/// When a step appends a new point to a player's trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailPolicy {
    /// Every step appends, even if the player did not move.
    #[default]
    Always,
    /// Only steps that change the player's position append.
    OnMove,
}

impl std::str::FromStr for TrailPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "always" => Ok(Self::Always),
            "on_move" => Ok(Self::OnMove),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// When friction is applied to a player's velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionPolicy {
    /// Only on steps where the player holds none of their control keys.
    #[default]
    WhenIdle,
    /// On every step, after acceleration.
    Always,
}

impl std::str::FromStr for FrictionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "when_idle" => Ok(Self::WhenIdle),
            "always" => Ok(Self::Always),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// The two horizontal control keys of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub left: KeyCode,
    pub right: KeyCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// Simulation tuning. Loaded once at startup; the reducer treats it as constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Arena extent on x. Positions are valid in `[0, arena_width]`.
    pub arena_width: f32,
    /// Arena extent on y. Positions are valid in `[0, arena_height]`.
    pub arena_height: f32,
    /// Velocity change per held control key per step.
    pub acceleration: f32,
    /// Friction: velocity magnitude removed per step, per axis.
    pub deceleration: f32,
    /// Simulation clock period in milliseconds.
    pub tick_ms: u64,
    /// Starting point of each player.
    pub spawns: [SpawnPoint; PLAYER_COUNT],
    /// Control keys, indexed by player.
    pub controls: [KeyBinding; PLAYER_COUNT],
    pub trail_policy: TrailPolicy,
    pub friction_policy: FrictionPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            arena_width: 1380.0,
            arena_height: 720.0,
            acceleration: 2.0,
            deceleration: 1.0,
            tick_ms: 10,
            spawns: [SpawnPoint { x: 400.0, y: 400.0 }; PLAYER_COUNT],
            controls: [
                // Arrow left / arrow right
                KeyBinding {
                    left: 37,
                    right: 39,
                },
                // A / D
                KeyBinding {
                    left: 65,
                    right: 68,
                },
            ],
            trail_policy: TrailPolicy::Always,
            friction_policy: FrictionPolicy::WhenIdle,
        }
    }
}

/// Reasons a configuration is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    InvalidArena { width: f32, height: f32 },
    NegativeConstant { name: &'static str, value: f32 },
    ZeroTickPeriod,
    SpawnOutOfBounds { player: usize, x: f32, y: f32 },
    DuplicateKey(KeyCode),
    UnknownPolicy(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(m) => write!(f, "invalid config: {m}"),
            Self::InvalidArena { width, height } => {
                write!(f, "arena must be positive, got {width}x{height}")
            },
            Self::NegativeConstant { name, value } => {
                write!(f, "{name} must be finite and non-negative, got {value}")
            },
            Self::ZeroTickPeriod => write!(f, "tick_ms must be greater than zero"),
            Self::SpawnOutOfBounds { player, x, y } => {
                write!(f, "spawn point ({x}, {y}) of player {} is outside the arena", player + 1)
            },
            Self::DuplicateKey(code) => write!(f, "key code {code} is bound more than once"),
            Self::UnknownPolicy(p) => write!(f, "unknown policy '{p}'"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SimConfig {
    /// Load config from `LIGHTPATH_CONFIG` or `config/lightpath.toml`, falling
    /// back to defaults. Env overrides are applied last.
    pub fn load() -> Self {
        let mut config = Self::load_file().unwrap_or_default();
        config.apply_env_overrides();
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Config rejected after env overrides, using defaults");
            return Self::default();
        }
        config
    }

    fn load_file() -> Option<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let contents = std::fs::read_to_string(&path).ok()?;
        match Self::from_toml_str(&contents) {
            Ok(config) => {
                tracing::info!(path = %path, "Loaded simulation config");
                Some(config)
            },
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to load config, using defaults");
                None
            },
        }
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LIGHTPATH_TICK_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            self.tick_ms = ms;
        }
        if let Ok(val) = std::env::var("LIGHTPATH_TRAIL_POLICY") {
            match val.parse::<TrailPolicy>() {
                Ok(policy) => self.trail_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Ignoring LIGHTPATH_TRAIL_POLICY"),
            }
        }
        if let Ok(val) = std::env::var("LIGHTPATH_FRICTION_POLICY") {
            match val.parse::<FrictionPolicy>() {
                Ok(policy) => self.friction_policy = policy,
                Err(e) => tracing::warn!(error = %e, "Ignoring LIGHTPATH_FRICTION_POLICY"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let arena_ok = |v: f32| v.is_finite() && v > 0.0;
        if !arena_ok(self.arena_width) || !arena_ok(self.arena_height) {
            return Err(ConfigError::InvalidArena {
                width: self.arena_width,
                height: self.arena_height,
            });
        }
        for (name, value) in [
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeConstant { name, value });
            }
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        for (player, spawn) in self.spawns.iter().enumerate() {
            let inside = (0.0..=self.arena_width).contains(&spawn.x)
                && (0.0..=self.arena_height).contains(&spawn.y);
            if !inside {
                return Err(ConfigError::SpawnOutOfBounds {
                    player,
                    x: spawn.x,
                    y: spawn.y,
                });
            }
        }
        let mut seen: Vec<KeyCode> = Vec::with_capacity(PLAYER_COUNT * 2);
        for binding in &self.controls {
            for code in [binding.left, binding.right] {
                if seen.contains(&code) {
                    return Err(ConfigError::DuplicateKey(code));
                }
                seen.push(code);
            }
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn spawn_players(&self) -> [Player; PLAYER_COUNT] {
        self.spawns.map(|s| Player::at(s.x, s.y))
    }
}
