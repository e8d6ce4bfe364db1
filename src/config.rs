use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::game::constants::{net, spawn};
use crate::game::game_loop::GameLoopConfig;

const MAX_NICKNAME_LEN: usize = 24;

/// Session role of the headless binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaMode {
    Solo,
    Host,
    Client,
}

impl FromStr for ArenaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solo" => Ok(ArenaMode::Solo),
            "host" => Ok(ArenaMode::Host),
            "client" => Ok(ArenaMode::Client),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

impl fmt::Display for ArenaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArenaMode::Solo => "solo",
            ArenaMode::Host => "host",
            ArenaMode::Client => "client",
        })
    }
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub mode: ArenaMode,
    pub nickname: String,
    /// Address the host listens on
    pub bind_address: IpAddr,
    pub port: u16,
    /// Host address a client connects to
    pub join_code: Option<String>,
    pub bot_count: usize,
    pub food_count: usize,
    pub connect_timeout_ms: u64,
    /// JSON file holding finished matches
    pub scores_path: PathBuf,
    pub autopilot: bool,
    pub auto_level: bool,
    pub rng_seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            mode: ArenaMode::Solo,
            nickname: "Tank".to_string(),
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 7777,
            join_code: None,
            bot_count: spawn::INITIAL_BOTS,
            food_count: spawn::INITIAL_FOOD,
            connect_timeout_ms: net::CONNECT_TIMEOUT_MS,
            scores_path: PathBuf::from("scores.json"),
            autopilot: true,
            auto_level: true,
            rng_seed: None,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl ArenaConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(mode) = lookup("ARENA_MODE") {
            match mode.parse() {
                Ok(parsed) => config.mode = parsed,
                Err(e) => tracing::warn!("Invalid ARENA_MODE: {}, using default", e),
            }
        }

        if let Some(nickname) = lookup("NICKNAME") {
            let trimmed = nickname.trim();
            if trimmed.is_empty() {
                tracing::warn!("NICKNAME is empty, using default");
            } else {
                config.nickname = trimmed.chars().take(MAX_NICKNAME_LEN).collect();
            }
        }

        if let Some(addr) = lookup("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.port = parsed,
                Ok(_) => tracing::warn!("PORT must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid PORT '{}', using default", port),
            }
        }

        if let Some(code) = lookup("JOIN_CODE") {
            if !code.trim().is_empty() {
                config.join_code = Some(code.trim().to_string());
            }
        }

        if let Some(bots) = lookup("BOT_COUNT") {
            match bots.parse::<usize>() {
                Ok(parsed) if parsed <= 500 => config.bot_count = parsed,
                Ok(_) => tracing::warn!("BOT_COUNT must be 0-500, using default"),
                Err(_) => tracing::warn!("Invalid BOT_COUNT '{}', using default", bots),
            }
        }

        if let Some(food) = lookup("FOOD_COUNT") {
            match food.parse::<usize>() {
                Ok(parsed) if parsed <= 10_000 => config.food_count = parsed,
                Ok(_) => tracing::warn!("FOOD_COUNT must be 0-10000, using default"),
                Err(_) => tracing::warn!("Invalid FOOD_COUNT '{}', using default", food),
            }
        }

        if let Some(timeout) = lookup("CONNECT_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.connect_timeout_ms = parsed,
                Ok(_) => tracing::warn!("CONNECT_TIMEOUT_MS must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid CONNECT_TIMEOUT_MS '{}', using default", timeout),
            }
        }

        if let Some(path) = lookup("SCORES_PATH") {
            config.scores_path = PathBuf::from(path);
        }

        for (key, slot) in [
            ("AUTOPILOT", &mut config.autopilot),
            ("AUTO_LEVEL", &mut config.auto_level),
        ] {
            if let Some(value) = lookup(key) {
                match parse_flag(&value) {
                    Some(flag) => *slot = flag,
                    None => tracing::warn!("Invalid {} '{}', using default", key, value),
                }
            }
        }

        if let Some(seed) = lookup("RNG_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.rng_seed = Some(parsed);
            } else {
                tracing::warn!("Invalid RNG_SEED '{}', ignoring", seed);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.mode == ArenaMode::Host && self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.mode == ArenaMode::Client && self.join_code.is_none() {
            return Err("client mode requires JOIN_CODE".to_string());
        }
        if self.nickname.is_empty() {
            return Err("nickname cannot be empty".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be at least 1".to_string());
        }
        Ok(())
    }

    /// Socket address a host binds
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Simulation settings derived from this config
    pub fn game_loop(&self) -> GameLoopConfig {
        GameLoopConfig {
            food_count: self.food_count,
            bot_count: self.bot_count,
            seed: self.rng_seed,
            ..GameLoopConfig::default()
        }
    }
}
