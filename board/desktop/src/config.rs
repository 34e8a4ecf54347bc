//! Configuration loaded from environment variables

use std::str::FromStr;
use std::time::Duration;

use log::warn;
use teleop::TeleopConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Sim,
    Tello,
}

impl FromStr for LinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sim" => Ok(LinkKind::Sim),
            "tello" => Ok(LinkKind::Tello),
            other => Err(format!("unknown link `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Which vehicle to fly
    pub link: LinkKind,

    /// Tello command address
    pub tello_addr: String,

    /// Stick magnitude per held key (1..=100)
    pub speed: i16,

    /// Control cycles and rendered frames per second
    pub max_fps: u32,

    pub takeoff_settle_ms: u64,

    pub land_settle_ms: u64,

    pub window_width: f32,

    pub window_height: f32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            link: match lookup("TELEOP_LINK") {
                Some(value) => value.parse().unwrap_or_else(|e| {
                    warn!("TELEOP_LINK: {}, using the simulator", e);
                    LinkKind::Sim
                }),
                None => LinkKind::Sim,
            },

            tello_addr: lookup("TELLO_ADDR").unwrap_or_else(|| link::TELLO_ADDR.to_string()),

            speed: parse_var(&lookup, "TELEOP_SPEED").unwrap_or(50),

            max_fps: parse_var(&lookup, "TELEOP_MAX_FPS").unwrap_or(60),

            takeoff_settle_ms: parse_var(&lookup, "TELEOP_TAKEOFF_SETTLE_MS").unwrap_or(2000),

            land_settle_ms: parse_var(&lookup, "TELEOP_LAND_SETTLE_MS").unwrap_or(2000),

            window_width: parse_var(&lookup, "TELEOP_WINDOW_WIDTH").unwrap_or(600.0),

            window_height: parse_var(&lookup, "TELEOP_WINDOW_HEIGHT").unwrap_or(600.0),
        }
    }

    pub fn teleop(&self) -> TeleopConfig {
        TeleopConfig {
            speed: self.speed,
            max_fps: self.max_fps,
            takeoff_settle: Duration::from_millis(self.takeoff_settle_ms),
            land_settle: Duration::from_millis(self.land_settle_ms),
            ..TeleopConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.link, LinkKind::Sim);
        assert_eq!(config.tello_addr, "192.168.10.1:8889");
        assert_eq!(config.teleop(), TeleopConfig::default());
        assert_eq!(config.window_width, 600.0);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TELEOP_LINK", "Tello"),
            ("TELEOP_SPEED", "80"),
            ("TELEOP_MAX_FPS", "30"),
            ("TELEOP_LAND_SETTLE_MS", "500"),
        ]);
        assert_eq!(config.link, LinkKind::Tello);
        let teleop = config.teleop();
        assert_eq!(teleop.speed, 80);
        assert_eq!(teleop.max_fps, 30);
        assert_eq!(teleop.land_settle, Duration::from_millis(500));
    }

    #[test]
    fn test_garbage_falls_back() {
        let config = config_from(&[("TELEOP_LINK", "blimp"), ("TELEOP_SPEED", "fast")]);
        assert_eq!(config.link, LinkKind::Sim);
        assert_eq!(config.speed, 50);
    }
}
