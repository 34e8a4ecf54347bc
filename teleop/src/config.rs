use std::time::Duration;

use crate::error::ConfigError;

/// Hard limit of every velocity axis accepted by the vehicle.
pub const MAX_AXIS: i16 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct TeleopConfig {
    /// Magnitude applied to an axis while its key is held.
    pub speed: i16,
    /// Upper bound of control cycles (and rendered frames) per second.
    pub max_fps: u32,
    /// Pause after takeoff before velocity commands are honoured.
    pub takeoff_settle: Duration,
    /// Pause between the stop command and the land request.
    pub land_settle: Duration,
    /// Extra land attempts during shutdown or abort.
    pub land_retries: u32,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            speed: 50,
            max_fps: 60,
            takeoff_settle: Duration::from_secs(2),
            land_settle: Duration::from_secs(2),
            land_retries: 1,
        }
    }
}

impl TeleopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_AXIS).contains(&self.speed) {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if self.max_fps == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(1) / self.max_fps.max(1)
    }
}
