use std::io;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use teleop::{
    Clock, ConnectionError, Frame, LinkError, Rotation, SystemClock, VehicleLink, VelocityCommand,
    MAX_AXIS,
};

const HOVER_ALTITUDE: f32 = 0.8;
const MIN_TAKEOFF_BATTERY: f32 = 10.0;

const SKY: [u8; 3] = [110, 160, 230];
const GROUND: [u8; 3] = [70, 120, 60];
const MARKER: [u8; 3] = [240, 80, 40];

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub camera_fps: u32,
    /// Upright image size; frames leave the camera turned a quarter left.
    pub frame_width: usize,
    pub frame_height: usize,
    /// Speed at full stick, m/s.
    pub max_speed: f32,
    /// Yaw rate at full stick, deg/s.
    pub max_yaw_rate: f32,
    /// Battery percent per second of flight.
    pub battery_drain: f32,
    /// Fail every velocity command after this many succeeded.
    pub fail_after_commands: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            camera_fps: 30,
            frame_width: 320,
            frame_height: 240,
            max_speed: 1.0,
            max_yaw_rate: 90.0,
            battery_drain: 0.1,
            fail_after_commands: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SimPose {
    pub x: f32,
    pub y: f32,
    pub altitude: f32,
    /// Degrees, clockwise from the starting heading.
    pub heading: f32,
}

/// In-process vehicle with a synthetic camera.
pub struct SimVehicle<C = SystemClock> {
    config: SimConfig,
    clock: C,
    connected: bool,
    streaming: bool,
    flying: bool,
    pose: SimPose,
    command: VelocityCommand,
    battery: f32,
    commands_sent: u64,
    last_update: Instant,
    last_frame_at: Option<Instant>,
}

impl SimVehicle<SystemClock> {
    pub fn new(config: SimConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SimVehicle<C> {
    pub fn with_clock(config: SimConfig, clock: C) -> Self {
        let last_update = clock.now();
        SimVehicle {
            config,
            clock,
            connected: false,
            streaming: false,
            flying: false,
            pose: SimPose::default(),
            command: VelocityCommand::ZERO,
            battery: 100.0,
            commands_sent: 0,
            last_update,
            last_frame_at: None,
        }
    }

    pub fn pose(&self) -> SimPose {
        self.pose
    }

    pub fn is_flying(&self) -> bool {
        self.flying
    }

    /// Integrates the last command up to the current time.
    fn advance(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        if !self.flying || dt == 0.0 {
            return;
        }

        let scale = |axis: i16| axis as f32 / MAX_AXIS as f32;
        self.pose.heading =
            (self.pose.heading + scale(self.command.yaw) * self.config.max_yaw_rate * dt)
                .rem_euclid(360.0);

        let (sin, cos) = self.pose.heading.to_radians().sin_cos();
        let forward = scale(self.command.longitudinal) * self.config.max_speed * dt;
        let right = scale(self.command.lateral) * self.config.max_speed * dt;
        self.pose.x += forward * sin + right * cos;
        self.pose.y += forward * cos - right * sin;
        self.pose.altitude = (self.pose.altitude
            + scale(self.command.vertical) * self.config.max_speed * dt)
            .max(0.2);

        self.battery = (self.battery - self.config.battery_drain * dt).max(0.0);
    }

    fn camera_due(&self, now: Instant) -> bool {
        let period = Duration::from_secs(1) / self.config.camera_fps.max(1);
        self.last_frame_at
            .map_or(true, |last| now.saturating_duration_since(last) >= period)
    }

    fn render_view(&self) -> Option<Frame> {
        let (width, height) = (self.config.frame_width, self.config.frame_height);
        let tilt = ((self.pose.altitude - HOVER_ALTITUDE) * height as f32 / 4.0) as isize;
        let horizon = (height as isize / 2 + tilt).clamp(0, height as isize) as usize;
        let marker = ((self.pose.heading / 360.0) * width as f32) as usize % width.max(1);

        let mut pixels = Vec::with_capacity(width * height * Frame::BYTES_PER_PIXEL);
        for y in 0..height {
            for x in 0..width {
                let color = if x.abs_diff(marker) <= 1 {
                    MARKER
                } else if y < horizon {
                    SKY
                } else {
                    GROUND
                };
                pixels.extend_from_slice(&color);
            }
        }

        match Frame::new(width, height, pixels) {
            Ok(frame) => Some(frame.rotated(Rotation::Deg90)),
            Err(e) => {
                warn!("Simulated camera produced a bad frame: {}", e);
                None
            }
        }
    }

    fn rejected(command: &str, reply: &str) -> LinkError {
        LinkError::Rejected {
            command: command.to_string(),
            reply: reply.to_string(),
        }
    }
}

impl<C: Clock> VehicleLink for SimVehicle<C> {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        self.connected = true;
        self.last_update = self.clock.now();
        info!("Simulated vehicle connected, battery {:.0}%", self.battery);
        Ok(())
    }

    fn start_stream(&mut self) -> Result<(), ConnectionError> {
        if !self.connected {
            return Err(ConnectionError::StreamRefused {
                reply: "not connected".to_string(),
            });
        }
        self.streaming = true;
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.streaming = false;
        Ok(())
    }

    fn latest_frame(&mut self) -> Option<Frame> {
        let now = self.clock.now();
        if !self.streaming || !self.camera_due(now) {
            return None;
        }
        self.advance();
        self.last_frame_at = Some(now);
        self.render_view()
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        if let Some(limit) = self.config.fail_after_commands {
            if self.commands_sent >= limit {
                return Err(LinkError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "simulated link drop",
                )));
            }
        }
        self.advance();
        self.commands_sent += 1;
        // The vehicle ignores stick input on the ground.
        if self.flying {
            self.command = command;
        }
        debug!("Sim pose {:?}", self.pose);
        Ok(())
    }

    fn take_off(&mut self) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.advance();
        if self.flying {
            return Err(Self::rejected("takeoff", "error Already flying"));
        }
        if self.battery < MIN_TAKEOFF_BATTERY {
            return Err(Self::rejected("takeoff", "error Low battery"));
        }
        self.flying = true;
        self.command = VelocityCommand::ZERO;
        self.pose.altitude = HOVER_ALTITUDE;
        info!("Simulated takeoff");
        Ok(())
    }

    fn land(&mut self) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.advance();
        if !self.flying {
            return Err(Self::rejected("land", "error Not in flight"));
        }
        self.flying = false;
        self.command = VelocityCommand::ZERO;
        self.pose.altitude = 0.0;
        info!("Simulated landing at ({:.1}, {:.1})", self.pose.x, self.pose.y);
        Ok(())
    }

    fn battery_percent(&mut self) -> Result<u8, LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.advance();
        Ok(self.battery.round().clamp(0.0, 100.0) as u8)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Clock moved by hand.
    struct StepClock {
        now: Cell<Instant>,
    }

    impl StepClock {
        fn new() -> Self {
            StepClock {
                now: Cell::new(Instant::now()),
            }
        }
    }

    impl Clock for &StepClock {
        fn now(&self) -> Instant {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
        }
    }

    fn connected(clock: &StepClock, config: SimConfig) -> SimVehicle<&StepClock> {
        let mut sim = SimVehicle::with_clock(config, clock);
        sim.connect().unwrap();
        sim.start_stream().unwrap();
        sim
    }

    #[test]
    fn test_take_off_and_land() {
        let clock = StepClock::new();
        let mut sim = connected(&clock, SimConfig::default());

        assert!(sim.land().is_err(), "Landing on the ground is rejected");
        sim.take_off().unwrap();
        assert!(sim.is_flying());
        assert_eq!(sim.pose().altitude, HOVER_ALTITUDE);
        assert!(sim.take_off().is_err(), "Second takeoff is rejected");
        sim.land().unwrap();
        assert!(!sim.is_flying());
    }

    #[test]
    fn test_forward_command_moves_north() {
        let clock = StepClock::new();
        let mut sim = connected(&clock, SimConfig::default());
        sim.take_off().unwrap();

        sim.send_velocity(VelocityCommand::new(0, 100, 0, 0)).unwrap();
        (&clock).sleep(Duration::from_secs(2));
        sim.send_velocity(VelocityCommand::ZERO).unwrap();

        let pose = sim.pose();
        assert!((pose.y - 2.0).abs() < 1e-3, "Expected 2 m forward, got {:?}", pose);
        assert!(pose.x.abs() < 1e-3);
    }

    #[test]
    fn test_yaw_wraps_heading() {
        let clock = StepClock::new();
        let mut sim = connected(&clock, SimConfig::default());
        sim.take_off().unwrap();

        sim.send_velocity(VelocityCommand::new(0, 0, 0, -100)).unwrap();
        (&clock).sleep(Duration::from_secs(1));
        sim.send_velocity(VelocityCommand::ZERO).unwrap();
        assert!((sim.pose().heading - 270.0).abs() < 1e-3);
    }

    #[test]
    fn test_ground_ignores_velocity() {
        let clock = StepClock::new();
        let mut sim = connected(&clock, SimConfig::default());
        sim.send_velocity(VelocityCommand::new(100, 100, 100, 100)).unwrap();
        (&clock).sleep(Duration::from_secs(1));
        sim.send_velocity(VelocityCommand::ZERO).unwrap();
        assert_eq!(sim.pose(), SimPose::default());
    }

    #[test]
    fn test_camera_rate_and_orientation() {
        let clock = StepClock::new();
        let mut sim = connected(&clock, SimConfig::default());

        let frame = sim.latest_frame().expect("First poll yields a frame");
        assert_eq!((frame.width(), frame.height()), (240, 320), "Camera frames are turned");
        assert!(sim.latest_frame().is_none(), "No new frame before the next camera tick");

        (&clock).sleep(Duration::from_millis(40));
        assert!(sim.latest_frame().is_some());
    }

    #[test]
    fn test_no_frames_without_stream() {
        let clock = StepClock::new();
        let mut sim = SimVehicle::with_clock(SimConfig::default(), &clock);
        sim.connect().unwrap();
        assert!(sim.latest_frame().is_none());
    }

    #[test]
    fn test_battery_drains_in_flight() {
        let clock = StepClock::new();
        let config = SimConfig {
            battery_drain: 1.0,
            ..SimConfig::default()
        };
        let mut sim = connected(&clock, config);
        sim.take_off().unwrap();
        (&clock).sleep(Duration::from_secs(10));
        assert_eq!(sim.battery_percent().unwrap(), 90);
    }

    #[test]
    fn test_injected_failure() {
        let clock = StepClock::new();
        let config = SimConfig {
            fail_after_commands: Some(2),
            ..SimConfig::default()
        };
        let mut sim = connected(&clock, config);
        sim.take_off().unwrap();
        assert!(sim.send_velocity(VelocityCommand::ZERO).is_ok());
        assert!(sim.send_velocity(VelocityCommand::ZERO).is_ok());
        assert!(sim.send_velocity(VelocityCommand::ZERO).is_err());
        assert!(sim.land().is_ok(), "Landing still works after the link drop");
    }

    #[test]
    fn test_requires_connection() {
        let mut sim = SimVehicle::new(SimConfig::default());
        assert!(sim.start_stream().is_err());
        assert!(matches!(sim.take_off(), Err(LinkError::NotConnected)));
    }
}
