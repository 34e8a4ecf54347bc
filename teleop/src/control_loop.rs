use std::collections::HashSet;

use log::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TeleopConfig;
use crate::control::{CommandTranslator, VelocityCommand};
use crate::display::{Display, InputEvent};
use crate::error::{ConfigError, ConnectionError, LinkError, TeleopError};
use crate::flight_state::{FlightState, FlightStateMachine};
use crate::frame::Frame;
use crate::intent::{HeldIntents, Intent, Key, KeyMap};
use crate::link::VehicleLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub commands_sent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The vehicle was airborne when the loop ended.
    pub landing_attempted: bool,
    /// The vehicle is known to be on the ground.
    pub grounded: bool,
    pub battery_percent: Option<u8>,
    pub stats: LoopStats,
}

pub struct ControlLoop<L, D, C = SystemClock> {
    link: L,
    display: D,
    clock: C,
    config: TeleopConfig,
    key_map: KeyMap,
    flight: FlightStateMachine,
    translator: CommandTranslator,
    held: HeldIntents,
    pressed_keys: HashSet<Key>,
    frame: Option<Frame>,
    quit_requested: bool,
    stats: LoopStats,
}

impl<L: VehicleLink, D: Display> ControlLoop<L, D, SystemClock> {
    pub fn new(link: L, display: D, config: TeleopConfig) -> Result<Self, ConfigError> {
        Self::with_clock(link, display, config, SystemClock)
    }
}

impl<L: VehicleLink, D: Display, C: Clock> ControlLoop<L, D, C> {
    pub fn with_clock(
        link: L,
        display: D,
        config: TeleopConfig,
        clock: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ControlLoop {
            link,
            display,
            clock,
            flight: FlightStateMachine::from_config(&config),
            translator: CommandTranslator::new(config.speed),
            config,
            key_map: KeyMap::default(),
            held: HeldIntents::new(),
            pressed_keys: HashSet::new(),
            frame: None,
            quit_requested: false,
            stats: LoopStats::default(),
        })
    }

    pub fn with_key_map(mut self, key_map: KeyMap) -> Self {
        self.key_map = key_map;
        self
    }

    pub fn flight_state(&self) -> FlightState {
        self.flight.state()
    }

    pub fn held_intents(&self) -> &HeldIntents {
        &self.held
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Connects to the vehicle and starts its video stream. Must succeed
    /// before the first cycle.
    pub fn start(&mut self) -> Result<(), ConnectionError> {
        self.link.connect()?;
        self.link.start_stream()?;
        info!("Vehicle connected, video stream on");
        Ok(())
    }

    /// Cycles at the configured rate until the operator quits, then lands
    /// if needed and shuts the stream down. A link failure aborts the loop
    /// after a best-effort landing.
    pub fn run(&mut self) -> Result<ShutdownReport, TeleopError> {
        let period = self.config.cycle_period();
        info!(
            "Control loop running at up to {} Hz, speed {}",
            self.config.max_fps,
            self.translator.speed()
        );

        loop {
            let started = self.clock.now();
            match self.cycle() {
                Ok(CycleOutcome::Continue) => {}
                Ok(CycleOutcome::Quit) => break,
                Err(e) => return Err(self.abort(e)),
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed < period {
                self.clock.sleep(period - elapsed);
            }
        }

        Ok(self.shutdown())
    }

    /// One control cycle: events, frame, transitions, translation, send,
    /// render. Returns `Quit` as soon as a quit was observed.
    pub fn cycle(&mut self) -> Result<CycleOutcome, LinkError> {
        self.stats.cycles += 1;

        let edges = self.drain_events();
        if self.quit_requested {
            return Ok(CycleOutcome::Quit);
        }

        if let Some(frame) = self.link.latest_frame() {
            self.frame = Some(frame);
        }

        for intent in edges {
            match intent {
                Intent::TakeOff => {
                    self.flight.take_off(&mut self.link, &self.clock)?;
                }
                Intent::Land => {
                    self.flight.land(&mut self.link, &self.clock)?;
                }
                _ => {}
            }
        }

        let command = if self.flight.accepts_commands(self.clock.now()) {
            self.translator.translate(self.flight.state(), &self.held)
        } else {
            VelocityCommand::ZERO
        };

        if self.flight.state() == FlightState::Airborne {
            self.link.send_velocity(command)?;
            self.stats.commands_sent += 1;
            debug!("Sent {:?}", command);
        }

        if let Some(frame) = &self.frame {
            self.display.render(frame);
        }

        Ok(CycleOutcome::Continue)
    }

    /// Lands if airborne, stops the stream and reads the battery. Runs to
    /// completion regardless of failures along the way.
    pub fn shutdown(&mut self) -> ShutdownReport {
        info!("Shutting down");
        let landing_attempted = self.flight.state() == FlightState::Airborne;
        let grounded = self.land_for_exit();

        if let Err(e) = self.link.stop_stream() {
            warn!("Failed to stop video stream: {}", e);
        }
        let battery_percent = self.read_battery();

        self.display.close();
        info!(
            "Control loop stopped. Cycles: {}, commands sent: {}",
            self.stats.cycles, self.stats.commands_sent
        );

        ShutdownReport {
            landing_attempted,
            grounded,
            battery_percent,
            stats: self.stats,
        }
    }

    /// Key-down adds an intent, key-up removes it. An intent bound to
    /// several keys stays held until the last of them is released. Returns
    /// the takeoff and land press edges in arrival order.
    fn drain_events(&mut self) -> Vec<Intent> {
        let mut edges = Vec::new();
        for event in self.display.poll_events() {
            match event {
                InputEvent::Quit => self.quit_requested = true,
                InputEvent::KeyDown(key) => match self.key_map.intent(key) {
                    Some(Intent::Quit) => self.quit_requested = true,
                    Some(intent) => {
                        self.pressed_keys.insert(key);
                        if self.held.press(intent) && !intent.is_movement() {
                            edges.push(intent);
                        }
                    }
                    None => {}
                },
                InputEvent::KeyUp(key) => {
                    self.pressed_keys.remove(&key);
                    let Some(intent) = self.key_map.intent(key) else {
                        continue;
                    };
                    let still_held = self
                        .pressed_keys
                        .iter()
                        .any(|&other| self.key_map.intent(other) == Some(intent));
                    if !still_held {
                        self.held.release(intent);
                    }
                }
            }
        }
        edges
    }

    fn read_battery(&mut self) -> Option<u8> {
        match self.link.battery_percent() {
            Ok(percent) => Some(percent),
            Err(e) => {
                warn!("Failed to read battery: {}", e);
                None
            }
        }
    }

    fn abort(&mut self, cause: LinkError) -> TeleopError {
        error!("Vehicle link failed: {}", cause);
        let grounded = self.land_for_exit();

        if let Err(e) = self.link.stop_stream() {
            warn!("Failed to stop video stream: {}", e);
        }
        let battery_percent = self.read_battery();
        self.display.close();

        TeleopError::Link {
            source: cause,
            grounded,
            battery_percent,
        }
    }

    /// Lands with a bounded number of retries. Returns whether the vehicle
    /// ended up grounded.
    fn land_for_exit(&mut self) -> bool {
        if self.flight.state() != FlightState::Airborne {
            return true;
        }

        let attempts = self.config.land_retries + 1;
        for attempt in 1..=attempts {
            info!("Landing before exit (attempt {}/{})", attempt, attempts);
            match self.flight.land(&mut self.link, &self.clock) {
                Ok(_) => return true,
                Err(e) => warn!("Land attempt {} failed: {}", attempt, e),
            }
        }
        error!("Vehicle may still be airborne");
        false
    }
}
