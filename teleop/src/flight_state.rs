use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::TeleopConfig;
use crate::control::VelocityCommand;
use crate::error::LinkError;
use crate::link::VehicleLink;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    #[default]
    Grounded,
    Airborne,
    /// Between the stop command and a confirmed land request.
    Landing,
}

/// What a transition request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    TookOff,
    Landed,
    Ignored,
}

#[derive(Debug)]
pub struct FlightStateMachine {
    state: FlightState,
    takeoff_settle: Duration,
    land_settle: Duration,
    settle_until: Option<Instant>,
}

impl FlightStateMachine {
    pub fn new(takeoff_settle: Duration, land_settle: Duration) -> Self {
        FlightStateMachine {
            state: FlightState::Grounded,
            takeoff_settle,
            land_settle,
            settle_until: None,
        }
    }

    pub fn from_config(config: &TeleopConfig) -> Self {
        Self::new(config.takeoff_settle, config.land_settle)
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.settle_until.map_or(true, |until| now >= until)
    }

    /// Velocity commands are only honoured once airborne and settled.
    pub fn accepts_commands(&self, now: Instant) -> bool {
        self.state == FlightState::Airborne && self.is_settled(now)
    }

    /// Grounded -> Airborne. Blocks for the takeoff settle delay.
    ///
    /// Only a refusal from the vehicle keeps the machine Grounded. Any other
    /// failure means the vehicle may have lifted off with its reply lost, so
    /// the machine moves to Airborne and the error is returned for the
    /// caller to land.
    pub fn take_off<L, C>(&mut self, link: &mut L, clock: &C) -> Result<Transition, LinkError>
    where
        L: VehicleLink + ?Sized,
        C: Clock + ?Sized,
    {
        if self.state != FlightState::Grounded {
            debug!("Ignoring takeoff while {:?}", self.state);
            return Ok(Transition::Ignored);
        }

        match link.take_off() {
            Ok(()) => {}
            Err(e @ (LinkError::Rejected { .. } | LinkError::NotConnected)) => return Err(e),
            Err(e) => {
                warn!("Takeoff outcome unknown, treating vehicle as airborne: {}", e);
                self.state = FlightState::Airborne;
                return Err(e);
            }
        }
        self.state = FlightState::Airborne;
        self.settle_until = Some(clock.now() + self.takeoff_settle);
        info!("Airborne, settling for {:?}", self.takeoff_settle);
        self.wait_settled(clock);
        Ok(Transition::TookOff)
    }

    /// Airborne -> Landing -> Grounded. Stops the vehicle, waits the land
    /// settle delay, then requests the landing. A failed land request puts
    /// the machine back to Airborne so the landing can be retried.
    pub fn land<L, C>(&mut self, link: &mut L, clock: &C) -> Result<Transition, LinkError>
    where
        L: VehicleLink + ?Sized,
        C: Clock + ?Sized,
    {
        if self.state != FlightState::Airborne {
            debug!("Ignoring land while {:?}", self.state);
            return Ok(Transition::Ignored);
        }
        self.wait_settled(clock);

        self.state = FlightState::Landing;
        if let Err(e) = link.send_velocity(VelocityCommand::ZERO) {
            warn!("Stop command before landing failed: {}", e);
        }
        self.settle_until = Some(clock.now() + self.land_settle);
        self.wait_settled(clock);

        match link.land() {
            Ok(()) => {
                self.state = FlightState::Grounded;
                self.settle_until = None;
                info!("Landed");
                Ok(Transition::Landed)
            }
            Err(e) => {
                self.state = FlightState::Airborne;
                Err(e)
            }
        }
    }

    fn wait_settled<C: Clock + ?Sized>(&self, clock: &C) {
        if let Some(until) = self.settle_until {
            let remaining = until.saturating_duration_since(clock.now());
            if !remaining.is_zero() {
                clock.sleep(remaining);
            }
        }
    }
}
