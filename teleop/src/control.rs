use crate::config::MAX_AXIS;
use crate::flight_state::FlightState;
use crate::intent::{HeldIntents, Intent};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityCommand {
    pub lateral: i16,
    pub longitudinal: i16,
    pub vertical: i16,
    pub yaw: i16,
}

impl VelocityCommand {
    pub const ZERO: VelocityCommand = VelocityCommand {
        lateral: 0,
        longitudinal: 0,
        vertical: 0,
        yaw: 0,
    };

    /// Builds a command, clamping every axis to the vehicle band.
    pub fn new(lateral: i16, longitudinal: i16, vertical: i16, yaw: i16) -> Self {
        VelocityCommand {
            lateral: Self::clamp(lateral),
            longitudinal: Self::clamp(longitudinal),
            vertical: Self::clamp(vertical),
            yaw: Self::clamp(yaw),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    fn clamp(value: i16) -> i16 {
        value.clamp(-MAX_AXIS, MAX_AXIS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Lateral,
    Longitudinal,
    Vertical,
    Yaw,
}

/// Axis and direction a movement intent drives.
fn axis_of(intent: Intent) -> Option<(Axis, i16)> {
    match intent {
        Intent::MoveUp => Some((Axis::Vertical, 1)),
        Intent::MoveDown => Some((Axis::Vertical, -1)),
        Intent::MoveLeft => Some((Axis::Lateral, -1)),
        Intent::MoveRight => Some((Axis::Lateral, 1)),
        Intent::MoveForward => Some((Axis::Longitudinal, 1)),
        Intent::MoveBackward => Some((Axis::Longitudinal, -1)),
        Intent::YawLeft => Some((Axis::Yaw, -1)),
        Intent::YawRight => Some((Axis::Yaw, 1)),
        Intent::TakeOff | Intent::Land | Intent::Quit => None,
    }
}

#[derive(Debug, Clone)]
pub struct CommandTranslator {
    speed: i16,
}

impl CommandTranslator {
    pub fn new(speed: i16) -> Self {
        CommandTranslator {
            speed: speed.clamp(0, MAX_AXIS),
        }
    }

    pub fn speed(&self) -> i16 {
        self.speed
    }

    /// Level-triggered: the result depends only on what is held right now.
    /// Held intents are applied oldest first, so when opposing keys are held
    /// the most recently pressed one owns the axis.
    pub fn translate(&self, state: FlightState, held: &HeldIntents) -> VelocityCommand {
        if state != FlightState::Airborne {
            return VelocityCommand::ZERO;
        }

        let mut command = VelocityCommand::ZERO;
        for (axis, sign) in held.iter().filter_map(axis_of) {
            let value = sign * self.speed;
            match axis {
                Axis::Lateral => command.lateral = value,
                Axis::Longitudinal => command.longitudinal = value,
                Axis::Vertical => command.vertical = value,
                Axis::Yaw => command.yaw = value,
            }
        }
        command
    }
}
