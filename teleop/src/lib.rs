//! Keyboard teleoperation core: flight state machine, intent-to-velocity
//! translation and the control loop tying a vehicle link to a display.

mod clock;
mod config;
mod control;
mod control_loop;
mod display;
mod error;
mod flight_state;
mod frame;
mod intent;
mod link;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::{TeleopConfig, MAX_AXIS};
pub use control::{CommandTranslator, VelocityCommand};
pub use control_loop::{ControlLoop, CycleOutcome, LoopStats, ShutdownReport};
pub use display::{Display, InputEvent};
pub use error::{ConfigError, ConnectionError, FrameError, LinkError, TeleopError};
pub use flight_state::{FlightState, FlightStateMachine, Transition};
pub use frame::{Frame, Rotation};
pub use intent::{HeldIntents, Intent, Key, KeyMap};
pub use link::VehicleLink;
