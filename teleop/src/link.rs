use crate::control::VelocityCommand;
use crate::error::{ConnectionError, LinkError};
use crate::frame::Frame;

/// Connection to the vehicle.
///
/// Implementations own the wire protocol and video decoding. Everything
/// except `connect`, `take_off` and `land` must return promptly; in
/// particular `latest_frame` never waits for video.
pub trait VehicleLink {
    fn connect(&mut self) -> Result<(), ConnectionError>;

    fn start_stream(&mut self) -> Result<(), ConnectionError>;

    fn stop_stream(&mut self) -> Result<(), LinkError>;

    /// Most recent frame since the previous call, if any.
    fn latest_frame(&mut self) -> Option<Frame>;

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), LinkError>;

    fn take_off(&mut self) -> Result<(), LinkError>;

    fn land(&mut self) -> Result<(), LinkError>;

    /// Remaining battery, 0..=100.
    fn battery_percent(&mut self) -> Result<u8, LinkError>;
}

impl<L: VehicleLink + ?Sized> VehicleLink for Box<L> {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        (**self).connect()
    }

    fn start_stream(&mut self) -> Result<(), ConnectionError> {
        (**self).start_stream()
    }

    fn stop_stream(&mut self) -> Result<(), LinkError> {
        (**self).stop_stream()
    }

    fn latest_frame(&mut self) -> Option<Frame> {
        (**self).latest_frame()
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), LinkError> {
        (**self).send_velocity(command)
    }

    fn take_off(&mut self) -> Result<(), LinkError> {
        (**self).take_off()
    }

    fn land(&mut self) -> Result<(), LinkError> {
        (**self).land()
    }

    fn battery_percent(&mut self) -> Result<u8, LinkError> {
        (**self).battery_percent()
    }
}
