mod sim;
mod tello;

pub use sim::{SimConfig, SimPose, SimVehicle};
pub use tello::{
    expect_ok, parse_battery, rc_command, TelloConfig, TelloLink, TelloState, TELLO_ADDR,
    TELLO_STATE_PORT,
};
