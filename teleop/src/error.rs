use std::io;
use thiserror::Error;

/// The vehicle could not be reached before the control loop started.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Vehicle at {addr} did not answer after {attempts} attempts")]
    Unreachable { addr: String, attempts: u32 },

    #[error("Vehicle refused to start the video stream: {reply}")]
    StreamRefused { reply: String },

    #[error("Connection I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A command to an already connected vehicle failed.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Command `{command}` timed out")]
    Timeout { command: String },

    #[error("Command `{command}` rejected by vehicle: {reply}")]
    Rejected { command: String, reply: String },

    #[error("Unexpected reply to `{command}`: {reply}")]
    InvalidReply { command: String, reply: String },

    #[error("Vehicle link is not connected")]
    NotConnected,

    #[error("Link I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer holds {actual} bytes, {width}x{height} RGB needs {expected}")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Frame of {width}x{height} pixels is too large")]
    TooLarge { width: usize, height: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Speed {0} outside 1..=100")]
    InvalidSpeed(i16),

    #[error("Maximum frame rate must be positive")]
    InvalidFrameRate,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Fatal outcome of a teleoperation session.
#[derive(Error, Debug)]
pub enum TeleopError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The loop aborted on a link failure. `grounded` tells whether the
    /// vehicle is known to be on the ground after the abort landing.
    #[error("Vehicle link failed (grounded: {grounded}): {source}")]
    Link {
        #[source]
        source: LinkError,
        grounded: bool,
        battery_percent: Option<u8>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
