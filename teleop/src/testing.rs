//! In-memory collaborators for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::control::VelocityCommand;
use crate::display::{Display, InputEvent};
use crate::error::{ConnectionError, LinkError};
use crate::frame::Frame;
use crate::link::VehicleLink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    Connect,
    StartStream,
    StopStream,
    SendVelocity(VelocityCommand),
    TakeOff,
    Land,
    Battery,
}

#[derive(Debug)]
pub struct MockLink {
    pub calls: Vec<LinkCall>,
    pub frames: VecDeque<Frame>,
    pub battery: u8,
    pub fail_connect: bool,
    pub fail_take_off: bool,
    /// `take_off` lifts off but its reply never arrives.
    pub lose_take_off_reply: bool,
    /// Number of upcoming `land` calls that fail.
    pub fail_land: u32,
    /// Number of upcoming `send_velocity` calls that fail.
    pub fail_sends: u32,
}

impl MockLink {
    pub fn new() -> Self {
        MockLink {
            calls: Vec::new(),
            frames: VecDeque::new(),
            battery: 87,
            fail_connect: false,
            fail_take_off: false,
            lose_take_off_reply: false,
            fail_land: 0,
            fail_sends: 0,
        }
    }

    pub fn count(&self, call: &LinkCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn sent(&self) -> Vec<VelocityCommand> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LinkCall::SendVelocity(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    fn rejected(command: &str) -> LinkError {
        LinkError::Rejected {
            command: command.to_string(),
            reply: "error".to_string(),
        }
    }
}

impl VehicleLink for MockLink {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        self.calls.push(LinkCall::Connect);
        if self.fail_connect {
            return Err(ConnectionError::Unreachable {
                addr: "mock".to_string(),
                attempts: 1,
            });
        }
        Ok(())
    }

    fn start_stream(&mut self) -> Result<(), ConnectionError> {
        self.calls.push(LinkCall::StartStream);
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), LinkError> {
        self.calls.push(LinkCall::StopStream);
        Ok(())
    }

    fn latest_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), LinkError> {
        self.calls.push(LinkCall::SendVelocity(command));
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        Ok(())
    }

    fn take_off(&mut self) -> Result<(), LinkError> {
        self.calls.push(LinkCall::TakeOff);
        if self.fail_take_off {
            return Err(Self::rejected("takeoff"));
        }
        if self.lose_take_off_reply {
            return Err(LinkError::Timeout {
                command: "takeoff".to_string(),
            });
        }
        Ok(())
    }

    fn land(&mut self) -> Result<(), LinkError> {
        self.calls.push(LinkCall::Land);
        if self.fail_land > 0 {
            self.fail_land -= 1;
            return Err(Self::rejected("land"));
        }
        Ok(())
    }

    fn battery_percent(&mut self) -> Result<u8, LinkError> {
        self.calls.push(LinkCall::Battery);
        Ok(self.battery)
    }
}

/// Hands out one scripted batch of events per poll.
#[derive(Debug, Default)]
pub struct ScriptedDisplay {
    pub script: VecDeque<Vec<InputEvent>>,
    pub rendered: Vec<Frame>,
    pub closed: bool,
}

impl ScriptedDisplay {
    pub fn new(script: Vec<Vec<InputEvent>>) -> Self {
        ScriptedDisplay {
            script: script.into(),
            ..Default::default()
        }
    }
}

impl Display for ScriptedDisplay {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        self.script.pop_front().unwrap_or_default()
    }

    fn render(&mut self, frame: &Frame) {
        self.rendered.push(frame.clone());
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Clock whose time only moves when something sleeps.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            now: Cell::new(Instant::now()),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.now.set(self.now.get() + duration);
    }
}

pub fn solid_frame(value: u8) -> Frame {
    Frame::new(2, 2, vec![value; 12]).unwrap()
}
