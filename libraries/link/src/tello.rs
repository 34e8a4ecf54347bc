use std::{
    collections::HashMap,
    io,
    net::{SocketAddr, UdpSocket},
    sync::{mpsc, Arc, RwLock},
    thread::JoinHandle,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use teleop::{ConnectionError, Frame, LinkError, VehicleLink, VelocityCommand};

pub const TELLO_ADDR: &str = "192.168.10.1:8889";
pub const TELLO_STATE_PORT: u16 = 8890;

const CONNECT_ATTEMPTS: u32 = 3;
const MAX_REPLY: usize = 1518;

#[derive(Debug, Clone)]
pub struct TelloConfig {
    pub addr: SocketAddr,
    /// Wait for replies to quick commands (`command`, `battery?`, ...).
    pub command_timeout: Duration,
    /// Wait for `takeoff` and `land`, which answer once the motion is done.
    pub motion_timeout: Duration,
    /// Port of the telemetry broadcast; `None` disables the listener.
    pub state_port: Option<u16>,
}

impl TelloConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            command_timeout: Duration::from_secs(3),
            motion_timeout: Duration::from_secs(20),
            state_port: Some(TELLO_STATE_PORT),
        }
    }
}

/// Latest telemetry broadcast by the vehicle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TelloState {
    pub battery: Option<u8>,
    pub height_cm: Option<i32>,
    pub flight_time_s: Option<i32>,
    pub received_at: Option<Instant>,
}

impl TelloState {
    /// Parses a `key:value;key:value;...` telemetry datagram.
    pub fn parse(datagram: &str) -> HashMap<&str, &str> {
        datagram
            .trim()
            .split(';')
            .filter_map(|field| field.split_once(':'))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect()
    }

    fn update(&mut self, datagram: &str) {
        let fields = Self::parse(datagram);
        if let Some(bat) = fields.get("bat").and_then(|v| v.parse().ok()) {
            self.battery = Some(bat);
        }
        if let Some(h) = fields.get("h").and_then(|v| v.parse().ok()) {
            self.height_cm = Some(h);
        }
        if let Some(time) = fields.get("time").and_then(|v| v.parse().ok()) {
            self.flight_time_s = Some(time);
        }
        self.received_at = Some(Instant::now());
    }
}

/// `rc a b c d`: lateral, longitudinal, vertical, yaw.
pub fn rc_command(command: VelocityCommand) -> String {
    format!(
        "rc {} {} {} {}",
        command.lateral, command.longitudinal, command.vertical, command.yaw
    )
}

/// Accepts `ok`, everything else is a rejection.
pub fn expect_ok(command: &str, reply: &str) -> Result<(), LinkError> {
    if reply.trim().eq_ignore_ascii_case("ok") {
        Ok(())
    } else {
        Err(LinkError::Rejected {
            command: command.to_string(),
            reply: reply.trim().to_string(),
        })
    }
}

pub fn parse_battery(reply: &str) -> Result<u8, LinkError> {
    reply
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|percent| *percent <= 100)
        .ok_or_else(|| LinkError::InvalidReply {
            command: "battery?".to_string(),
            reply: reply.trim().to_string(),
        })
}

enum StateCommand {
    Stop,
}

struct StateWorker;

impl StateWorker {
    fn run(
        socket: UdpSocket,
        state: Arc<RwLock<TelloState>>,
        to_worker_rx: mpsc::Receiver<StateCommand>,
    ) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let mut buf = [0u8; MAX_REPLY];
            loop {
                match to_worker_rx.try_recv() {
                    Ok(StateCommand::Stop) | Err(mpsc::TryRecvError::Disconnected) => return,
                    Err(mpsc::TryRecvError::Empty) => {}
                }

                match socket.recv_from(&mut buf) {
                    Ok((len, _)) => {
                        let datagram = String::from_utf8_lossy(&buf[..len]);
                        if let Ok(mut state) = state.write() {
                            state.update(&datagram);
                        }
                    }
                    Err(e)
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::TimedOut => {}
                    Err(e) => {
                        warn!("Telemetry socket error: {}", e);
                        std::thread::sleep(Duration::from_secs(1));
                    }
                }
            }
        })
    }
}

/// Tello SDK text protocol over UDP.
///
/// Video arrives as a raw H.264 stream on its own port; decoding it is not
/// done here, so `latest_frame` never yields a frame.
pub struct TelloLink {
    config: TelloConfig,
    socket: Option<UdpSocket>,
    state: Arc<RwLock<TelloState>>,
    to_worker_tx: Option<mpsc::Sender<StateCommand>>,
    worker_thread: Option<JoinHandle<()>>,
}

impl TelloLink {
    pub fn new(config: TelloConfig) -> Self {
        Self {
            config,
            socket: None,
            state: Arc::new(RwLock::new(TelloState::default())),
            to_worker_tx: None,
            worker_thread: None,
        }
    }

    pub fn state(&self) -> TelloState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    fn socket(&self) -> Result<&UdpSocket, LinkError> {
        self.socket.as_ref().ok_or(LinkError::NotConnected)
    }

    /// Sends a command and waits for the vehicle's reply.
    fn send_command(&self, command: &str, timeout: Duration) -> Result<String, LinkError> {
        let socket = self.socket()?;
        Self::drain_stale_replies(socket)?;

        debug!("> {}", command);
        socket.send_to(command.as_bytes(), self.config.addr)?;

        socket.set_read_timeout(Some(timeout))?;
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; MAX_REPLY];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((len, from)) if from.ip() == self.config.addr.ip() => {
                    let reply = String::from_utf8_lossy(&buf[..len]).trim().to_string();
                    debug!("< {}", reply);
                    return Ok(reply);
                }
                Ok((_, from)) => debug!("Dropping datagram from {}", from),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Err(LinkError::Timeout {
                        command: command.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                return Err(LinkError::Timeout {
                    command: command.to_string(),
                });
            }
        }
    }

    /// Replies to earlier commands that timed out may still arrive.
    fn drain_stale_replies(socket: &UdpSocket) -> Result<(), LinkError> {
        socket.set_nonblocking(true)?;
        let mut buf = [0u8; MAX_REPLY];
        while let Ok((len, _)) = socket.recv_from(&mut buf) {
            debug!("Discarding stale reply: {}", String::from_utf8_lossy(&buf[..len]));
        }
        socket.set_nonblocking(false)?;
        Ok(())
    }

    fn command_ok(&self, command: &str, timeout: Duration) -> Result<(), LinkError> {
        let reply = self.send_command(command, timeout)?;
        expect_ok(command, &reply)
    }

    fn start_state_listener(&mut self) {
        let Some(port) = self.config.state_port else {
            return;
        };
        let socket = match UdpSocket::bind(("0.0.0.0", port)) {
            Ok(socket) => socket,
            Err(e) => {
                warn!("Telemetry listener disabled, cannot bind port {}: {}", port, e);
                return;
            }
        };
        if let Err(e) = socket.set_read_timeout(Some(Duration::from_millis(200))) {
            warn!("Telemetry listener disabled: {}", e);
            return;
        }

        let (to_worker_tx, to_worker_rx) = mpsc::channel();
        self.worker_thread = Some(StateWorker::run(socket, self.state.clone(), to_worker_rx));
        self.to_worker_tx = Some(to_worker_tx);
    }

    fn stop_state_listener(&mut self) {
        if let Some(tx) = self.to_worker_tx.take() {
            let _ = tx.send(StateCommand::Stop);
        }
        if let Some(handle) = self.worker_thread.take() {
            if handle.join().is_err() {
                warn!("Telemetry listener panicked");
            }
        }
    }
}

impl VehicleLink for TelloLink {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        self.socket = Some(UdpSocket::bind(("0.0.0.0", 0))?);

        for attempt in 1..=CONNECT_ATTEMPTS {
            match self.command_ok("command", self.config.command_timeout) {
                Ok(()) => {
                    info!("Tello at {} entered SDK mode", self.config.addr);
                    self.start_state_listener();
                    return Ok(());
                }
                Err(e) => warn!("Connect attempt {}/{} failed: {}", attempt, CONNECT_ATTEMPTS, e),
            }
        }

        self.socket = None;
        Err(ConnectionError::Unreachable {
            addr: self.config.addr.to_string(),
            attempts: CONNECT_ATTEMPTS,
        })
    }

    fn start_stream(&mut self) -> Result<(), ConnectionError> {
        match self.command_ok("streamon", self.config.command_timeout) {
            Ok(()) => Ok(()),
            Err(LinkError::Io(e)) => Err(ConnectionError::Io(e)),
            Err(e) => Err(ConnectionError::StreamRefused {
                reply: e.to_string(),
            }),
        }
    }

    fn stop_stream(&mut self) -> Result<(), LinkError> {
        self.command_ok("streamoff", self.config.command_timeout)
    }

    fn latest_frame(&mut self) -> Option<Frame> {
        None
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> Result<(), LinkError> {
        // rc commands are never acknowledged
        let socket = self.socket()?;
        socket.send_to(rc_command(command).as_bytes(), self.config.addr)?;
        Ok(())
    }

    fn take_off(&mut self) -> Result<(), LinkError> {
        self.command_ok("takeoff", self.config.motion_timeout)
    }

    fn land(&mut self) -> Result<(), LinkError> {
        self.command_ok("land", self.config.motion_timeout)
    }

    fn battery_percent(&mut self) -> Result<u8, LinkError> {
        match self.send_command("battery?", self.config.command_timeout) {
            Ok(reply) => parse_battery(&reply),
            Err(LinkError::Timeout { command }) => {
                let state = self.state();
                match state.battery {
                    Some(percent) => {
                        warn!("`{}` timed out, using telemetry battery", command);
                        Ok(percent)
                    }
                    None => Err(LinkError::Timeout { command }),
                }
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for TelloLink {
    fn drop(&mut self) {
        self.stop_state_listener();
    }
}
