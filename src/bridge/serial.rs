//! Serial worker thread: reads frame lines, forwards decoded frames and
//! writes motor commands back to the firmware.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use serialport::{DataBits, FlowControl, Parity, StopBits};
use spin_sleep::SpinSleeper;
use tokio::sync::mpsc::{Sender, error::TrySendError};
use tracing::{debug, error, info, warn};

use scout_navigation::MotorCommand;

use crate::blackboard::{Blackboard, LinkState, set_link};
use crate::bridge::error::{BridgeError, Result};
use crate::bridge::frame::{LineBuffer, RangingFrame, decode_frame};
use crate::config::HardwareSettings;

const READ_CHUNK: usize = 1024;
/// Spin for the last 100 µs of each idle sleep.
const SPIN_ACCURACY_NS: u32 = 100_000;
/// Granularity of the reconnect backoff so a stop request is noticed quickly.
const BACKOFF_SLICE: Duration = Duration::from_millis(20);

/// Byte link to the scout firmware.
pub trait SerialLink: Send {
    /// Reads available bytes; a read timeout returns `Ok(0)`.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    fn write_all(&mut self, data: &[u8]) -> Result<()>;
}

/// Opens links; called again after every failure.
pub trait Connector: Send {
    fn connect(&mut self) -> Result<Box<dyn SerialLink>>;
}

/// 8N1 serial port without flow control.
pub struct SerialPortLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink for SerialPortLink {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }
}

pub struct SerialPortConnector {
    path: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialPortConnector {
    pub fn new(settings: &HardwareSettings) -> Self {
        Self {
            path: settings.port.clone(),
            baud_rate: settings.baud_rate,
            timeout: Duration::from_millis(settings.read_timeout_ms),
        }
    }
}

impl Connector for SerialPortConnector {
    fn connect(&mut self) -> Result<Box<dyn SerialLink>> {
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;
        info!(path = %self.path, baud = self.baud_rate, "Opened serial port");
        Ok(Box::new(SerialPortLink { port }))
    }
}

/// Worker-side ends of the bridge channels.
pub struct WorkerChannels {
    pub frames: Sender<RangingFrame>,
    pub commands: Receiver<MotorCommand>,
    pub stop: Arc<AtomicBool>,
    pub bb: Blackboard,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub backoff: Duration,
    pub max_attempts: u32,
    pub idle_sleep: Duration,
}

impl ReconnectPolicy {
    pub fn from_settings(settings: &HardwareSettings) -> Self {
        Self {
            backoff: settings.reconnect_backoff(),
            max_attempts: settings.max_attempts.max(1),
            idle_sleep: Duration::from_micros(settings.idle_sleep_us),
        }
    }
}

/// Body of the serial worker thread.
///
/// Reconnects after link errors; a successful connection resets the failure
/// count. Returns `Exhausted` after `max_attempts` consecutive failures.
pub fn run_worker(
    mut connector: Box<dyn Connector>,
    policy: ReconnectPolicy,
    channels: WorkerChannels,
) -> Result<()> {
    info!("Serial worker started.");
    let sleeper = SpinSleeper::new(SPIN_ACCURACY_NS);
    let mut failures = 0;

    while !channels.stop.load(Ordering::Relaxed) {
        set_link(&channels.bb, LinkState::Connecting);
        match connector.connect() {
            Ok(mut link) => {
                failures = 0;
                set_link(&channels.bb, LinkState::Connected);
                match pump(link.as_mut(), &channels, &sleeper, policy.idle_sleep) {
                    Ok(()) => break,
                    Err(e) => warn!("Serial link lost: {}", e),
                }
            }
            Err(e) => warn!(attempt = failures + 1, "Serial connect failed: {}", e),
        }

        failures += 1;
        if failures >= policy.max_attempts {
            error!(failures, "Giving up on the serial link.");
            set_link(&channels.bb, LinkState::Failed);
            return Err(BridgeError::Exhausted(failures));
        }
        backoff(&channels.stop, policy.backoff, &sleeper);
    }

    set_link(&channels.bb, LinkState::Disabled);
    info!("Serial worker stopped.");
    Ok(())
}

/// Moves bytes until stop is requested (`Ok`) or the link fails (`Err`).
fn pump(
    link: &mut dyn SerialLink,
    channels: &WorkerChannels,
    sleeper: &SpinSleeper,
    idle_sleep: Duration,
) -> Result<()> {
    let mut lines = LineBuffer::new();
    let mut buf = [0u8; READ_CHUNK];

    while !channels.stop.load(Ordering::Relaxed) {
        let n = link.read(&mut buf)?;
        for line in lines.push(&buf[..n]) {
            match decode_frame(&line) {
                Ok(frame) => match channels.frames.try_send(frame) {
                    Ok(()) => channels.bb.write().frames_decoded += 1,
                    Err(TrySendError::Full(_)) => {
                        debug!("Frame queue full, dropping frame");
                        channels.bb.write().frames_dropped += 1;
                    }
                    Err(TrySendError::Closed(_)) => return Ok(()),
                },
                Err(e) => {
                    warn!("Rejected frame: {}", e);
                    channels.bb.write().frames_rejected += 1;
                }
            }
        }

        loop {
            match channels.commands.try_recv() {
                Ok(cmd) => link.write_all(&[cmd.as_char() as u8, b'\n'])?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        if n == 0 {
            sleeper.sleep(idle_sleep);
        }
    }
    Ok(())
}

fn backoff(stop: &AtomicBool, total: Duration, sleeper: &SpinSleeper) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleeper.sleep((deadline - now).min(BACKOFF_SLICE));
    }
}
