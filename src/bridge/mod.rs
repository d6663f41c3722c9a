//! Bridge between a physical scout and the runtime.
//!
//! A dedicated thread owns the serial port and feeds decoded frames into a
//! bounded queue; an async consumer runs them through the [`HardwareSession`],
//! publishes the resulting [`ScoutUpdate`] and hands the motor command back
//! to the thread.

pub mod error;
pub mod frame;
pub mod ingress;
pub mod serial;
pub mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use scout_navigation::MotorCommand;

use crate::blackboard::{Blackboard, LinkState, raise_fault, set_link};
use crate::bus::Topic;
use crate::config::Settings;

pub use error::{BridgeError, FrameError};
pub use frame::{LineBuffer, RangingFrame, Sample, decode_frame};
pub use ingress::FrameIngress;
pub use serial::{Connector, ReconnectPolicy, SerialLink, SerialPortConnector, WorkerChannels};
pub use session::{HardwareSession, ScoutPose, ScoutUpdate};

const JOIN_POLL: Duration = Duration::from_millis(10);
pub const LINK_FAULT: &str = "serial link exhausted";

pub struct Bridge {
    ingress: FrameIngress,
    worker: Option<std::thread::JoinHandle<error::Result<()>>>,
    stop: Arc<AtomicBool>,
    consumer: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
    join_timeout: Duration,
}

impl Bridge {
    /// Starts the consumer task and, when `connector` is given, the serial
    /// worker thread. Must be called from within a Tokio runtime.
    pub fn start(
        settings: &Settings,
        bb: Blackboard,
        topic: Topic<ScoutUpdate>,
        connector: Option<Box<dyn Connector>>,
    ) -> anyhow::Result<Self> {
        let session = HardwareSession::new(&settings.hardware, &settings.grid, settings.planner)?;
        let (frames_tx, frames_rx) = mpsc::channel(settings.hardware.frame_queue);
        let stop = Arc::new(AtomicBool::new(false));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let (motor_tx, worker) = match connector {
            Some(connector) => {
                let (cmd_tx, cmd_rx) = std_mpsc::channel();
                let policy = serial::ReconnectPolicy::from_settings(&settings.hardware);
                let channels = WorkerChannels {
                    frames: frames_tx.clone(),
                    commands: cmd_rx,
                    stop: Arc::clone(&stop),
                    bb: Arc::clone(&bb),
                };
                info!("Spawning serial worker thread...");
                let handle = std::thread::Builder::new()
                    .name("serial".into())
                    .spawn({
                        let bb = Arc::clone(&bb);
                        move || {
                            let result = serial::run_worker(connector, policy, channels);
                            if result.is_err() {
                                raise_fault(&bb, LINK_FAULT);
                            }
                            result
                        }
                    })?;
                (Some(cmd_tx), Some(handle))
            }
            None => {
                set_link(&bb, LinkState::Disabled);
                (None, None)
            }
        };

        let consumer = tokio::spawn(consume(session, frames_rx, motor_tx, topic, shutdown_rx));

        Ok(Self {
            ingress: FrameIngress::new(frames_tx, bb),
            worker,
            stop,
            consumer,
            shutdown,
            join_timeout: settings.hardware.join_timeout(),
        })
    }

    /// Handle for out-of-band frame submission.
    pub fn ingress(&self) -> FrameIngress {
        self.ingress.clone()
    }

    /// Stops the worker (waiting at most the join timeout), then the consumer.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker {
            join_worker(worker, self.join_timeout).await;
        }
        let _ = self.shutdown.send(true);
        if let Err(e) = self.consumer.await {
            error!("Bridge consumer task failed: {}", e);
        }
        info!("Bridge stopped.");
    }
}

async fn consume(
    mut session: HardwareSession,
    mut frames: mpsc::Receiver<RangingFrame>,
    motor: Option<std_mpsc::Sender<MotorCommand>>,
    topic: Topic<ScoutUpdate>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Bridge consumer started.");
    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        let update = session.process(&frame);
        if let Some(motor) = &motor {
            // The worker may already be gone; the update is still published.
            let _ = motor.send(update.motor);
        }
        topic.publish(update);
    }
}

async fn join_worker(worker: std::thread::JoinHandle<error::Result<()>>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !worker.is_finished() {
        if Instant::now() >= deadline {
            warn!(?timeout, "Serial worker did not stop in time, detaching it.");
            return;
        }
        tokio::time::sleep(JOIN_POLL).await;
    }
    match worker.join() {
        Ok(Ok(())) => info!("Serial worker joined."),
        Ok(Err(e)) => warn!("Serial worker ended with error: {}", e),
        Err(_) => error!("Serial worker panicked."),
    }
}
