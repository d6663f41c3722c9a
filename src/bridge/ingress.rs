//! Ingestion path for frames that arrive outside the serial link, such as
//! an HTTP POST body. Frames land on the same queue the serial worker feeds.

use tokio::sync::mpsc::{Sender, error::TrySendError};
use tracing::warn;

use crate::blackboard::Blackboard;
use crate::bridge::error::{BridgeError, Result};
use crate::bridge::frame::{RangingFrame, decode_frame};

#[derive(Clone)]
pub struct FrameIngress {
    tx: Sender<RangingFrame>,
    bb: Blackboard,
}

impl FrameIngress {
    pub fn new(tx: Sender<RangingFrame>, bb: Blackboard) -> Self {
        Self { tx, bb }
    }

    /// Decodes a JSON frame body and queues it.
    ///
    /// A malformed body is rejected without touching session state.
    pub fn submit_json(&self, body: &str) -> Result<()> {
        match decode_frame(body.trim()) {
            Ok(frame) => self.submit(frame),
            Err(e) => {
                warn!("Rejected ingested frame: {}", e);
                self.bb.write().frames_rejected += 1;
                Err(e.into())
            }
        }
    }

    pub fn submit(&self, frame: RangingFrame) -> Result<()> {
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.bb.write().frames_decoded += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.bb.write().frames_dropped += 1;
                Err(BridgeError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(BridgeError::Closed),
        }
    }
}
