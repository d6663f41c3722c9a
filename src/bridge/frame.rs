//! Line-delimited JSON ranging frames sent by the scout firmware.
//!
//! ```json
//! {"readings":[{"angle":0,"distance":87.5,"gyro_z":1.2}],"timestamp_ms":1200,
//!  "air_temp_c":21.4,"humidity_pct":48.0,"surface_temp_c":19.8}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::bridge::error::FrameError;

/// Characters of context kept on each side of a syntax error.
const ERROR_CONTEXT: usize = 3;

/// One ranging sample: servo angle (degrees, clockwise from forward) and distance (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub angle: f64,
    pub distance: f64,
    /// Yaw rate (deg/s), when the IMU reported one.
    #[serde(default)]
    pub gyro_z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangingFrame {
    pub readings: Vec<Sample>,
    /// Firmware clock (ms).
    pub timestamp_ms: u64,
    #[serde(default)]
    pub air_temp_c: Option<f64>,
    #[serde(default)]
    pub humidity_pct: Option<f64>,
    #[serde(default)]
    pub surface_temp_c: Option<f64>,
}

impl RangingFrame {
    /// Yaw rate of the first sample that carries one.
    pub fn gyro_z(&self) -> Option<f64> {
        self.readings.iter().find_map(|s| s.gyro_z)
    }
}

/// Decodes one frame line.
pub fn decode_frame(line: &str) -> Result<RangingFrame, FrameError> {
    serde_json::from_str(line).map_err(|e| match e.classify() {
        Category::Data => FrameError::Schema(e.to_string()),
        Category::Syntax | Category::Eof | Category::Io => {
            let offset = byte_offset(line, e.line(), e.column());
            FrameError::Malformed { offset, message: e.to_string(), context: context_around(line, offset) }
        }
    })
}

/// Converts serde_json's 1-based line/column into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text.split_inclusive('\n').take(line.saturating_sub(1)).map(str::len).sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

fn context_around(text: &str, offset: usize) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let at = chars.iter().position(|(i, _)| *i >= offset).unwrap_or(chars.len());
    let from = at.saturating_sub(ERROR_CONTEXT);
    let to = (at + ERROR_CONTEXT + 1).min(chars.len());
    chars[from..to].iter().map(|(_, c)| c).collect()
}

/// Accumulates raw serial bytes and yields complete frame lines.
///
/// Bytes are decoded lossily; lines that do not start with `{` are firmware
/// chatter and are dropped.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and drains every newline-terminated frame line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(bytes));
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            let line = line.trim();
            if line.starts_with('{') {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> &str {
        &self.pending
    }
}
