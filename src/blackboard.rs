use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

/// Serial link state as seen by the bridge worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disabled,
    Connecting,
    Connected,
    /// Reconnect attempts exhausted; the worker has stopped.
    Failed,
}

/// Runtime health shared between tasks.
#[derive(Clone, Debug)]
pub struct State {
    pub last_tick_ts: Instant,
    pub ticks: u64,
    pub link: LinkState,
    pub frames_decoded: u64,
    pub frames_rejected: u64,
    pub frames_dropped: u64,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            last_tick_ts: Instant::now(),
            ticks: 0,
            link: LinkState::default(),
            frames_decoded: 0,
            frames_rejected: 0,
            frames_dropped: 0,
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

/// Records a completed scheduler tick.
pub fn touch_tick(bb: &Blackboard) {
    let mut g = bb.write();
    g.last_tick_ts = Instant::now();
    g.ticks += 1;
}

pub fn set_link(bb: &Blackboard, link: LinkState) {
    bb.write().link = link;
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

pub fn clear_fault(bb: &Blackboard, msg: &str) {
    bb.write().faults.retain(|s| s != msg);
}
