use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::blackboard::{Blackboard, clear_fault, raise_fault, snapshot};

pub const STALL_FAULT: &str = "scheduler stalled";

/// Raises [`STALL_FAULT`] while the scheduler has not ticked for
/// `stall_periods` periods and clears it once ticks resume.
pub async fn watchdog(
    bb: Blackboard,
    period: Duration,
    stall_periods: u32,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let limit = period * stall_periods.max(1);
    let mut tick = tokio::time::interval(period);
    let mut stalled = false;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {}
        }
        let last_tick_ts = snapshot(&bb).last_tick_ts;
        let age = Instant::now() - last_tick_ts;
        if age > limit {
            if !stalled {
                warn!(?age, ?limit, "Scheduler tick overdue.");
                stalled = true;
            }
            raise_fault(&bb, STALL_FAULT);
        } else if stalled {
            info!(?age, "Scheduler ticking again.");
            stalled = false;
            clear_fault(&bb, STALL_FAULT);
        }
    }
    info!("Watchdog task stopped.");
    Ok(())
}
