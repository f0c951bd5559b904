//! Streaming controller: hands waypoints to the robot one handshake at a
//! time.
//!
//! The robot program raises the ready flag when it wants a target, reads
//! the target registers, drops the flag while it moves, and raises it
//! again when it arrives. The controller sends a waypoint only on a
//! rising edge of that flag: the flag must have been seen at 0 (the
//! latch) since the previous send. Every cycle also kicks the watchdog.
//!
//! ```text
//!            ready == 0                 ready != 0 && latch
//! WAIT_READY ─────────▶ latch set ─────────────────────────▶ DISPATCH
//!     ▲                                                          │
//!     └──────────────── WAIT_ACK (ready == 0 sets latch) ◀───────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use plume_pipeline::{PaperConfig, Trajectory, Waypoint};
use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::link::RegisterLink;

/// Streaming options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// While the robot reports an all-zero pose, send the current
    /// waypoint without advancing so the program's first move has a
    /// valid target.
    pub prime_on_zero_pose: bool,

    /// Pose sent once more after the last waypoint.
    pub park: Waypoint,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            prime_on_zero_pose: true,
            park: PaperConfig::default().park,
        }
    }
}

/// Outcome of a completed streaming run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamReport {
    /// Trajectory waypoints handed over (priming repeats not counted).
    pub waypoints_sent: usize,
    /// Robot states processed.
    pub cycles: u64,
}

/// Drive `link` through `trajectory`, then send the park pose.
///
/// Blocks until the park pose has been dispatched, the link stops
/// delivering state, or `cancel` is set. The link is shut down in every
/// case.
///
/// # Errors
///
/// [`StreamError::ConnectionLost`] when the robot stops sending state,
/// [`StreamError::Cancelled`] when `cancel` is raised, and
/// [`StreamError::Link`] for transport failures.
pub fn stream<L: RegisterLink + ?Sized>(
    link: &mut L,
    trajectory: &Trajectory,
    config: &StreamConfig,
    cancel: &AtomicBool,
) -> Result<StreamReport, StreamError> {
    let result = run(link, trajectory, config, cancel);
    if let Err(e) = link.shutdown() {
        log::warn!("register link shutdown failed: {e}");
    }
    match &result {
        Ok(report) => log::info!(
            "streamed {} waypoints in {} cycles",
            report.waypoints_sent,
            report.cycles
        ),
        Err(e) => log::error!("streaming stopped: {e}"),
    }
    result
}

fn run<L: RegisterLink + ?Sized>(
    link: &mut L,
    trajectory: &Trajectory,
    config: &StreamConfig,
    cancel: &AtomicBool,
) -> Result<StreamReport, StreamError> {
    let mut index = 0;
    let mut latch = false;
    let mut cycles: u64 = 0;
    let mut watchdog: i32 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(StreamError::Cancelled);
        }
        let Some(state) = link.receive()? else {
            return Err(StreamError::ConnectionLost {
                waypoints_sent: index,
            });
        };
        cycles += 1;

        let mut parked = false;
        if state.ready != 0 && latch {
            latch = false;
            match trajectory.get(index) {
                Some(target) if config.prime_on_zero_pose && state.is_zero_pose() => {
                    log::debug!("priming target registers with waypoint {index}");
                    link.send_target(target)?;
                }
                Some(target) => {
                    log::trace!("waypoint {index}: {target:?}");
                    link.send_target(target)?;
                    index += 1;
                }
                None => {
                    link.send_target(&config.park)?;
                    parked = true;
                }
            }
        } else if state.ready == 0 {
            latch = true;
        }

        link.kick_watchdog(watchdog)?;
        watchdog = watchdog.wrapping_add(1);

        if parked {
            return Ok(StreamReport {
                waypoints_sent: index,
                cycles,
            });
        }
    }
}

/// A streaming run on its own thread, with cancel and join.
#[derive(Debug)]
pub struct StreamingTask {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<Result<StreamReport, StreamError>>,
}

impl StreamingTask {
    /// Move `link` and `trajectory` onto a new thread and start
    /// streaming.
    ///
    /// # Errors
    ///
    /// [`StreamError::Spawn`] when the thread cannot be created.
    pub fn spawn<L>(
        mut link: L,
        trajectory: Trajectory,
        config: StreamConfig,
    ) -> Result<Self, StreamError>
    where
        L: RegisterLink + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("plume-stream".to_string())
            .spawn(move || stream(&mut link, &trajectory, &config, &flag))
            .map_err(StreamError::Spawn)?;
        log::debug!("streaming thread started");
        Ok(Self { cancel, handle })
    }

    /// Ask the loop to stop at its next cycle.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether the thread has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end.
    ///
    /// # Errors
    ///
    /// The run's own error, or [`StreamError::Panicked`].
    pub fn join(self) -> Result<StreamReport, StreamError> {
        self.handle.join().map_err(|_| StreamError::Panicked)?
    }
}
