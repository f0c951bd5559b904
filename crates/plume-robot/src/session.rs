//! One drawing session: stream the trajectory while the robot program
//! runs.
//!
//! The streaming loop runs on its own thread against the register link;
//! the dashboard is driven from the calling thread. They share no state,
//! only ordering: load and play after streaming is up, stop and close
//! after it has joined. Stop is issued however streaming ended.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use plume_pipeline::Trajectory;
use serde::{Deserialize, Serialize};

use crate::controller::{StreamConfig, StreamReport, StreamingTask};
use crate::dashboard::CommandChannel;
use crate::error::{CommandError, SessionError};
use crate::link::RegisterLink;

/// Session options.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Program to load on the controller.
    pub program: String,
    /// Wait between starting the stream and loading the program.
    pub settle_delay: Duration,
    pub stream: StreamConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            program: "rtde_control_loop.urp".into(),
            settle_delay: Duration::from_secs(2),
            stream: StreamConfig::default(),
        }
    }
}

/// Outcome of a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub stream: StreamReport,
    /// `false` when the robot was in local mode at start.
    pub remote_control: bool,
}

/// Run a full session.
///
/// # Errors
///
/// The first failure among program start-up and streaming. A failed
/// start cancels streaming. The program is not started when streaming
/// has already ended by the time the settle delay is over. A stop that
/// the robot answers unexpectedly is only logged.
pub fn run_session<L, S>(
    link: L,
    mut commands: CommandChannel<S>,
    trajectory: Trajectory,
    config: &SessionConfig,
) -> Result<SessionReport, SessionError>
where
    L: RegisterLink + Send + 'static,
    S: Read + Write,
{
    log::info!(
        "starting session: {} waypoints, program {}",
        trajectory.len(),
        config.program
    );
    let task = StreamingTask::spawn(link, trajectory, config.stream.clone())?;
    thread::sleep(config.settle_delay);

    let started = if task.is_finished() {
        log::error!("streaming ended during the settle delay, not starting {}", config.program);
        Ok(false)
    } else {
        let started = start_program(&mut commands, &config.program);
        if let Err(e) = &started {
            log::error!("could not start {}: {e}", config.program);
            task.cancel();
        }
        started
    };
    let streamed = task.join();

    let stopped = match commands.stop() {
        Ok(_) => Ok(()),
        Err(CommandError::Rejected { response, .. }) => {
            log::warn!("robot did not confirm stop: {response}");
            Ok(())
        }
        Err(e) => Err(e),
    };
    if let Err(e) = commands.close() {
        log::warn!("closing dashboard failed: {e}");
    }

    let remote_control = started?;
    let stream = streamed?;
    stopped?;
    log::info!("session finished");
    Ok(SessionReport {
        stream,
        remote_control,
    })
}

fn start_program<S: Read + Write>(
    commands: &mut CommandChannel<S>,
    program: &str,
) -> Result<bool, CommandError> {
    let remote = commands.is_in_remote_control()?;
    if !remote {
        log::warn!("robot is in local mode, some commands may not work");
    }
    commands.load(program)?;
    commands.play()?;
    Ok(remote)
}
