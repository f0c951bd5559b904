//! The register interface the streaming controller drives.

use plume_pipeline::Waypoint;

use crate::error::LinkError;
use crate::state::RobotState;

/// A cyclic register exchange with the robot.
///
/// Each [`receive`](Self::receive) blocks until the robot publishes its
/// next state, which paces the controller loop.
pub trait RegisterLink {
    /// Next state from the robot. `Ok(None)` once the robot stops sending.
    ///
    /// # Errors
    ///
    /// Transport or decoding failures.
    fn receive(&mut self) -> Result<Option<RobotState>, LinkError>;

    /// Write the target pose registers.
    ///
    /// # Errors
    ///
    /// Transport failures.
    fn send_target(&mut self, target: &Waypoint) -> Result<(), LinkError>;

    /// Write the watchdog register.
    ///
    /// # Errors
    ///
    /// Transport failures.
    fn kick_watchdog(&mut self, value: i32) -> Result<(), LinkError>;

    /// Stop synchronization and release the connection.
    ///
    /// # Errors
    ///
    /// Transport failures or a refused pause.
    fn shutdown(&mut self) -> Result<(), LinkError>;
}

impl<L: RegisterLink + ?Sized> RegisterLink for Box<L> {
    fn receive(&mut self) -> Result<Option<RobotState>, LinkError> {
        (**self).receive()
    }

    fn send_target(&mut self, target: &Waypoint) -> Result<(), LinkError> {
        (**self).send_target(target)
    }

    fn kick_watchdog(&mut self, value: i32) -> Result<(), LinkError> {
        (**self).kick_watchdog(value)
    }

    fn shutdown(&mut self) -> Result<(), LinkError> {
        (**self).shutdown()
    }
}
