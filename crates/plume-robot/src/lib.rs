//! plume-robot: drives a UR-style arm through a plume trajectory.
//!
//! Two independent connections to the same controller:
//!
//! - the real-time register link ([`RtdeClient`] behind the
//!   [`RegisterLink`] trait), which the streaming controller polls every
//!   cycle to hand over waypoints under the ready-flag handshake;
//! - the dashboard [`CommandChannel`], which loads, starts and stops the
//!   robot program.
//!
//! [`run_session`] ties them together.

pub mod controller;
pub mod dashboard;
pub mod error;
pub mod link;
pub mod rtde;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

pub use controller::{StreamConfig, StreamReport, StreamingTask, stream};
pub use dashboard::CommandChannel;
pub use error::{CommandError, LinkError, SessionError, StreamError};
pub use link::RegisterLink;
pub use rtde::RtdeClient;
pub use session::{SessionConfig, SessionReport, run_session};
pub use state::{RegisterMap, RobotState};
