//! A simulated robot program following the ready-flag handshake.

#![allow(dead_code)]

use plume_robot::RobotState;

/// Cycles the simulated arm spends moving to a target.
pub const MOVE_CYCLES: u32 = 3;

/// Raises `ready` when idle, consumes the target registers on the next
/// cycle, then moves for [`MOVE_CYCLES`] cycles with `ready` down.
#[derive(Debug, Default)]
pub struct SimRobot {
    ready: i32,
    moving: u32,
    pending: Option<[f64; 6]>,
    registers: [f64; 6],
    /// Targets in the order the program picked them up.
    pub consumed: Vec<[f64; 6]>,
    /// Targets written over an earlier target nobody had read yet.
    pub overwrites: usize,
    /// Targets written while the robot was not asking for one.
    pub unrequested: usize,
    pub watchdog: Vec<i32>,
}

impl SimRobot {
    pub fn new() -> Self {
        Self {
            moving: 1,
            ..Self::default()
        }
    }

    /// Advance one controller cycle and publish the state.
    pub fn cycle(&mut self) -> RobotState {
        if self.ready != 0 {
            if let Some(target) = self.pending.take() {
                self.consumed.push(target);
                self.ready = 0;
                self.moving = MOVE_CYCLES;
            }
        } else if self.moving > 0 {
            self.moving -= 1;
        } else {
            self.ready = 1;
        }
        RobotState {
            ready: self.ready,
            achieved_pose: self.registers,
        }
    }

    pub fn write_target(&mut self, target: [f64; 6]) {
        if self.pending.is_some() {
            self.overwrites += 1;
        }
        if self.ready == 0 {
            self.unrequested += 1;
        }
        self.pending = Some(target);
        self.registers = target;
    }
}
