//! Register snapshot and register naming.

use serde::{Deserialize, Serialize};

/// One cycle's worth of robot-reported registers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotState {
    /// Non-zero when the robot program waits for a new target.
    pub ready: i32,
    /// Pose the robot reports back (x, y, z, rx, ry, rz).
    pub achieved_pose: [f64; 6],
}

impl RobotState {
    /// Whether the pose registers still hold their power-on zeros.
    #[must_use]
    pub fn is_zero_pose(&self) -> bool {
        self.achieved_pose.iter().all(|&v| v == 0.0)
    }
}

/// Controller register names used by the link.
///
/// The names must match the robot program: it reads the target pose and
/// watchdog from the input registers and raises the ready flag on an
/// output register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterMap {
    /// Integer output register carrying the ready flag.
    pub ready: String,
    /// Six double registers read back as the achieved pose.
    pub achieved_pose: [String; 6],
    /// Six double input registers the target pose is written to.
    pub target_pose: [String; 6],
    /// Integer input register kicked every cycle.
    pub watchdog: String,
}

impl Default for RegisterMap {
    fn default() -> Self {
        let doubles = std::array::from_fn(|i| format!("input_double_register_{i}"));
        Self {
            ready: "output_int_register_0".into(),
            achieved_pose: doubles.clone(),
            target_pose: doubles,
            watchdog: "input_int_register_0".into(),
        }
    }
}

impl RegisterMap {
    /// Output recipe: ready flag followed by the achieved pose.
    #[must_use]
    pub fn state_recipe(&self) -> Vec<&str> {
        std::iter::once(self.ready.as_str())
            .chain(self.achieved_pose.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_registers() {
        let map = RegisterMap::default();
        assert_eq!(map.target_pose[5], "input_double_register_5");
        assert_eq!(
            map.state_recipe()[..2],
            ["output_int_register_0", "input_double_register_0"]
        );
        assert_eq!(map.state_recipe().len(), 7);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let map: RegisterMap = toml::from_str(r#"watchdog = "input_int_register_24""#).unwrap();
        assert_eq!(map.watchdog, "input_int_register_24");
        assert_eq!(map.ready, "output_int_register_0");
    }

    #[test]
    fn zero_pose_detection() {
        let mut state = RobotState::default();
        assert!(state.is_zero_pose());
        state.achieved_pose[2] = 0.07;
        assert!(!state.is_zero_pose());
    }
}
