use thiserror::Error;

/// Rejected configuration. Raised at construction time, never mid-run.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    GridDimension { width: i32, height: i32 },

    #[error("grid width {width} cannot hold the starting snake (need at least {min})")]
    GridTooSmall { width: i32, min: i32 },

    #[error("{name} must be within [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },

    #[error("{name} must be within [0, 1], got {value}")]
    Rate { name: &'static str, value: f32 },

    #[error("exploration floor {min} is above the starting rate {start}")]
    ExplorationFloor { start: f32, min: f32 },

    #[error("lookahead needs at least one rollout of depth >= 1, got {rollouts} rollouts of depth {depth}")]
    Lookahead { rollouts: usize, depth: usize },
}

pub(crate) fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Rate { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_range_rejects_nan_and_outliers() {
        assert!(check_unit("learning_rate", 0.0).is_ok());
        assert!(check_unit("learning_rate", 1.0).is_ok());
        assert!(check_unit("learning_rate", -0.1).is_err());
        assert!(check_unit("learning_rate", f32::NAN).is_err());
    }

    #[test]
    fn grid_errors_report_the_bad_dimensions() {
        let err = ConfigError::GridTooSmall { width: 3, min: 4 };
        assert_eq!(err.to_string(), "grid width 3 cannot hold the starting snake (need at least 4)");
    }

    #[test]
    fn display_names_the_field() {
        let err = ConfigError::Probability { name: "hazard_spawn_probability", value: 1.5 };
        assert_eq!(err.to_string(), "hazard_spawn_probability must be within [0, 1], got 1.5");
    }
}
