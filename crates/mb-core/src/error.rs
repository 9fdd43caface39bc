use std::fmt;

/// Rejected configuration. Raised once, at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonFinite {
        field: &'static str,
        value: f64,
    },
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
    Thresholds {
        implosive_below: f64,
        bloom_above: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonFinite { field, value } => {
                write!(f, "{field} must be finite, got {value}")
            }
            ConfigError::OutOfRange {
                field,
                value,
                expected,
            } => write!(f, "{field} out of range: got {value}, expected {expected}"),
            ConfigError::Thresholds {
                implosive_below,
                bloom_above,
            } => write!(
                f,
                "mode thresholds must satisfy 0 <= implosive_below <= bloom_above <= 1, \
                 got {implosive_below} / {bloom_above}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_field() {
        let err = ConfigError::OutOfRange {
            field: "coupling",
            value: 1.5,
            expected: "[0, 1]",
        };
        let msg = err.to_string();
        assert!(msg.contains("coupling"), "{msg}");
        assert!(msg.contains("1.5"), "{msg}");
    }

    #[test]
    fn test_non_finite_display() {
        let err = ConfigError::NonFinite {
            field: "cycle_period",
            value: f64::NAN,
        };
        assert!(err.to_string().starts_with("cycle_period must be finite"));
    }
}
