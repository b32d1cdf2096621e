use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How hard the upstream pushed back.
///
/// Callers map the signal they observed (a plain 429, a 429 with a long
/// `Retry-After`, a blocked session) onto one of these levels when calling
/// [`record_throttle`]. Strings from config or log data convert leniently:
/// anything unrecognized counts as [`Medium`].
///
/// [`record_throttle`]: crate::AdmissionController::record_throttle
/// [`Medium`]: Self::Medium
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrottleSeverity {
    /// A soft signal, e.g. a single 429 on an otherwise healthy session
    Low,
    /// The common case
    #[default]
    Medium,
    /// Repeated rejections or a blocked session
    High,
}

impl ThrottleSeverity {
    /// Factor applied to the enforced interval when this severity is
    /// reported
    pub(crate) const fn interval_multiplier(self) -> f64 {
        match self {
            Self::Low => 1.3,
            Self::Medium => 1.6,
            Self::High => 2.2,
        }
    }

    /// Lower bound on the back-off penalty returned for this severity
    pub(crate) const fn penalty_floor(self) -> Duration {
        match self {
            Self::Low => Duration::from_secs(12),
            Self::Medium => Duration::from_secs(25),
            Self::High => Duration::from_secs(45),
        }
    }
}

impl From<&str> for ThrottleSeverity {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            other => {
                log::debug!("unknown throttle severity {other:?}, treating as medium");
                Self::Medium
            }
        }
    }
}

impl fmt::Display for ThrottleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("low", ThrottleSeverity::Low)]
    #[case("MEDIUM", ThrottleSeverity::Medium)]
    #[case("High", ThrottleSeverity::High)]
    #[case("", ThrottleSeverity::Medium)]
    #[case("catastrophic", ThrottleSeverity::Medium)]
    fn test_lenient_parsing(#[case] input: &str, #[case] expected: ThrottleSeverity) {
        assert_eq!(ThrottleSeverity::from(input), expected);
    }

    #[test]
    fn test_severity_parameters_escalate() {
        let low = ThrottleSeverity::Low;
        let medium = ThrottleSeverity::Medium;
        let high = ThrottleSeverity::High;

        assert!(low.interval_multiplier() < medium.interval_multiplier());
        assert!(medium.interval_multiplier() < high.interval_multiplier());
        assert!(low.penalty_floor() < medium.penalty_floor());
        assert!(medium.penalty_floor() < high.penalty_floor());
    }

    #[test]
    fn test_default_is_medium() {
        assert_eq!(ThrottleSeverity::default(), ThrottleSeverity::Medium);
    }

    #[test]
    fn test_display() {
        assert_eq!(ThrottleSeverity::High.to_string(), "high");
    }
}
