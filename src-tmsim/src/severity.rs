//! Clinical severity classification of an ABG value

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hearing-loss severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// < 15 dB
    Normal,
    /// 15 – 25 dB
    Mild,
    /// 25 – 40 dB
    Moderate,
    /// 40 – 55 dB
    ModeratelySevere,
    /// 55 – 70 dB
    Severe,
    /// ≥ 70 dB
    Profound,
}

impl Severity {
    /// Classify an ABG (dB). Total over every input; NaN maps to `Profound`.
    pub fn from_abg(abg_db: f64) -> Self {
        if abg_db < 15.0 {
            Severity::Normal
        } else if abg_db < 25.0 {
            Severity::Mild
        } else if abg_db < 40.0 {
            Severity::Moderate
        } else if abg_db < 55.0 {
            Severity::ModeratelySevere
        } else if abg_db < 70.0 {
            Severity::Severe
        } else {
            Severity::Profound
        }
    }

    /// Human readable label, as written in exported tables
    pub fn label(self) -> &'static str {
        match self {
            Severity::Normal => "Normal",
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::ModeratelySevere => "Moderately Severe",
            Severity::Severe => "Severe",
            Severity::Profound => "Profound",
        }
    }

    /// Lower bound of the band (dB)
    pub fn lower_bound(self) -> f64 {
        match self {
            Severity::Normal => f64::NEG_INFINITY,
            Severity::Mild => 15.0,
            Severity::Moderate => 25.0,
            Severity::ModeratelySevere => 40.0,
            Severity::Severe => 55.0,
            Severity::Profound => 70.0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_lower_inclusive() {
        assert_eq!(Severity::from_abg(14.999), Severity::Normal);
        assert_eq!(Severity::from_abg(15.0), Severity::Mild);
        assert_eq!(Severity::from_abg(25.0), Severity::Moderate);
        assert_eq!(Severity::from_abg(40.0), Severity::ModeratelySevere);
        assert_eq!(Severity::from_abg(55.0), Severity::Severe);
        assert_eq!(Severity::from_abg(70.0), Severity::Profound);
        assert_eq!(Severity::from_abg(-10.0), Severity::Normal);
    }

    #[test]
    fn classification_is_monotonic_and_gapless() {
        let mut prev = Severity::from_abg(-20.0);
        let mut abg = -20.0;
        while abg < 100.0 {
            let s = Severity::from_abg(abg);
            assert!(s >= prev, "severity decreased at {}", abg);
            assert!(abg >= s.lower_bound());
            prev = s;
            abg += 0.05;
        }
        assert_eq!(prev, Severity::Profound);
    }

    #[test]
    fn labels() {
        assert_eq!(Severity::ModeratelySevere.to_string(), "Moderately Severe");
        assert_eq!(Severity::from_abg(30.0).label(), "Moderate");
    }
}
