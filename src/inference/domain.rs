//! Domain definitions for prediction outputs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One submission row: the passenger identifier as it appeared in the input,
/// and the predicted label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "PassengerId")]
    pub id: String,
    #[serde(rename = "Survived")]
    pub survived: u8,
}

/// Outcome for a single passenger, as shown by the interactive form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verdict {
    pub survived: bool,
    /// Share of trees voting for survival.
    pub probability: f64,
}

impl Verdict {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            survived: probability > 0.5,
            probability,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.survived {
            "SURVIVED"
        } else {
            "DID NOT SURVIVE"
        };
        write!(f, "{outcome} (survival probability {:.0}%)", self.probability * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_probability_does_not_survive() {
        assert!(!Verdict::from_probability(0.5).survived);
        assert!(Verdict::from_probability(0.51).survived);
    }

    #[test]
    fn verdict_renders_outcome_and_percentage() {
        let text = Verdict::from_probability(0.8).to_string();
        assert_eq!(text, "SURVIVED (survival probability 80%)");
    }
}
