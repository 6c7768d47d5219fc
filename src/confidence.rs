use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse confidence in an answer, derived only from whether the backend
/// returned any supporting sources.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Low,
}

/// `High` when at least one source came back, `Low` otherwise.
pub fn classify<S>(sources: &[S]) -> Confidence {
    if sources.is_empty() {
        Confidence::Low
    } else {
        Confidence::High
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => f.write_str("High"),
            Confidence::Low => f.write_str("Low"),
        }
    }
}
