use serde::{Deserialize, Serialize};

/// Timing quality of a judged input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Perfect,
    Early,
    Late,
    Miss,
}

impl Classification {
    /// Whether the input landed inside the accepted window.
    pub fn is_hit(self) -> bool {
        !matches!(self, Self::Miss)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Early => "EARLY",
            Self::Late => "LATE",
            Self::Miss => "MISS",
        }
    }
}

/// Result of judging one input against one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgmentResult {
    pub classification: Classification,
    /// `now - target`. Negative = early, positive = late.
    pub signed_error_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_miss_is_not_a_hit() {
        assert!(Classification::Perfect.is_hit());
        assert!(Classification::Early.is_hit());
        assert!(Classification::Late.is_hit());
        assert!(!Classification::Miss.is_hit());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Classification::Perfect).unwrap();
        assert_eq!(json, "\"perfect\"");
    }
}
