//! Reasoning-effort heuristic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Rough task class used to pick an effort level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    /// Extraction, classification, short rewrites.
    Simple,
    /// Analysis, evaluation, structured content.
    Medium,
    /// Multi-step planning and comprehensive reports.
    Complex,
}

/// Picks an effort level from input length (chars) and task class.
///
/// | class   | thresholds  | < low   | < medium | otherwise |
/// |---------|-------------|---------|----------|-----------|
/// | simple  | 1000 / 5000 | minimal | minimal  | low       |
/// | medium  | 500 / 2000  | minimal | low      | medium    |
/// | complex | 500 / 2000  | low     | medium   | medium    |
pub fn determine_effort(input_len: usize, complexity: TaskComplexity) -> ReasoningEffort {
    use ReasoningEffort::{Low, Medium, Minimal};

    let (low_threshold, medium_threshold, tiers) = match complexity {
        TaskComplexity::Simple => (1000, 5000, [Minimal, Minimal, Low]),
        TaskComplexity::Medium => (500, 2000, [Minimal, Low, Medium]),
        TaskComplexity::Complex => (500, 2000, [Low, Medium, Medium]),
    };
    if input_len < low_threshold {
        tiers[0]
    } else if input_len < medium_threshold {
        tiers[1]
    } else {
        tiers[2]
    }
}

#[cfg(test)]
mod tests {
    use super::{determine_effort, ReasoningEffort, TaskComplexity};

    #[test]
    fn simple_tasks_stay_cheap() {
        assert_eq!(determine_effort(999, TaskComplexity::Simple), ReasoningEffort::Minimal);
        assert_eq!(determine_effort(4999, TaskComplexity::Simple), ReasoningEffort::Minimal);
        assert_eq!(determine_effort(5000, TaskComplexity::Simple), ReasoningEffort::Low);
    }

    #[test]
    fn medium_tasks_scale_with_input() {
        assert_eq!(determine_effort(499, TaskComplexity::Medium), ReasoningEffort::Minimal);
        assert_eq!(determine_effort(500, TaskComplexity::Medium), ReasoningEffort::Low);
        assert_eq!(determine_effort(2000, TaskComplexity::Medium), ReasoningEffort::Medium);
    }

    #[test]
    fn complex_tasks_cap_at_medium() {
        assert_eq!(determine_effort(10, TaskComplexity::Complex), ReasoningEffort::Low);
        assert_eq!(determine_effort(1500, TaskComplexity::Complex), ReasoningEffort::Medium);
        assert_eq!(determine_effort(50_000, TaskComplexity::Complex), ReasoningEffort::Medium);
    }
}
