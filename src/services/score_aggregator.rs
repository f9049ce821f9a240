//! Score aggregation and the single stopping decision of the loop.

use crate::domain::models::{CombinerConfig, Decision, ScoreRecord};

/// Combines reviewer and compliance scores and applies the stopping policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreAggregator {
    combiner: CombinerConfig,
}

impl ScoreAggregator {
    pub fn new(combiner: CombinerConfig) -> Self {
        Self { combiner }
    }

    pub fn combiner(&self) -> CombinerConfig {
        self.combiner
    }

    /// Combine both scores into a confidence in 0-100.
    ///
    /// Inputs are clamped to 0-100 first; the result is monotonic in both and
    /// maps `(0, 0)` to 0 and `(100, 100)` to 100 for every combiner.
    pub fn combine(&self, reviewer: f64, compliance: f64) -> f64 {
        let r = clamp_score(reviewer);
        let c = clamp_score(compliance);

        let confidence = match self.combiner {
            CombinerConfig::Mean => (r + c) / 2.0,
            CombinerConfig::Weighted { reviewer_weight } => {
                let w = if reviewer_weight.is_nan() {
                    0.5
                } else {
                    reviewer_weight.clamp(0.0, 1.0)
                };
                w * r + (1.0 - w) * c
            }
            CombinerConfig::Min => r.min(c),
        };
        clamp_score(confidence)
    }

    /// Decide what follows iteration `iteration` (0-based).
    ///
    /// A zero budget always stops as exhausted, so no revision ever runs.
    pub fn decide(confidence: f64, target: f64, iteration: u32, max_iterations: u32) -> Decision {
        if max_iterations == 0 {
            Decision::StopExhausted
        } else if confidence >= target {
            Decision::StopConverged
        } else if iteration.saturating_add(1) >= max_iterations {
            Decision::StopExhausted
        } else {
            Decision::ContinueWithRevision
        }
    }

    /// Build the score record for one evaluation round.
    pub fn record(&self, iteration: u32, reviewer: f64, compliance: f64, target: f64) -> ScoreRecord {
        let confidence = self.combine(reviewer, compliance);
        ScoreRecord {
            iteration,
            reviewer_score: clamp_score(reviewer),
            compliance_score: clamp_score(compliance),
            confidence,
            passed: confidence >= target,
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_is_default() {
        let agg = ScoreAggregator::default();
        assert!((agg.combine(60.0, 60.0) - 60.0).abs() < f64::EPSILON);
        assert!((agg.combine(85.0, 75.0) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weighted_and_min() {
        let weighted = ScoreAggregator::new(CombinerConfig::Weighted { reviewer_weight: 0.25 });
        assert!((weighted.combine(80.0, 40.0) - 50.0).abs() < 1e-9);

        let min = ScoreAggregator::new(CombinerConfig::Min);
        assert!((min.combine(80.0, 40.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let agg = ScoreAggregator::default();
        assert!((agg.combine(150.0, -20.0) - 50.0).abs() < f64::EPSILON);
        assert!(agg.combine(f64::NAN, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decide_order() {
        assert_eq!(ScoreAggregator::decide(100.0, 80.0, 0, 0), Decision::StopExhausted);
        assert_eq!(ScoreAggregator::decide(80.0, 80.0, 0, 3), Decision::StopConverged);
        assert_eq!(ScoreAggregator::decide(90.0, 80.0, 2, 3), Decision::StopConverged);
        assert_eq!(ScoreAggregator::decide(79.9, 80.0, 2, 3), Decision::StopExhausted);
        assert_eq!(ScoreAggregator::decide(10.0, 80.0, 0, 1), Decision::StopExhausted);
        assert_eq!(ScoreAggregator::decide(79.9, 80.0, 1, 3), Decision::ContinueWithRevision);
    }

    #[test]
    fn test_record_marks_pass() {
        let agg = ScoreAggregator::default();
        let record = agg.record(1, 85.0, 75.0, 80.0);
        assert!(record.passed);
        assert_eq!(record.iteration, 1);

        let record = agg.record(0, 60.0, 60.0, 80.0);
        assert!(!record.passed);
    }
}
