use medscribe::domain::models::{CombinerConfig, Decision};
use medscribe::services::ScoreAggregator;
use proptest::prelude::*;

fn combiner_strategy() -> impl Strategy<Value = CombinerConfig> {
    prop_oneof![
        Just(CombinerConfig::Mean),
        Just(CombinerConfig::Min),
        (0.0f64..=1.0).prop_map(|reviewer_weight| CombinerConfig::Weighted { reviewer_weight }),
    ]
}

proptest! {
    /// Property: every combiner maps the extremes onto themselves.
    #[test]
    fn prop_combine_fixes_extremes(combiner in combiner_strategy()) {
        let aggregator = ScoreAggregator::new(combiner);
        prop_assert!((aggregator.combine(100.0, 100.0) - 100.0).abs() < 1e-9);
        prop_assert!(aggregator.combine(0.0, 0.0).abs() < 1e-9);
    }

    /// Property: raising either score never lowers the confidence.
    #[test]
    fn prop_combine_is_monotonic(
        combiner in combiner_strategy(),
        r in 0.0f64..=100.0,
        c in 0.0f64..=100.0,
        dr in 0.0f64..=50.0,
        dc in 0.0f64..=50.0,
    ) {
        let aggregator = ScoreAggregator::new(combiner);
        let base = aggregator.combine(r, c);
        prop_assert!(aggregator.combine(r + dr, c) >= base - 1e-9);
        prop_assert!(aggregator.combine(r, c + dc) >= base - 1e-9);
    }

    /// Property: confidence stays within 0-100 for any input, NaN included.
    #[test]
    fn prop_combine_is_bounded(
        combiner in combiner_strategy(),
        r in prop::num::f64::ANY,
        c in prop::num::f64::ANY,
    ) {
        let confidence = ScoreAggregator::new(combiner).combine(r, c);
        prop_assert!((0.0..=100.0).contains(&confidence));
    }

    /// Property: a passing score always converges unless the budget is zero.
    #[test]
    fn prop_decide_converges_at_first_pass(
        target in 0.0f64..=100.0,
        iteration in 0u32..10,
        max_iterations in 1u32..10,
    ) {
        prop_assert_eq!(
            ScoreAggregator::decide(target, target, iteration, max_iterations),
            Decision::StopConverged
        );
        prop_assert_eq!(
            ScoreAggregator::decide(100.0, target, iteration, 0),
            Decision::StopExhausted
        );
    }

    /// Property: with budget M, no iteration at or beyond M - 1 asks for a revision.
    #[test]
    fn prop_decide_respects_budget(
        max_iterations in 1u32..20,
        extra in 0u32..5,
    ) {
        let last = max_iterations - 1 + extra;
        prop_assert_eq!(
            ScoreAggregator::decide(0.0, 80.0, last, max_iterations),
            Decision::StopExhausted
        );
        if max_iterations > 1 {
            prop_assert_eq!(
                ScoreAggregator::decide(0.0, 80.0, max_iterations - 2, max_iterations),
                Decision::ContinueWithRevision
            );
        }
    }
}
