//! Unit tests for registry ordering and candidate tie-breaking

use chrono::Utc;
use equitrix::models::{Candidate, Side, StrategyCategory};
use equitrix::strategies::{best_per_category, StrategyRegistry};

fn candidate(category: StrategyCategory, strategy: &str, confidence: f64) -> Candidate {
    Candidate {
        instrument: "RELIANCE".to_string(),
        side: Side::Buy,
        entry: 100.0,
        stop: 98.0,
        target: 104.0,
        confidence,
        strategy_name: strategy.to_string(),
        category,
        produced_at: Utc::now(),
    }
}

#[test]
fn test_default_registry_covers_all_categories() {
    let registry = StrategyRegistry::defaults();
    assert_eq!(registry.len(), 8);
    for category in StrategyCategory::ALL {
        assert!(
            !registry.for_category(category).is_empty(),
            "no strategies registered for {:?}",
            category
        );
    }
}

#[test]
fn test_registry_preserves_registration_order() {
    let registry = StrategyRegistry::defaults();
    let day: Vec<&str> = registry
        .for_category(StrategyCategory::DayTrading)
        .iter()
        .map(|s| s.name())
        .collect();
    assert_eq!(day, vec!["ema_crossover", "range_breakout", "gap_up_momentum"]);
    let short: Vec<&str> = registry
        .for_category(StrategyCategory::ShortSelling)
        .iter()
        .map(|s| s.name())
        .collect();
    assert_eq!(short, vec!["overbought_rejection", "ema_breakdown"]);
}

#[test]
fn test_max_min_history_across_categories() {
    let registry = StrategyRegistry::defaults();
    assert_eq!(
        registry.max_min_history(&[StrategyCategory::LongTerm]),
        51
    );
    assert_eq!(
        registry.max_min_history(&[StrategyCategory::DayTrading, StrategyCategory::ShortTerm]),
        36
    );
    assert_eq!(registry.max_min_history(&[]), 0);
}

#[test]
fn test_best_per_category_keeps_highest_confidence() {
    let picked = best_per_category(vec![
        candidate(StrategyCategory::DayTrading, "ema_crossover", 0.6),
        candidate(StrategyCategory::DayTrading, "range_breakout", 0.8),
    ]);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].strategy_name, "range_breakout");
}

#[test]
fn test_best_per_category_tie_prefers_earliest_registered() {
    let picked = best_per_category(vec![
        candidate(StrategyCategory::DayTrading, "ema_crossover", 0.7),
        candidate(StrategyCategory::DayTrading, "range_breakout", 0.7),
    ]);
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].strategy_name, "ema_crossover");
}

#[test]
fn test_best_per_category_retains_all_categories() {
    let picked = best_per_category(vec![
        candidate(StrategyCategory::DayTrading, "ema_crossover", 0.7),
        candidate(StrategyCategory::ShortSelling, "overbought_rejection", 0.5),
        candidate(StrategyCategory::LongTerm, "trend_follow", 0.6),
    ]);
    assert_eq!(picked.len(), 3);
}

#[test]
fn test_best_per_category_empty_input() {
    assert!(best_per_category(Vec::new()).is_empty());
}
