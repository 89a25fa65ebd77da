use crate::config::ScoreWeights;
use crate::item::ItemId;
use crate::rule::{Rule, RulesDatabase};
use ahash::AHashSet;
use serde::Serialize;

/// One prediction request: the live window, items that must not be
/// suggested, the current context, and the optional score gate.
#[derive(Debug, Clone)]
pub struct PredictionQuery<'a, T> {
    /// Tail of the recent event sequence, oldest first.
    pub window: &'a [T],
    /// Items forbidden as predicted actions.
    pub hidden_items: &'a [T],
    /// Current day-of-week index.
    pub day: u32,
    /// Current hour bucket.
    pub hour: u32,
    /// When set, only rules scoring at least this much qualify and the
    /// one with the smallest deltaT wins; when unset, the highest
    /// score wins.
    pub min_threshold: Option<f64>,
}

/// Prediction outcome. Both fields are `None` when no rule qualifies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction<T> {
    pub action: Option<T>,
    pub delta: Option<f64>,
}

impl<T> Prediction<T> {
    pub(crate) fn none() -> Self {
        Self {
            action: None,
            delta: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.action.is_none()
    }
}

/// `(w1·conf + w2·sup + w3·P(day) + w4·P(hour)) · (|A| + |C|)`.
/// Context values absent from a rule's distribution contribute 0.
pub(crate) fn score(rule: &Rule, weights: &ScoreWeights, day: u32, hour: u32) -> f64 {
    let day_p = rule.day_probability().get(&day).copied().unwrap_or(0.0);
    let hour_p = rule.hour_probability().get(&hour).copied().unwrap_or(0.0);
    (weights.confidence * rule.confidence()
        + weights.support * rule.support()
        + weights.day * day_p
        + weights.hour * hour_p)
        * (rule.antecedent().len() + rule.consequent().len()) as f64
}

/// Pick the best rule for the interned window, or None when nothing
/// qualifies. Ties fall to the first candidate in the database's
/// deterministic `(antecedent, consequent)` order.
pub(crate) fn select<'r>(
    rules: &'r RulesDatabase,
    weights: &ScoreWeights,
    window: &[ItemId],
    hidden: &AHashSet<ItemId>,
    day: u32,
    hour: u32,
    min_threshold: Option<f64>,
) -> Option<&'r Rule> {
    let &last = window.last()?;
    let candidates = rules.iter().filter(|r| {
        r.antecedent().contains(last)
            && r.antecedent().occurs_in(window)
            && r.consequent().items().iter().all(|i| !hidden.contains(i))
    });

    match min_threshold {
        Some(threshold) => {
            let mut best: Option<(&Rule, f64)> = None;
            for rule in candidates {
                if score(rule, weights, day, hour) < threshold {
                    continue;
                }
                let delta = rule.delta_t().unwrap_or(f64::INFINITY);
                if best.map_or(true, |(_, current)| delta < current) {
                    best = Some((rule, delta));
                }
            }
            best.map(|(rule, _)| rule)
        }
        None => {
            let mut best: Option<(&Rule, f64)> = None;
            for rule in candidates {
                let rule_score = score(rule, weights, day, hour);
                if best.map_or(true, |(_, current)| rule_score > current) {
                    best = Some((rule, rule_score));
                }
            }
            best.map(|(rule, _)| rule)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itemset::Itemset;
    use crate::rule::ContextDistribution;

    fn weights() -> ScoreWeights {
        ScoreWeights {
            confidence: 1.0,
            support: 0.0,
            day: 0.0,
            hour: 0.0,
        }
    }

    fn rule(antecedent: &[ItemId], consequent: &[ItemId], confidence: f64, delta: f64) -> Rule {
        let mut rule = Rule::new(
            Itemset::new(antecedent.to_vec()),
            Itemset::new(consequent.to_vec()),
            confidence,
            confidence,
        );
        rule.set_delta_t(Some(delta));
        rule
    }

    fn database(rules: Vec<Rule>) -> RulesDatabase {
        RulesDatabase::from_set(rules.into_iter().collect())
    }

    #[test]
    fn score_weighs_all_terms_and_length() {
        let mut r = Rule::new(Itemset::new(vec![0, 1]), Itemset::new(vec![2]), 0.5, 0.8);
        let mut day = ContextDistribution::new();
        day.insert(1, 0.25);
        r.set_day_probability(day);

        let w = ScoreWeights {
            confidence: 0.6,
            support: 0.2,
            day: 0.1,
            hour: 0.1,
        };
        // (0.6*0.8 + 0.2*0.5 + 0.1*0.25 + 0.1*0) * 3
        let expected = (0.48 + 0.1 + 0.025) * 3.0;
        assert!((score(&r, &w, 1, 12) - expected).abs() < 1e-12);
        // unknown context value contributes nothing
        assert!((score(&r, &w, 2, 12) - (0.48 + 0.1) * 3.0).abs() < 1e-12);
    }

    #[test]
    fn filters_require_activation_by_last_event() {
        let rules = database(vec![rule(&[0], &[2], 0.9, 1.0), rule(&[1], &[2], 0.9, 1.0)]);
        let hidden = AHashSet::new();
        // window ends in 1, so only {1} -> {2} is activated
        let chosen = select(&rules, &weights(), &[0, 1], &hidden, 0, 0, None).unwrap();
        assert_eq!(chosen.antecedent().items(), &[1]);
        // antecedent must also be inside the window as a set
        let rules = database(vec![rule(&[1, 3], &[2], 0.9, 1.0)]);
        assert!(select(&rules, &weights(), &[0, 1], &hidden, 0, 0, None).is_none());
    }

    #[test]
    fn hidden_items_exclude_candidates() {
        let rules = database(vec![rule(&[1], &[2], 0.9, 1.0)]);
        let hidden: AHashSet<ItemId> = [2].into_iter().collect();
        assert!(select(&rules, &weights(), &[0, 1], &hidden, 0, 0, None).is_none());
    }

    #[test]
    fn threshold_switches_selection_to_smallest_delta() {
        // (score, deltaT) = (0.9, 20) and (0.7, 5)
        let rules = database(vec![rule(&[0], &[1], 0.9, 20.0), rule(&[0], &[2], 0.7, 5.0)]);
        let hidden = AHashSet::new();

        let gated = select(&rules, &weights(), &[0], &hidden, 0, 0, Some(0.6)).unwrap();
        assert_eq!(gated.consequent().items(), &[2]);
        assert_eq!(gated.delta_t(), Some(5.0));

        let ungated = select(&rules, &weights(), &[0], &hidden, 0, 0, None).unwrap();
        assert_eq!(ungated.consequent().items(), &[1]);
        assert_eq!(ungated.delta_t(), Some(20.0));
    }

    #[test]
    fn threshold_gates_out_everything() {
        let rules = database(vec![rule(&[0], &[1], 0.5, 3.0)]);
        let hidden = AHashSet::new();
        assert!(select(&rules, &weights(), &[0], &hidden, 0, 0, Some(0.9)).is_none());
    }

    #[test]
    fn missing_delta_is_never_preferred_under_threshold() {
        let mut no_delta = rule(&[0], &[1], 0.9, 0.0);
        no_delta.set_delta_t(None);
        let rules = database(vec![no_delta, rule(&[0], &[2], 0.9, 50.0)]);
        let hidden = AHashSet::new();
        let chosen = select(&rules, &weights(), &[0], &hidden, 0, 0, Some(0.1)).unwrap();
        assert_eq!(chosen.consequent().items(), &[2]);
    }

    #[test]
    fn empty_window_predicts_nothing() {
        let rules = database(vec![rule(&[0], &[1], 0.9, 1.0)]);
        let hidden = AHashSet::new();
        assert!(select(&rules, &weights(), &[], &hidden, 0, 0, None).is_none());
    }
}
