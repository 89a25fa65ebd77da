use crate::database::Context;
use crate::item::ItemId;
use crate::rule::{ContextDistribution, Rule, RulesDatabase};
use std::collections::BTreeMap;

/// Attach to every rule the `quantile`-th percentile of the elapsed
/// time between the position completing the antecedent and the next
/// occurrence of the consequent's first item, over all sequences in
/// which the rule occurs.
pub(crate) fn attach_delta_t(
    rules: &mut RulesDatabase,
    sequences: &[Vec<ItemId>],
    timestamps: &[Vec<i64>],
    quantile: u8,
) {
    for rule in rules.iter_mut() {
        let target = rule.consequent().first();
        let mut samples = Vec::new();
        for (sid, sequence) in sequences.iter().enumerate() {
            let Some(anchor) = rule.match_anchor(sequence) else {
                continue;
            };
            if let Some(offset) = sequence[anchor + 1..].iter().position(|&x| x == target) {
                let ts = &timestamps[sid];
                samples.push((ts[anchor + 1 + offset] - ts[anchor]) as f64);
            }
        }
        rule.set_delta_t(percentile(samples, quantile as f64));
    }
}

/// Attach per-rule day and hour distributions.
///
/// Within a rule, context values are counted at the anchor position of
/// every matching sequence and normalized to `P(value | rule)`, then
/// weighted by the rule's support. Across the rule set, each value's
/// weights are rescaled to sum to 1, giving `P(rule | value)`.
pub(crate) fn attach_contexts(
    rules: &mut RulesDatabase,
    sequences: &[Vec<ItemId>],
    contexts: &[Vec<Context>],
) {
    for rule in rules.iter_mut() {
        let mut day_counts: BTreeMap<u32, usize> = BTreeMap::new();
        let mut hour_counts: BTreeMap<u32, usize> = BTreeMap::new();
        let mut matches = 0usize;
        for (sid, sequence) in sequences.iter().enumerate() {
            let Some(anchor) = rule.match_anchor(sequence) else {
                continue;
            };
            let context = contexts[sid][anchor];
            *day_counts.entry(context.day).or_insert(0) += 1;
            *hour_counts.entry(context.hour).or_insert(0) += 1;
            matches += 1;
        }
        let support = rule.support();
        rule.set_day_probability(joint_weights(day_counts, matches, support));
        rule.set_hour_probability(joint_weights(hour_counts, matches, support));
    }

    normalize_across_rules(rules, Rule::day_probability_mut);
    normalize_across_rules(rules, Rule::hour_probability_mut);
}

/// `P(value | rule) · support(rule)` per context value.
fn joint_weights(counts: BTreeMap<u32, usize>, matches: usize, support: f64) -> ContextDistribution {
    if matches == 0 {
        return ContextDistribution::new();
    }
    counts
        .into_iter()
        .map(|(value, count)| (value, count as f64 / matches as f64 * support))
        .collect()
}

/// Rescale one context dimension so every value's weights sum to 1
/// over the rule set.
fn normalize_across_rules(
    rules: &mut RulesDatabase,
    dimension: fn(&mut Rule) -> &mut ContextDistribution,
) {
    let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
    for rule in rules.iter_mut() {
        for (&value, &weight) in dimension(rule).iter() {
            *totals.entry(value).or_insert(0.0) += weight;
        }
    }
    for rule in rules.iter_mut() {
        for (value, weight) in dimension(rule).iter_mut() {
            let total = totals[value];
            if total > 0.0 {
                *weight /= total;
            }
        }
    }
}

/// Percentile with linear interpolation between order statistics.
pub(crate) fn percentile(mut samples: Vec<f64>, q: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (samples.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(samples[lo]);
    }
    let frac = rank - lo as f64;
    Some(samples[lo] + frac * (samples[hi] - samples[lo]))
}
