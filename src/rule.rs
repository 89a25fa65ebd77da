use crate::item::ItemId;
use crate::itemset::Itemset;
use ahash::AHashSet;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Probability distribution over one context dimension, keyed by
/// context value. Kept sorted for canonical serialization.
pub type ContextDistribution = BTreeMap<u32, f64>;

/// A sequential rule `antecedent -> consequent` over disjoint
/// itemsets, with the metrics cached during mining and enrichment.
///
/// Identity (equality, hashing, ordering) depends only on the two
/// itemsets, never on the cached metrics.
#[derive(Debug, Clone)]
pub struct Rule {
    antecedent: Itemset,
    consequent: Itemset,
    support: f64,
    confidence: f64,
    delta_t: Option<f64>,
    day_probability: ContextDistribution,
    hour_probability: ContextDistribution,
}

impl Rule {
    pub(crate) fn new(antecedent: Itemset, consequent: Itemset, support: f64, confidence: f64) -> Self {
        debug_assert!(antecedent.is_disjoint(&consequent));
        Self {
            antecedent,
            consequent,
            support,
            confidence,
            delta_t: None,
            day_probability: ContextDistribution::new(),
            hour_probability: ContextDistribution::new(),
        }
    }

    pub fn antecedent(&self) -> &Itemset {
        &self.antecedent
    }

    pub fn consequent(&self) -> &Itemset {
        &self.consequent
    }

    /// Fraction of sequences in which the rule occurs.
    pub fn support(&self) -> f64 {
        self.support
    }

    /// Fraction of antecedent-containing sequences in which the rule occurs.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Estimated elapsed time between antecedent completion and the
    /// consequent, if enrichment ran over timestamped data.
    pub fn delta_t(&self) -> Option<f64> {
        self.delta_t
    }

    pub fn day_probability(&self) -> &ContextDistribution {
        &self.day_probability
    }

    pub fn hour_probability(&self) -> &ContextDistribution {
        &self.hour_probability
    }

    pub(crate) fn set_delta_t(&mut self, delta_t: Option<f64>) {
        self.delta_t = delta_t;
    }

    pub(crate) fn set_day_probability(&mut self, dist: ContextDistribution) {
        self.day_probability = dist;
    }

    pub(crate) fn set_hour_probability(&mut self, dist: ContextDistribution) {
        self.hour_probability = dist;
    }

    pub(crate) fn day_probability_mut(&mut self) -> &mut ContextDistribution {
        &mut self.day_probability
    }

    pub(crate) fn hour_probability_mut(&mut self) -> &mut ContextDistribution {
        &mut self.hour_probability
    }

    /// True when the rule occurs in `sequence`: some split index `i`
    /// has every antecedent item in `sequence[..i]` and every
    /// consequent item in `sequence[i..]`. Such an index exists iff
    /// the latest first-occurrence of an antecedent item precedes the
    /// earliest last-occurrence of a consequent item.
    pub(crate) fn occurs(&self, sequence: &[ItemId]) -> bool {
        match (
            antecedent_first_bound(&self.antecedent, sequence),
            consequent_last_bound(&self.consequent, sequence),
        ) {
            (Some(first), Some(last)) => first < last,
            _ => false,
        }
    }

    /// Position of the antecedent item completing the rule's
    /// antecedent, for sequences in which the rule occurs.
    pub(crate) fn match_anchor(&self, sequence: &[ItemId]) -> Option<usize> {
        let first = antecedent_first_bound(&self.antecedent, sequence)?;
        let last = consequent_last_bound(&self.consequent, sequence)?;
        (first < last).then_some(first)
    }
}

/// Max over antecedent items of their first position; None when an
/// item is absent.
fn antecedent_first_bound(antecedent: &Itemset, sequence: &[ItemId]) -> Option<usize> {
    antecedent
        .items()
        .iter()
        .map(|&item| sequence.iter().position(|&x| x == item))
        .try_fold(0usize, |acc, pos| pos.map(|p| acc.max(p)))
}

/// Min over consequent items of their last position; None when an
/// item is absent.
fn consequent_last_bound(consequent: &Itemset, sequence: &[ItemId]) -> Option<usize> {
    consequent
        .items()
        .iter()
        .map(|&item| sequence.iter().rposition(|&x| x == item))
        .try_fold(usize::MAX, |acc, pos| pos.map(|p| acc.min(p)))
}

impl PartialEq for Rule {
    fn eq(&self, other: &Rule) -> bool {
        self.antecedent == other.antecedent && self.consequent == other.consequent
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.antecedent.hash(state);
        self.consequent.hash(state);
    }
}

impl PartialOrd for Rule {
    fn partial_cmp(&self, other: &Rule) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rule {
    fn cmp(&self, other: &Rule) -> Ordering {
        self.antecedent
            .cmp(&other.antecedent)
            .then_with(|| self.consequent.cmp(&other.consequent))
    }
}

/// The valid rule set produced by `fit`, held in deterministic
/// `(antecedent, consequent)` order.
#[derive(Debug, Clone, Default)]
pub struct RulesDatabase {
    rules: Vec<Rule>,
}

impl RulesDatabase {
    pub(crate) fn from_set(set: AHashSet<Rule>) -> Self {
        let mut rules: Vec<Rule> = set.into_iter().collect();
        rules.sort_unstable();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Rule> {
        self.rules.iter_mut()
    }

    pub fn contains(&self, rule: &Rule) -> bool {
        self.rules.binary_search(rule).is_ok()
    }

    /// Insert a rule, preserving deterministic order. Inserting a rule
    /// already present is a no-op.
    pub fn insert(&mut self, rule: Rule) {
        if let Err(pos) = self.rules.binary_search(&rule) {
            self.rules.insert(pos, rule);
        }
    }

    /// Rules sharing `antecedent`, optionally restricted to a
    /// consequent cardinality.
    pub fn left_equivalence(&self, antecedent: &Itemset, consequent_len: Option<usize>) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| {
                r.antecedent() == antecedent
                    && consequent_len.map_or(true, |len| r.consequent().len() == len)
            })
            .collect()
    }

    /// Rules sharing `consequent`, optionally restricted to an
    /// antecedent cardinality.
    pub fn right_equivalence(&self, consequent: &Itemset, antecedent_len: Option<usize>) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| {
                r.consequent() == consequent
                    && antecedent_len.map_or(true, |len| r.antecedent().len() == len)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a RulesDatabase {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
