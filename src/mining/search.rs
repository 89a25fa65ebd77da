use crate::item::ItemId;
use crate::itemset::{item_occurrences, restrict, Itemset, OccurrenceMap};
use crate::mining::scm::CooccurrenceTable;
use crate::mining::stats::MiningStats;
use crate::rule::Rule;
use ahash::{AHashMap, AHashSet};

/// A frequent rule mid-expansion, carrying the occurrence maps of
/// both sides so children can be joined incrementally.
#[derive(Debug, Clone)]
struct Candidate {
    rule: Rule,
    ant_occ: OccurrenceMap,
    cons_occ: OccurrenceMap,
}

/// One `fit` invocation's worth of search state: the SCM pruning
/// table, per-item occurrence maps, the left store fed by right
/// expansions, and the growing valid rule set.
pub(crate) struct Search<'a> {
    sequences: &'a [Vec<ItemId>],
    min_support: f64,
    min_confidence: f64,
    single_consequent: bool,
    scm: CooccurrenceTable,
    item_occ: Vec<OccurrenceMap>,
    left_store: AHashMap<Itemset, Vec<Candidate>>,
    valid: AHashSet<Rule>,
    stats: MiningStats,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        sequences: &'a [Vec<ItemId>],
        universe: usize,
        min_support: f64,
        min_confidence: f64,
        single_consequent: bool,
    ) -> Self {
        let scm = CooccurrenceTable::build(sequences);
        let item_occ = item_occurrences(sequences, universe);
        let mut stats = MiningStats::new();
        stats.distinct_items = universe;
        stats.scm_entries = scm.len();
        Self {
            sequences,
            min_support,
            min_confidence,
            single_consequent,
            scm,
            item_occ,
            left_store: AHashMap::new(),
            valid: AHashSet::new(),
            stats,
        }
    }

    pub(crate) fn run(mut self) -> (AHashSet<Rule>, MiningStats) {
        let (left_classes, right_classes) = self.first_scan();
        log::debug!(
            "first scan: {} frequent 1x1 rules across {} left / {} right classes",
            self.stats.frequent_singleton_rules,
            left_classes.len(),
            right_classes.len()
        );

        if !self.single_consequent {
            for class in left_classes {
                self.left_search(class);
            }
        }
        for class in right_classes {
            self.right_search(class);
        }
        if !self.single_consequent {
            let store = std::mem::take(&mut self.left_store);
            log::debug!("replaying {} left-store classes", store.len());
            for class in store.into_values() {
                self.left_search(class);
            }
        }

        self.stats.valid_rules = self.valid.len();
        (self.valid, self.stats)
    }

    /// Build all frequent singleton -> singleton rules and group them
    /// into left classes (shared antecedent) and right classes
    /// (shared consequent).
    #[allow(clippy::type_complexity)]
    fn first_scan(&mut self) -> (Vec<Vec<Candidate>>, Vec<Vec<Candidate>>) {
        let universe = self.item_occ.len() as ItemId;
        let total = self.sequences.len() as f64;
        let mut left: AHashMap<ItemId, Vec<Candidate>> = AHashMap::new();
        let mut right: AHashMap<ItemId, Vec<Candidate>> = AHashMap::new();

        for a in 0..universe {
            for c in 0..universe {
                if a == c {
                    continue;
                }
                let ant_occ = &self.item_occ[a as usize];
                let cons_occ = &self.item_occ[c as usize];
                let support = occurrence_support(ant_occ, cons_occ, total);
                if support < self.min_support {
                    continue;
                }
                self.stats.frequent_singleton_rules += 1;
                let confidence = occurrence_confidence(support, ant_occ, total);
                let rule = Rule::new(
                    Itemset::singleton(a),
                    Itemset::singleton(c),
                    support,
                    confidence,
                );
                if confidence >= self.min_confidence {
                    self.valid.insert(rule.clone());
                }
                let candidate = Candidate {
                    rule,
                    ant_occ: ant_occ.clone(),
                    cons_occ: cons_occ.clone(),
                };
                left.entry(a).or_default().push(candidate.clone());
                right.entry(c).or_default().push(candidate);
            }
        }

        (left.into_values().collect(), right.into_values().collect())
    }

    /// Grow consequents within a class of rules sharing an antecedent.
    /// Levels are processed as a worklist; every member of a level has
    /// the same consequent cardinality.
    fn left_search(&mut self, class: Vec<Candidate>) {
        let mut level = class;
        while level.len() > 1 {
            let mut next = Vec::new();
            for i in 0..level.len() {
                for j in (i + 1)..level.len() {
                    if let Some(candidate) = self.expand_left(&level[i], &level[j]) {
                        next.push(candidate);
                    }
                }
            }
            level = next;
        }
    }

    /// Grow antecedents within a class of rules sharing a consequent.
    /// Each frequent expansion is also recorded in the left store so a
    /// final left-search pass can grow its consequent in turn.
    fn right_search(&mut self, class: Vec<Candidate>) {
        let mut level = class;
        while level.len() > 1 {
            let mut next = Vec::new();
            for i in 0..level.len() {
                for j in (i + 1)..level.len() {
                    if let Some(candidate) = self.expand_right(&level[i], &level[j]) {
                        if !self.single_consequent {
                            self.left_store
                                .entry(candidate.rule.antecedent().clone())
                                .or_default()
                                .push(candidate.clone());
                        }
                        next.push(candidate);
                    }
                }
            }
            level = next;
        }
    }

    /// Join two siblings whose sorted consequents differ only in the
    /// last element, yielding `W -> Yr ∪ {d}` if it survives the SCM
    /// check and the support threshold.
    fn expand_left(&mut self, r: &Candidate, s: &Candidate) -> Option<Candidate> {
        let yr = r.rule.consequent();
        let ys = s.rule.consequent();
        if yr.prefix() != ys.prefix() {
            return None;
        }
        let (c, d) = (yr.last(), ys.last());
        self.stats.expansions_tried += 1;
        if self.scm.support(c, d) < self.min_support {
            self.stats.expansions_pruned += 1;
            return None;
        }

        let consequent = yr.with_item(d);
        let cons_occ = restrict(&r.cons_occ, &self.item_occ[d as usize]);
        let total = self.sequences.len() as f64;
        let support = occurrence_support(&r.ant_occ, &cons_occ, total);
        if support < self.min_support {
            return None;
        }
        let confidence = occurrence_confidence(support, &r.ant_occ, total);
        let rule = Rule::new(r.rule.antecedent().clone(), consequent, support, confidence);
        if confidence >= self.min_confidence {
            self.valid.insert(rule.clone());
        }
        Some(Candidate {
            rule,
            ant_occ: r.ant_occ.clone(),
            cons_occ,
        })
    }

    /// Mirror of `expand_left` over antecedents: `Xr ∪ {d} -> W`.
    fn expand_right(&mut self, r: &Candidate, s: &Candidate) -> Option<Candidate> {
        let xr = r.rule.antecedent();
        let xs = s.rule.antecedent();
        if xr.prefix() != xs.prefix() {
            return None;
        }
        let (c, d) = (xr.last(), xs.last());
        self.stats.expansions_tried += 1;
        if self.scm.support(c, d) < self.min_support {
            self.stats.expansions_pruned += 1;
            return None;
        }

        let antecedent = xr.with_item(d);
        let ant_occ = restrict(&r.ant_occ, &self.item_occ[d as usize]);
        let total = self.sequences.len() as f64;
        let support = occurrence_support(&ant_occ, &r.cons_occ, total);
        if support < self.min_support {
            return None;
        }
        let confidence = occurrence_confidence(support, &ant_occ, total);
        let rule = Rule::new(antecedent, r.rule.consequent().clone(), support, confidence);
        if confidence >= self.min_confidence {
            self.valid.insert(rule.clone());
        }
        Some(Candidate {
            rule,
            ant_occ,
            cons_occ: r.cons_occ.clone(),
        })
    }
}

/// Fraction of sequences in which the antecedent strictly precedes
/// the consequent, read off the two occurrence maps.
fn occurrence_support(ant: &OccurrenceMap, cons: &OccurrenceMap, total: f64) -> f64 {
    let mut count = 0usize;
    if ant.len() <= cons.len() {
        for (sid, &(first, _)) in ant {
            if let Some(&(_, last)) = cons.get(sid) {
                if first < last {
                    count += 1;
                }
            }
        }
    } else {
        for (sid, &(_, last)) in cons {
            if let Some(&(first, _)) = ant.get(sid) {
                if first < last {
                    count += 1;
                }
            }
        }
    }
    count as f64 / total
}

/// `support · |SDB| / |sequences containing the antecedent|`, with an
/// empty antecedent extent defined as confidence 0.
fn occurrence_confidence(support: f64, ant: &OccurrenceMap, total: f64) -> f64 {
    if ant.is_empty() {
        0.0
    } else {
        support * total / ant.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_search(
        sequences: &[Vec<ItemId>],
        universe: usize,
        min_support: f64,
        min_confidence: f64,
        single_consequent: bool,
    ) -> (AHashSet<Rule>, MiningStats) {
        Search::new(sequences, universe, min_support, min_confidence, single_consequent).run()
    }

    fn has_rule(rules: &AHashSet<Rule>, antecedent: &[ItemId], consequent: &[ItemId]) -> bool {
        rules.contains(&Rule::new(
            Itemset::new(antecedent.to_vec()),
            Itemset::new(consequent.to_vec()),
            0.0,
            0.0,
        ))
    }

    #[test]
    fn singleton_rules_match_expected_metrics() {
        // a=0, b=1, c=2
        let sequences = vec![vec![0, 1, 2], vec![0, 1, 2], vec![0, 2]];
        let (rules, _) = run_search(&sequences, 3, 0.5, 0.6, true);

        assert!(has_rule(&rules, &[0], &[1]));
        assert!(has_rule(&rules, &[0], &[2]));
        assert!(has_rule(&rules, &[1], &[2]));
        assert!(!has_rule(&rules, &[2], &[0]));

        let a_to_b = rules
            .iter()
            .find(|r| r.antecedent().items() == [0] && r.consequent().items() == [1])
            .unwrap();
        assert!((a_to_b.support() - 2.0 / 3.0).abs() < 1e-12);
        assert!((a_to_b.confidence() - 2.0 / 3.0).abs() < 1e-12);

        let a_to_c = rules
            .iter()
            .find(|r| r.antecedent().items() == [0] && r.consequent().items() == [2])
            .unwrap();
        assert_eq!(a_to_c.support(), 1.0);
        assert_eq!(a_to_c.confidence(), 1.0);

        let b_to_c = rules
            .iter()
            .find(|r| r.antecedent().items() == [1] && r.consequent().items() == [2])
            .unwrap();
        assert!((b_to_c.support() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(b_to_c.confidence(), 1.0);
    }

    #[test]
    fn scm_blocks_every_expansion() {
        // Pairwise co-occurrence is 1/3 everywhere, below minsup 0.5.
        let sequences = vec![vec![0, 1], vec![0, 2], vec![1, 2]];
        let (rules, _) = run_search(&sequences, 3, 0.5, 0.1, false);
        assert!(rules
            .iter()
            .all(|r| r.antecedent().len() == 1 && r.consequent().len() == 1));

        // Frequent siblings whose expansion items never co-occur: the
        // SCM rejects the join before any support counting happens.
        let sequences = vec![vec![0, 2], vec![1, 2], vec![0, 2], vec![1, 2]];
        let (rules, stats) = run_search(&sequences, 3, 0.5, 0.1, false);
        assert!(rules
            .iter()
            .all(|r| r.antecedent().len() == 1 && r.consequent().len() == 1));
        assert!(stats.expansions_tried > 0);
        assert_eq!(stats.expansions_tried, stats.expansions_pruned);
    }

    #[test]
    fn multi_item_rules_emerge_without_single_consequent() {
        let sequences = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![1, 0, 2, 3],
            vec![0, 1, 3, 2],
        ];
        let (rules, _) = run_search(&sequences, 4, 0.5, 0.5, false);

        // consequent expansion from the {0} left class
        assert!(has_rule(&rules, &[0], &[2, 3]));
        // antecedent expansion from the {3} right class... {0,1} -> {3}
        assert!(has_rule(&rules, &[0, 1], &[3]));
        // left-store replay: multi-antecedent, multi-consequent
        assert!(has_rule(&rules, &[0, 1], &[2, 3]));
    }

    #[test]
    fn single_consequent_restricts_output() {
        let sequences = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![1, 0, 2, 3],
            vec![0, 1, 3, 2],
        ];
        let (rules, _) = run_search(&sequences, 4, 0.5, 0.5, true);
        assert!(rules.iter().all(|r| r.consequent().len() == 1));
        // antecedent growth is still allowed
        assert!(has_rule(&rules, &[0, 1], &[3]));
    }

    #[test]
    fn valid_rules_satisfy_both_thresholds() {
        let sequences = vec![
            vec![0, 1, 2],
            vec![0, 2, 1],
            vec![1, 2, 0],
            vec![2, 0, 1],
            vec![0, 1],
        ];
        let (rules, _) = run_search(&sequences, 3, 0.3, 0.4, false);
        for rule in &rules {
            assert!(rule.support() >= 0.3, "{:?}", rule);
            assert!(rule.confidence() >= 0.4, "{:?}", rule);
            assert!(rule.confidence() <= 1.0 + 1e-12, "{:?}", rule);
        }
    }

    #[test]
    fn antecedent_expansion_never_raises_support() {
        let sequences = vec![
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3],
            vec![1, 0, 2, 3],
            vec![0, 1, 3, 2],
        ];
        let (rules, _) = run_search(&sequences, 4, 0.25, 0.25, false);
        for rule in &rules {
            if rule.antecedent().len() < 2 {
                continue;
            }
            for &dropped in rule.antecedent().items() {
                let reduced: Vec<ItemId> = rule
                    .antecedent()
                    .items()
                    .iter()
                    .copied()
                    .filter(|&x| x != dropped)
                    .collect();
                let parent = Rule::new(
                    Itemset::new(reduced),
                    rule.consequent().clone(),
                    0.0,
                    0.0,
                );
                let parent_support = sequences
                    .iter()
                    .filter(|s| parent.occurs(s))
                    .count() as f64
                    / sequences.len() as f64;
                assert!(rule.support() <= parent_support + 1e-12);
            }
        }
    }

    #[test]
    fn search_is_deterministic() {
        let sequences = vec![
            vec![0, 1, 2, 3],
            vec![3, 2, 1, 0],
            vec![0, 2, 1, 3],
            vec![1, 0, 3, 2],
        ];
        let (first, _) = run_search(&sequences, 4, 0.25, 0.25, false);
        let (second, _) = run_search(&sequences, 4, 0.25, 0.25, false);
        assert_eq!(first, second);
    }

    #[test]
    fn single_sequence_database() {
        let sequences = vec![vec![0, 1, 2]];
        let (rules, _) = run_search(&sequences, 3, 0.5, 0.5, true);
        for rule in &rules {
            assert_eq!(rule.support(), 1.0);
            assert_eq!(rule.confidence(), 1.0);
        }
        assert!(has_rule(&rules, &[0], &[1]));
        assert!(has_rule(&rules, &[0], &[2]));
        assert!(has_rule(&rules, &[1], &[2]));
        assert!(!has_rule(&rules, &[1], &[0]));
    }

    /// The occurrence-map path must agree with the split-index oracle
    /// on every mined rule.
    #[test]
    fn mined_support_matches_occurs_oracle() {
        let sequences = vec![
            vec![0, 1, 2, 3, 1],
            vec![2, 0, 1, 3],
            vec![0, 3, 2, 1],
            vec![1, 2, 3],
            vec![3, 0, 1, 2],
        ];
        let (rules, _) = run_search(&sequences, 4, 0.2, 0.2, false);
        for rule in &rules {
            let oracle = sequences.iter().filter(|s| rule.occurs(s)).count() as f64
                / sequences.len() as f64;
            assert!(
                (rule.support() - oracle).abs() < 1e-12,
                "support mismatch for {:?}",
                rule
            );
        }
    }
}
