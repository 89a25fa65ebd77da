use crate::item::{ItemId, SequenceId};
use ahash::AHashMap;

/// Unordered, duplicate-free set of interned items.
///
/// Stored sorted, so equality, hashing, and iteration order all
/// depend only on the element set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Itemset {
    items: Vec<ItemId>,
}

impl Itemset {
    pub(crate) fn new(mut items: Vec<ItemId>) -> Self {
        items.sort_unstable();
        items.dedup();
        Self { items }
    }

    pub(crate) fn singleton(item: ItemId) -> Self {
        Self { items: vec![item] }
    }

    /// The set with one extra item, preserving canonical order.
    pub(crate) fn with_item(&self, extra: ItemId) -> Self {
        let mut items = self.items.clone();
        match items.binary_search(&extra) {
            Ok(_) => {}
            Err(pos) => items.insert(pos, extra),
        }
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub(crate) fn contains(&self, item: ItemId) -> bool {
        self.items.binary_search(&item).is_ok()
    }

    /// All elements but the last, in canonical order.
    pub(crate) fn prefix(&self) -> &[ItemId] {
        &self.items[..self.items.len() - 1]
    }

    pub(crate) fn last(&self) -> ItemId {
        *self.items.last().expect("itemset is never empty")
    }

    pub(crate) fn first(&self) -> ItemId {
        self.items[0]
    }

    pub(crate) fn is_disjoint(&self, other: &Itemset) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.items.len() && j < other.items.len() {
            match self.items[i].cmp(&other.items[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => return false,
            }
        }
        true
    }

    /// True when every element appears somewhere in `sequence`.
    pub(crate) fn occurs_in(&self, sequence: &[ItemId]) -> bool {
        self.items
            .iter()
            .all(|item| sequence.contains(item))
    }
}

/// For one itemset: `sid -> (first, last)` over the sequences that
/// contain every element. `first` is the max over per-item first
/// positions, `last` the min over per-item last positions, so that
/// `antecedent.first < consequent.last` detects strict precedence.
pub(crate) type OccurrenceMap = AHashMap<SequenceId, (u32, u32)>;

/// Per-item occurrence maps for the whole database, indexed by item id.
/// For a single item, first and last are simply its first and last
/// positions in the sequence.
pub(crate) fn item_occurrences(sequences: &[Vec<ItemId>], universe: usize) -> Vec<OccurrenceMap> {
    let mut maps: Vec<OccurrenceMap> = vec![OccurrenceMap::default(); universe];
    for (sid, sequence) in sequences.iter().enumerate() {
        for (pos, &item) in sequence.iter().enumerate() {
            let entry = maps[item as usize]
                .entry(sid as SequenceId)
                .or_insert((pos as u32, pos as u32));
            entry.1 = pos as u32;
        }
    }
    maps
}

/// Occurrence map of an itemset extended by one item: keep only the
/// sequences containing the extra item, taking max-of-firsts and
/// min-of-lasts per sequence.
pub(crate) fn restrict(base: &OccurrenceMap, extra: &OccurrenceMap) -> OccurrenceMap {
    let (small, large) = if base.len() <= extra.len() {
        (base, extra)
    } else {
        (extra, base)
    };
    small
        .iter()
        .filter_map(|(&sid, &(f1, l1))| {
            large
                .get(&sid)
                .map(|&(f2, l2)| (sid, (f1.max(f2), l1.min(l2))))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_and_dedup() {
        let a = Itemset::new(vec![3, 1, 2, 1]);
        let b = Itemset::new(vec![1, 2, 3]);
        assert_eq!(a, b);
        assert_eq!(a.items(), &[1, 2, 3]);
        assert_eq!(a.prefix(), &[1, 2]);
        assert_eq!(a.last(), 3);
    }

    #[test]
    fn with_item_keeps_order() {
        let a = Itemset::new(vec![1, 4]);
        assert_eq!(a.with_item(2).items(), &[1, 2, 4]);
        assert_eq!(a.with_item(4).items(), &[1, 4]);
    }

    #[test]
    fn disjointness() {
        let a = Itemset::new(vec![1, 3]);
        let b = Itemset::new(vec![2, 4]);
        let c = Itemset::new(vec![3, 5]);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
    }

    #[test]
    fn per_item_occurrences_track_first_and_last() {
        // item 0 at positions 0 and 3, item 1 at position 1
        let sequences = vec![vec![0, 1, 2, 0], vec![2, 2]];
        let maps = item_occurrences(&sequences, 3);
        assert_eq!(maps[0].get(&0), Some(&(0, 3)));
        assert_eq!(maps[1].get(&0), Some(&(1, 1)));
        assert_eq!(maps[0].get(&1), None);
        assert_eq!(maps[2].get(&1), Some(&(0, 1)));
    }

    #[test]
    fn restrict_takes_max_first_min_last() {
        let mut base = OccurrenceMap::default();
        base.insert(0, (1, 5));
        base.insert(1, (0, 2));
        let mut extra = OccurrenceMap::default();
        extra.insert(0, (3, 4));
        let joined = restrict(&base, &extra);
        assert_eq!(joined.get(&0), Some(&(3, 4)));
        assert_eq!(joined.get(&1), None);
    }
}
