use crate::item::ItemId;
use ahash::{AHashMap, AHashSet};

/// Sparse co-occurrence matrix: unordered item pair -> fraction of
/// sequences containing both items. Pairs that never co-occur are
/// absent and read as 0. An expansion joining sibling items `c` and
/// `d` is abandoned when `support(c, d) < minsup`.
#[derive(Debug, Default)]
pub(crate) struct CooccurrenceTable {
    supports: AHashMap<(ItemId, ItemId), f64>,
}

impl CooccurrenceTable {
    pub(crate) fn build(sequences: &[Vec<ItemId>]) -> Self {
        let total = sequences.len() as f64;
        let mut counts: AHashMap<(ItemId, ItemId), usize> = AHashMap::new();
        for sequence in sequences {
            let distinct: AHashSet<ItemId> = sequence.iter().copied().collect();
            let mut items: Vec<ItemId> = distinct.into_iter().collect();
            items.sort_unstable();
            for i in 0..items.len() {
                for j in (i + 1)..items.len() {
                    *counts.entry((items[i], items[j])).or_insert(0) += 1;
                }
            }
        }
        let supports = counts
            .into_iter()
            .map(|(pair, count)| (pair, count as f64 / total))
            .collect();
        Self { supports }
    }

    pub(crate) fn support(&self, a: ItemId, b: ItemId) -> f64 {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.supports.get(&key).copied().unwrap_or(0.0)
    }

    pub(crate) fn len(&self) -> usize {
        self.supports.len()
    }
}
