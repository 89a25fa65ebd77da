use ahash::AHashMap;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Anything usable as an item id: equality, hash, and a total order.
///
/// Blanket-implemented, so `&str`, `String`, integers, and similar
/// value types all qualify out of the box.
pub trait Item: Clone + Eq + Hash + Ord + Debug {}

impl<T: Clone + Eq + Hash + Ord + Debug> Item for T {}

/// Dense integer id for an interned item. The mining hot path works
/// exclusively on these.
pub(crate) type ItemId = u32;

/// Sequence index within a database.
pub(crate) type SequenceId = u32;

/// Maps caller items to dense ids and back.
///
/// Ids are assigned in the items' natural sort order, so id order and
/// natural order coincide: sorting an interned itemset by id yields
/// the canonical iteration order.
#[derive(Debug, Clone)]
pub(crate) struct Interner<T> {
    items: Vec<T>,
    index: AHashMap<T, ItemId>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: AHashMap::new(),
        }
    }
}

impl<T: Item> Interner<T> {
    /// Build an interner over the full universe of items.
    pub(crate) fn from_universe<I: IntoIterator<Item = T>>(universe: I) -> Self {
        let sorted: BTreeSet<T> = universe.into_iter().collect();
        let items: Vec<T> = sorted.into_iter().collect();
        let index = items
            .iter()
            .enumerate()
            .map(|(id, item)| (item.clone(), id as ItemId))
            .collect();
        Self { items, index }
    }

    pub(crate) fn get(&self, item: &T) -> Option<ItemId> {
        self.index.get(item).copied()
    }

    pub(crate) fn resolve(&self, id: ItemId) -> &T {
        &self.items[id as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
