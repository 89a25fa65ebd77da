use serde::{Deserialize, Serialize};

/// Counters populated during `fit`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MiningStats {
    pub distinct_items: usize,
    pub scm_entries: usize,
    pub frequent_singleton_rules: usize,
    pub expansions_tried: usize,
    pub expansions_pruned: usize,
    pub valid_rules: usize,
}

impl MiningStats {
    pub fn new() -> Self {
        Self::default()
    }
}
