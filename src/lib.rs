//! # sequential-rule-miner
//!
//! Sequential rule mining and context-aware next-action prediction.
//! Rules of the form `antecedent -> consequent` (both unordered
//! itemsets) are discovered from a database of event sequences by
//! equivalence-class expansion with sparse co-occurrence pruning,
//! enriched with elapsed-time and context-probability estimates, and
//! matched against a live window to suggest the next action.
//!
//! ## Quick Start
//!
//! ```rust
//! use sequential_rule_miner::{MinerConfig, PredictionQuery, RuleMiner, SequenceDatabase};
//!
//! let database = SequenceDatabase::new(vec![
//!     vec!["open", "edit", "save"],
//!     vec!["open", "edit", "save"],
//!     vec!["open", "save"],
//! ]).unwrap();
//!
//! let config = MinerConfig {
//!     min_support: 0.5,
//!     min_confidence: 0.6,
//!     single_consequent: true,
//!     ..Default::default()
//! };
//!
//! let mut miner = RuleMiner::new(config);
//! miner.fit(&database).unwrap();
//!
//! let prediction = miner.predict(&PredictionQuery {
//!     window: &["open", "edit"],
//!     hidden_items: &["edit"],
//!     day: 0,
//!     hour: 9,
//!     min_threshold: None,
//! });
//! assert_eq!(prediction.action, Some("save"));
//! ```

pub mod config;
pub mod database;
pub mod errors;
pub mod history;
pub mod item;
pub mod itemset;
pub mod predict;
pub mod rule;

// Mining and enrichment
pub mod mining;

// Rule-table serialization
pub mod export;

// Re-exports
pub use config::{MinerConfig, ScoreWeights};
pub use database::{Context, SequenceDatabase};
pub use errors::{MinerError, Result};
pub use history::{History, SplitPosition};
pub use item::Item;
pub use itemset::Itemset;
pub use mining::stats::MiningStats;
pub use mining::RuleMiner;
pub use predict::{Prediction, PredictionQuery};
pub use rule::{ContextDistribution, Rule, RulesDatabase};
