mod enrich;
mod scm;
mod search;
pub mod stats;

use crate::config::MinerConfig;
use crate::database::SequenceDatabase;
use crate::errors::{MinerError, Result};
use crate::export;
use crate::item::{Interner, Item, ItemId};
use crate::itemset::Itemset;
use crate::predict::{self, Prediction, PredictionQuery};
use crate::rule::RulesDatabase;
use ahash::AHashSet;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Sequential rule miner and next-action predictor.
///
/// `fit` discovers the valid rule set from a sequence database;
/// `add_delta_t` and `add_contexts` enrich it with timing and context
/// estimates; `predict` matches the enriched rules against a live
/// window. All state is owned by the miner, so separate instances can
/// fit concurrently.
pub struct RuleMiner<T: Item> {
    config: MinerConfig,
    interner: Interner<T>,
    rules: RulesDatabase,
    stats: stats::MiningStats,
}

impl<T: Item> RuleMiner<T> {
    /// Create a new miner with the given configuration
    pub fn new(config: MinerConfig) -> Self {
        Self {
            config,
            interner: Interner::default(),
            rules: RulesDatabase::default(),
            stats: stats::MiningStats::default(),
        }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// The valid rule set from the last `fit` or rule-table load.
    pub fn rules(&self) -> &RulesDatabase {
        &self.rules
    }

    /// Counters from the last `fit`
    pub fn stats(&self) -> &stats::MiningStats {
        &self.stats
    }

    /// Map an itemset from this miner's rules back to caller items,
    /// in canonical order.
    pub fn resolve_items(&self, itemset: &Itemset) -> Vec<&T> {
        itemset
            .items()
            .iter()
            .map(|&id| self.interner.resolve(id))
            .collect()
    }

    /// Mine the valid rule set from `database`, replacing any rules
    /// held so far.
    pub fn fit(&mut self, database: &SequenceDatabase<T>) -> Result<()> {
        self.config.validate()?;
        if database.is_empty() {
            return Err(MinerError::InvalidInput(
                "sequence database is empty".to_string(),
            ));
        }

        let interner =
            Interner::from_universe(database.sequences().iter().flatten().cloned());
        let sequences = intern_sequences(database, &interner);

        let search = search::Search::new(
            &sequences,
            interner.len(),
            self.config.min_support,
            self.config.min_confidence,
            self.config.single_consequent,
        );
        let (valid, stats) = search.run();

        self.rules = RulesDatabase::from_set(valid);
        self.stats = stats;
        self.interner = interner;
        log::info!(
            "mined {} valid rules from {} sequences over {} items",
            self.rules.len(),
            database.len(),
            self.stats.distinct_items
        );
        Ok(())
    }

    /// Estimate every rule's deltaT from the database's timestamps.
    pub fn add_delta_t(&mut self, database: &SequenceDatabase<T>) -> Result<()> {
        let timestamps = database.timestamps().ok_or_else(|| {
            MinerError::InvalidInput("database carries no timestamps".to_string())
        })?;
        let sequences = intern_sequences(database, &self.interner);
        enrich::attach_delta_t(&mut self.rules, &sequences, timestamps, self.config.quantile);
        Ok(())
    }

    /// Build every rule's day and hour probability distributions from
    /// the database's context tags.
    pub fn add_contexts(&mut self, database: &SequenceDatabase<T>) -> Result<()> {
        let contexts = database.contexts().ok_or_else(|| {
            MinerError::InvalidInput("database carries no context tags".to_string())
        })?;
        let sequences = intern_sequences(database, &self.interner);
        enrich::attach_contexts(&mut self.rules, &sequences, contexts);
        Ok(())
    }

    /// Predict the next action for the query window.
    ///
    /// Never fails: an unfitted miner, an empty window, or a window
    /// whose last event matches no rule all yield an empty prediction.
    pub fn predict(&self, query: &PredictionQuery<'_, T>) -> Prediction<T> {
        if self.rules.is_empty() {
            return Prediction::none();
        }
        let window: Vec<ItemId> = query
            .window
            .iter()
            .map(|item| self.interner.get(item).unwrap_or(ItemId::MAX))
            .collect();
        let hidden: AHashSet<ItemId> = query
            .hidden_items
            .iter()
            .filter_map(|item| self.interner.get(item))
            .collect();

        match predict::select(
            &self.rules,
            &self.config.weights,
            &window,
            &hidden,
            query.day,
            query.hour,
            query.min_threshold,
        ) {
            Some(rule) => Prediction {
                action: Some(self.interner.resolve(rule.consequent().first()).clone()),
                delta: rule.delta_t(),
            },
            None => Prediction::none(),
        }
    }
}

impl<T: Item + Display> RuleMiner<T> {
    /// Render the rule set as the canonical CSV table.
    pub fn rules_csv(&self) -> String {
        export::csv::write_rules(&self.rules, &self.interner)
    }

    /// Write the rule table to a file.
    pub fn write_rules_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.rules_csv())?;
        Ok(())
    }
}

impl<T: Item + FromStr> RuleMiner<T> {
    /// Replace the rule set with one loaded from a rule table file.
    pub fn load_rules_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let (rules, interner) = export::csv::read_rules(path)?;
        self.rules = rules;
        self.interner = interner;
        Ok(())
    }
}

/// Interned view of the database's sequences. Items unknown to the
/// interner map to an id that matches no rule, so enrichment and
/// prediction against a later database simply ignore them.
fn intern_sequences<T: Item>(
    database: &SequenceDatabase<T>,
    interner: &Interner<T>,
) -> Vec<Vec<ItemId>> {
    database
        .sequences()
        .iter()
        .map(|sequence| {
            sequence
                .iter()
                .map(|item| interner.get(item).unwrap_or(ItemId::MAX))
                .collect()
        })
        .collect()
}
