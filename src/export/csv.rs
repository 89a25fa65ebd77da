//! Canonical CSV rule table.
//!
//! Columns: `antecedent,consequent,support,confidence,deltaT,score,day,hour`.
//! Item lists use `[a, b]` with elements in canonical order; context
//! distributions use `{value:probability,...}` with sorted keys. Rows
//! are sorted by confidence, then support, both descending. The
//! `score` column is transient state and always exported empty.
//!
//! Floats are written with Rust's shortest round-trip formatting, so
//! export followed by import reproduces every cached metric exactly.

use crate::errors::{MinerError, Result};
use crate::item::{Interner, Item};
use crate::itemset::Itemset;
use crate::rule::{ContextDistribution, Rule, RulesDatabase};
use ahash::AHashSet;
use excelstream::CsvReader;
use std::fmt::Display;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

const HEADER: &str = "antecedent,consequent,support,confidence,deltaT,score,day,hour";

/// Render the rule set as the canonical CSV table.
pub(crate) fn write_rules<T: Item + Display>(
    rules: &RulesDatabase,
    interner: &Interner<T>,
) -> String {
    let mut sorted: Vec<&Rule> = rules.iter().collect();
    sorted.sort_by(|a, b| {
        b.confidence()
            .total_cmp(&a.confidence())
            .then_with(|| b.support().total_cmp(&a.support()))
            .then_with(|| a.cmp(b))
    });

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    for rule in sorted {
        let _ = writeln!(
            out,
            "{},{},{},{},{},,{},{}",
            quote(&format_items(rule.antecedent(), interner)),
            quote(&format_items(rule.consequent(), interner)),
            rule.support(),
            rule.confidence(),
            rule.delta_t().map(|d| d.to_string()).unwrap_or_default(),
            quote(&format_distribution(rule.day_probability())),
            quote(&format_distribution(rule.hour_probability())),
        );
    }
    out
}

/// Parse a rule table file back into a rule set and the interner
/// covering its items.
pub(crate) fn read_rules<T, P>(path: P) -> Result<(RulesDatabase, Interner<T>)>
where
    T: Item + FromStr,
    P: AsRef<Path>,
{
    let mut reader = CsvReader::open(path.as_ref())
        .map_err(|e| MinerError::Serialization(format!("failed to open rule table: {}", e)))?;

    struct ParsedRow<T> {
        antecedent: Vec<T>,
        consequent: Vec<T>,
        support: f64,
        confidence: f64,
        delta_t: Option<f64>,
        day: ContextDistribution,
        hour: ContextDistribution,
    }

    let mut parsed: Vec<ParsedRow<T>> = Vec::new();
    let mut row_idx = 0;
    for row_result in reader.rows() {
        let row = row_result
            .map_err(|e| MinerError::Serialization(format!("failed to read row {}: {}", row_idx, e)))?;
        row_idx += 1;

        // Skip header row
        if row_idx == 1 {
            continue;
        }

        let cells: Vec<String> = row.into_iter().map(|v| v.to_string()).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        if cells.len() < 8 {
            return Err(MinerError::Serialization(format!(
                "row {} has {} columns, expected 8",
                row_idx,
                cells.len()
            )));
        }

        parsed.push(ParsedRow {
            antecedent: parse_items(&cells[0], row_idx)?,
            consequent: parse_items(&cells[1], row_idx)?,
            support: parse_float(&cells[2], row_idx)?,
            confidence: parse_float(&cells[3], row_idx)?,
            delta_t: parse_optional_float(&cells[4], row_idx)?,
            // cells[5] is the transient score, ignored on import
            day: parse_distribution(&cells[6], row_idx)?,
            hour: parse_distribution(&cells[7], row_idx)?,
        });
    }

    let universe = parsed
        .iter()
        .flat_map(|row| row.antecedent.iter().chain(&row.consequent))
        .cloned();
    let interner = Interner::from_universe(universe);

    let mut set = AHashSet::new();
    for row in parsed {
        let intern_all = |items: &[T]| -> Vec<_> {
            items
                .iter()
                .map(|item| interner.get(item).expect("universe covers all rule items"))
                .collect()
        };
        let antecedent = Itemset::new(intern_all(&row.antecedent));
        let consequent = Itemset::new(intern_all(&row.consequent));
        if antecedent.is_empty() || consequent.is_empty() || !antecedent.is_disjoint(&consequent) {
            return Err(MinerError::Serialization(
                "rule sides must be non-empty and disjoint".to_string(),
            ));
        }
        let mut rule = Rule::new(antecedent, consequent, row.support, row.confidence);
        rule.set_delta_t(row.delta_t);
        rule.set_day_probability(row.day);
        rule.set_hour_probability(row.hour);
        set.insert(rule);
    }

    Ok((RulesDatabase::from_set(set), interner))
}

fn format_items<T: Item + Display>(itemset: &Itemset, interner: &Interner<T>) -> String {
    let rendered: Vec<String> = itemset
        .items()
        .iter()
        .map(|&id| interner.resolve(id).to_string())
        .collect();
    format!("[{}]", rendered.join(", "))
}

fn format_distribution(distribution: &ContextDistribution) -> String {
    let rendered: Vec<String> = distribution
        .iter()
        .map(|(value, probability)| format!("{}:{}", value, probability))
        .collect();
    format!("{{{}}}", rendered.join(","))
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn parse_items<T: Item + FromStr>(cell: &str, row: usize) -> Result<Vec<T>> {
    let inner = cell
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| {
            MinerError::Serialization(format!("row {}: malformed item list {:?}", row, cell))
        })?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|token| {
            token.trim().parse::<T>().map_err(|_| {
                MinerError::Serialization(format!("row {}: unparseable item {:?}", row, token))
            })
        })
        .collect()
}

fn parse_distribution(cell: &str, row: usize) -> Result<ContextDistribution> {
    let inner = cell
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| {
            MinerError::Serialization(format!("row {}: malformed distribution {:?}", row, cell))
        })?;
    let mut distribution = ContextDistribution::new();
    for entry in inner.split(',').filter(|e| !e.trim().is_empty()) {
        let (value, probability) = entry.split_once(':').ok_or_else(|| {
            MinerError::Serialization(format!("row {}: malformed entry {:?}", row, entry))
        })?;
        let value = value.trim().parse::<u32>().map_err(|_| {
            MinerError::Serialization(format!("row {}: bad context value {:?}", row, value))
        })?;
        let probability = probability.trim().parse::<f64>().map_err(|_| {
            MinerError::Serialization(format!("row {}: bad probability {:?}", row, probability))
        })?;
        distribution.insert(value, probability);
    }
    Ok(distribution)
}

fn parse_float(cell: &str, row: usize) -> Result<f64> {
    cell.trim().parse::<f64>().map_err(|_| {
        MinerError::Serialization(format!("row {}: bad numeric field {:?}", row, cell))
    })
}

fn parse_optional_float(cell: &str, row: usize) -> Result<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_float(trimmed, row).map(Some)
}
