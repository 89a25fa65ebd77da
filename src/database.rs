use crate::errors::{MinerError, Result};
use crate::item::Item;
use serde::{Deserialize, Serialize};

/// Categorical context tags carried by one event position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Day-of-week index (0 = Monday)
    pub day: u32,
    /// Hour bucket (0-23)
    pub hour: u32,
}

/// A database of event sequences, optionally with parallel timestamps
/// (integer minutes, non-decreasing within a sequence) and per-position
/// context tags.
///
/// Shape mismatches and non-monotone timestamps are rejected at
/// construction, so a database handed to the miner is always well formed.
#[derive(Debug, Clone)]
pub struct SequenceDatabase<T> {
    sequences: Vec<Vec<T>>,
    timestamps: Option<Vec<Vec<i64>>>,
    contexts: Option<Vec<Vec<Context>>>,
}

impl<T: Item> SequenceDatabase<T> {
    pub fn new(sequences: Vec<Vec<T>>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(MinerError::InvalidInput(
                "sequence database is empty".to_string(),
            ));
        }
        Ok(Self {
            sequences,
            timestamps: None,
            contexts: None,
        })
    }

    /// Attach per-position timestamps in integer minutes.
    pub fn with_timestamps(mut self, timestamps: Vec<Vec<i64>>) -> Result<Self> {
        check_shape(&self.sequences, &timestamps, "timestamps")?;
        for (i, ts) in timestamps.iter().enumerate() {
            if ts.windows(2).any(|w| w[0] > w[1]) {
                return Err(MinerError::InvalidInput(format!(
                    "timestamps of sequence {} are not non-decreasing",
                    i
                )));
            }
        }
        self.timestamps = Some(timestamps);
        Ok(self)
    }

    /// Attach per-position context tags.
    pub fn with_contexts(mut self, contexts: Vec<Vec<Context>>) -> Result<Self> {
        check_shape(&self.sequences, &contexts, "contexts")?;
        self.contexts = Some(contexts);
        Ok(self)
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequences(&self) -> &[Vec<T>] {
        &self.sequences
    }

    pub fn timestamps(&self) -> Option<&[Vec<i64>]> {
        self.timestamps.as_deref()
    }

    pub fn contexts(&self) -> Option<&[Vec<Context>]> {
        self.contexts.as_deref()
    }
}

fn check_shape<T, U>(sequences: &[Vec<T>], parallel: &[Vec<U>], what: &str) -> Result<()> {
    if parallel.len() != sequences.len() {
        return Err(MinerError::InvalidInput(format!(
            "{} cover {} sequences, database has {}",
            what,
            parallel.len(),
            sequences.len()
        )));
    }
    for (i, (seq, par)) in sequences.iter().zip(parallel).enumerate() {
        if seq.len() != par.len() {
            return Err(MinerError::InvalidInput(format!(
                "{} of sequence {} have length {}, sequence has {}",
                what,
                i,
                par.len(),
                seq.len()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_database() {
        assert!(SequenceDatabase::<&str>::new(vec![]).is_err());
    }

    #[test]
    fn rejects_mismatched_timestamp_shape() {
        let db = SequenceDatabase::new(vec![vec!["a", "b"]]).unwrap();
        assert!(db.clone().with_timestamps(vec![vec![0]]).is_err());
        assert!(db.with_timestamps(vec![vec![0, 1], vec![2]]).is_err());
    }

    #[test]
    fn rejects_non_monotone_timestamps() {
        let db = SequenceDatabase::new(vec![vec!["a", "b"]]).unwrap();
        assert!(db.with_timestamps(vec![vec![5, 3]]).is_err());
    }

    #[test]
    fn accepts_well_formed_parallel_data() {
        let db = SequenceDatabase::new(vec![vec!["a", "b"], vec!["c"]])
            .unwrap()
            .with_timestamps(vec![vec![0, 10], vec![3]])
            .unwrap()
            .with_contexts(vec![
                vec![Context { day: 0, hour: 9 }, Context { day: 0, hour: 9 }],
                vec![Context { day: 4, hour: 17 }],
            ])
            .unwrap();
        assert_eq!(db.len(), 2);
        assert!(db.timestamps().is_some());
        assert!(db.contexts().is_some());
    }
}
